//! Mount API - Reveal lifecycle and frame ticking.
//!
//! The host owns the frame loop. Each frame it calls [`tick`] with the time
//! elapsed since the previous frame; that evaluates pending visibility
//! observations and then advances the timer queue.
//!
//! # Example
//!
//! ```ignore
//! use spark_reveal::pipeline::{mount, tick, FrameClock};
//!
//! let mut handle = mount();
//! handle.add(Typewriter::mount(&host, props).into_cleanup());
//!
//! let mut clock = FrameClock::new();
//! while tick(&handle, clock.elapsed()) {
//!     // render
//! }
//!
//! handle.unmount();
//! ```

use std::cell::Cell;
use std::rc::Rc;
use std::time::{Duration, Instant};

use crate::primitives::Cleanup;
use crate::state::{timers, visibility};

// =============================================================================
// Mount Handle
// =============================================================================

/// Handle returned by [`mount`] that owns mounted effects.
///
/// Holds:
/// - Cleanup functions of every effect added to it
/// - The running flag (cleared by `stop` or `unmount`)
pub struct MountHandle {
    cleanups: Vec<Cleanup>,
    running: Rc<Cell<bool>>,
}

impl MountHandle {
    /// Hand an effect's cleanup to this handle.
    pub fn add(&mut self, cleanup: Cleanup) {
        self.cleanups.push(cleanup);
    }

    /// Number of effects still owned.
    pub fn len(&self) -> usize {
        self.cleanups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cleanups.is_empty()
    }

    /// Stop ticking and tear down every effect, newest first.
    pub fn unmount(mut self) {
        self.running.set(false);
        self.run_cleanups();
    }

    /// Check if still running.
    pub fn is_running(&self) -> bool {
        self.running.get()
    }

    /// Stop the frame loop without tearing anything down yet.
    pub fn stop(&self) {
        self.running.set(false);
    }

    fn run_cleanups(&mut self) {
        let count = self.cleanups.len();
        while let Some(cleanup) = self.cleanups.pop() {
            cleanup();
        }
        if count > 0 {
            tracing::debug!(count, "reveal effects unmounted");
        }
    }
}

impl Drop for MountHandle {
    fn drop(&mut self) {
        self.running.set(false);
        self.run_cleanups();
    }
}

// =============================================================================
// Mount / Tick
// =============================================================================

/// Create a running mount handle.
pub fn mount() -> MountHandle {
    MountHandle {
        cleanups: Vec::new(),
        running: Rc::new(Cell::new(true)),
    }
}

/// Run one frame: fire crossed visibility observations, then advance the
/// timer queue by `dt`.
///
/// Returns `false` once the handle has been stopped; nothing runs then.
pub fn tick(handle: &MountHandle, dt: Duration) -> bool {
    if !handle.is_running() {
        return false;
    }
    let revealed = visibility::check_intersections();
    let fired = timers::advance(dt);
    if revealed > 0 || fired > 0 {
        tracing::trace!(revealed, fired, "frame");
    }
    true
}

// =============================================================================
// Frame Clock
// =============================================================================

/// Wall-clock frame timer for hosts driving [`tick`] in real time.
pub struct FrameClock {
    last_tick: Instant,
}

impl FrameClock {
    pub fn new() -> Self {
        Self {
            last_tick: Instant::now(),
        }
    }

    /// Time since the previous call (or since creation).
    pub fn elapsed(&mut self) -> Duration {
        let now = Instant::now();
        let dt = now.duration_since(self.last_tick);
        self.last_tick = now;
        dt
    }
}

impl Default for FrameClock {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{reset_registry, set_bounds};
    use crate::primitives::{ProgressBar, ProgressBarProps, RevealHost, Typewriter, TypewriterProps};
    use crate::state::animate::reset_blink_registries;
    use crate::state::timers::{pending_timers, reset_timers};
    use crate::state::viewport::{reset_viewport, scroll_to, set_viewport_height};
    use crate::state::visibility::{observation_count, reset_observations};
    use crate::types::Bounds;

    fn setup() {
        reset_registry();
        reset_observations();
        reset_timers();
        reset_blink_registries();
        reset_viewport();
        set_viewport_height(100.0);
    }

    fn ms(value: u64) -> Duration {
        Duration::from_millis(value)
    }

    #[test]
    fn test_tick_drives_typewriter() {
        setup();
        let host = RevealHost::local();
        let handle = mount();

        let typewriter = Typewriter::mount(
            &host,
            TypewriterProps {
                interval: ms(100),
                cursor_fps: 0,
                ..TypewriterProps::new("HI")
            },
        );
        set_bounds(typewriter.index(), Bounds::new(10.0, 10.0));

        assert!(tick(&handle, ms(100)));
        assert_eq!(typewriter.displayed_text(), "H");
        assert!(tick(&handle, ms(100)));
        assert_eq!(typewriter.displayed_text(), "HI");
    }

    #[test]
    fn test_unmount_tears_everything_down() {
        setup();
        let host = RevealHost::local();
        let mut handle = mount();

        let typewriter = Typewriter::mount(&host, TypewriterProps::new("HELLO"));
        set_bounds(typewriter.index(), Bounds::new(10.0, 10.0));
        let bar = ProgressBar::mount(&host, ProgressBarProps::new("React", "INTERMEDIATE", "65%"));
        set_bounds(bar.index(), Bounds::new(500.0, 10.0));

        handle.add(typewriter.into_cleanup());
        handle.add(bar.into_cleanup());
        assert_eq!(handle.len(), 2);

        tick(&handle, ms(150));
        assert!(pending_timers() > 0);

        handle.unmount();
        assert_eq!(pending_timers(), 0);
        assert_eq!(observation_count(), 0);
    }

    #[test]
    fn test_stopped_handle_does_nothing() {
        setup();
        let handle = mount();
        handle.stop();

        scroll_to(0.0);
        assert!(!tick(&handle, ms(100)));
        assert_eq!(crate::state::timers::now(), Duration::ZERO);
    }

    #[test]
    fn test_frame_clock_monotonic() {
        let mut clock = FrameClock::new();
        let first = clock.elapsed();
        let second = clock.elapsed();
        assert!(first >= Duration::ZERO);
        assert!(second >= Duration::ZERO);
    }
}
