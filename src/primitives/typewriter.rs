//! Typewriter Primitive - Reveal text one character at a time.
//!
//! State machine: `Idle -> Typing -> Done`.
//!
//! The typewriter does nothing until its element scrolls into view. Then it
//! reveals one grapheme per interval until the whole text is shown, and
//! stops scheduling. Its cursor starts blinking on the host scheduler at the
//! same moment. Tearing it down cancels the pending tick and the blink.
//!
//! # Example
//!
//! ```ignore
//! use spark_reveal::primitives::{Typewriter, TypewriterProps, RevealHost};
//!
//! let name = Typewriter::mount(&RevealHost::local(), TypewriterProps {
//!     interval: Duration::from_millis(100),
//!     ..TypewriterProps::new("[YOUR NAME]")
//! });
//!
//! // Render the revealed prefix
//! let shown = name.displayed_text();
//! ```

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};
use std::time::Duration;

use spark_signals::{Signal, signal};
use unicode_segmentation::UnicodeSegmentation;

use crate::engine::{allocate_index, on_destroy, release_index};
use crate::state::animate::{get_blink_phase, subscribe_to_blink};
use crate::state::{Scheduler, TimerHandle, VisibilityDetector};
use crate::types::TypewriterPhase;

use super::types::{Cleanup, RevealHost, TypewriterProps};

/// Per-instance typing progress.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TypewriterState {
    pub full_text: String,
    /// Graphemes revealed so far, `0..=len(full_text)`.
    pub revealed_length: usize,
    pub pending_timer: Option<TimerHandle>,
}

struct TypewriterCore {
    index: usize,
    /// Byte offset of the end of each grapheme.
    boundaries: Vec<usize>,
    interval: Duration,
    cursor_fps: u8,
    scheduler: Rc<dyn Scheduler>,
    state: RefCell<TypewriterState>,
    phase: Signal<TypewriterPhase>,
    displayed: Signal<String>,
    detector: RefCell<Option<VisibilityDetector>>,
    cursor: RefCell<Option<Box<dyn FnOnce()>>>,
    torn_down: Cell<bool>,
}

impl TypewriterCore {
    fn total(&self) -> usize {
        self.boundaries.len()
    }

    fn prefix(&self, revealed: usize) -> String {
        let state = self.state.borrow();
        match revealed.checked_sub(1) {
            Some(last) => state.full_text[..self.boundaries[last]].to_string(),
            None => String::new(),
        }
    }

    fn reveal_to(&self, revealed: usize) {
        self.state.borrow_mut().revealed_length = revealed;
        self.displayed.set(self.prefix(revealed));
    }

    /// Visibility callback: leave `Idle`.
    fn start(core: &Rc<TypewriterCore>) {
        if core.torn_down.get() || core.phase.get() != TypewriterPhase::Idle {
            return;
        }

        let total = core.total();
        tracing::debug!(element = core.index, total, "typewriter started");

        if core.cursor_fps > 0 {
            let unsubscribe = subscribe_to_blink(&core.scheduler, core.cursor_fps);
            *core.cursor.borrow_mut() = Some(unsubscribe);
        }

        if total == 0 {
            core.phase.set(TypewriterPhase::Done);
            return;
        }
        if core.interval.is_zero() {
            tracing::warn!(element = core.index, "typewriter interval is zero, revealing full text");
            core.reveal_to(total);
            core.phase.set(TypewriterPhase::Done);
            return;
        }

        core.phase.set(TypewriterPhase::Typing);
        Self::schedule_tick(core);
    }

    fn schedule_tick(core: &Rc<TypewriterCore>) {
        let weak: Weak<TypewriterCore> = Rc::downgrade(core);
        let handle = core.scheduler.set_timeout(
            core.interval,
            Box::new(move || {
                if let Some(core) = weak.upgrade() {
                    TypewriterCore::tick(&core);
                }
            }),
        );
        core.state.borrow_mut().pending_timer = Some(handle);
    }

    fn tick(core: &Rc<TypewriterCore>) {
        if core.torn_down.get() {
            return;
        }

        let total = core.total();
        let revealed = {
            let mut state = core.state.borrow_mut();
            state.pending_timer = None;
            (state.revealed_length + 1).min(total)
        };
        core.reveal_to(revealed);
        tracing::trace!(element = core.index, revealed, total, "typewriter tick");

        if revealed == total {
            core.phase.set(TypewriterPhase::Done);
            tracing::debug!(element = core.index, "typewriter done");
        } else {
            Self::schedule_tick(core);
        }
    }

    /// Stop everything. Safe to call repeatedly.
    fn teardown(&self, release_element: bool) {
        if self.torn_down.replace(true) {
            return;
        }

        let detector = self.detector.borrow_mut().take();
        drop(detector);

        let pending = self.state.borrow_mut().pending_timer.take();
        if let Some(handle) = pending {
            self.scheduler.clear_timeout(handle);
        }

        let cursor = self.cursor.borrow_mut().take();
        if let Some(unsubscribe) = cursor {
            unsubscribe();
        }

        tracing::debug!(element = self.index, "typewriter torn down");
        if release_element {
            release_index(self.index);
        }
    }
}

// =============================================================================
// Typewriter Component
// =============================================================================

/// Scroll-triggered typewriter. Dropping it tears it down.
pub struct Typewriter {
    core: Rc<TypewriterCore>,
}

impl Typewriter {
    /// Create a typewriter and start watching its element.
    ///
    /// The element is allocated under the current parent context; the host
    /// lays it out with [`crate::engine::set_bounds`].
    pub fn mount(host: &RevealHost, props: TypewriterProps) -> Self {
        let index = allocate_index(props.id.as_deref());
        let boundaries = props
            .text
            .grapheme_indices(true)
            .map(|(offset, grapheme)| offset + grapheme.len())
            .collect();

        let core = Rc::new(TypewriterCore {
            index,
            boundaries,
            interval: props.interval,
            cursor_fps: props.cursor_fps,
            scheduler: host.scheduler.clone(),
            state: RefCell::new(TypewriterState {
                full_text: props.text,
                revealed_length: 0,
                pending_timer: None,
            }),
            phase: signal(TypewriterPhase::Idle),
            displayed: signal(String::new()),
            detector: RefCell::new(None),
            cursor: RefCell::new(None),
            torn_down: Cell::new(false),
        });

        let weak = Rc::downgrade(&core);
        let detector = VisibilityDetector::register(
            host.trigger.clone(),
            Some(index),
            props.threshold,
            move || {
                if let Some(core) = weak.upgrade() {
                    TypewriterCore::start(&core);
                }
            },
        );
        *core.detector.borrow_mut() = Some(detector);

        let weak = Rc::downgrade(&core);
        on_destroy(index, move || {
            if let Some(core) = weak.upgrade() {
                core.teardown(false);
            }
        });

        Self { core }
    }

    /// Element index being observed.
    pub fn index(&self) -> usize {
        self.core.index
    }

    pub fn phase(&self) -> TypewriterPhase {
        self.core.phase.get()
    }

    /// Phase signal for reactive rendering.
    pub fn phase_signal(&self) -> Signal<TypewriterPhase> {
        self.core.phase.clone()
    }

    /// Text revealed so far.
    pub fn displayed_text(&self) -> String {
        self.core.displayed.get()
    }

    /// Revealed text signal for reactive rendering.
    pub fn displayed_signal(&self) -> Signal<String> {
        self.core.displayed.clone()
    }

    pub fn state(&self) -> TypewriterState {
        self.core.state.borrow().clone()
    }

    pub fn revealed_length(&self) -> usize {
        self.core.state.borrow().revealed_length
    }

    /// Number of graphemes in the full text.
    pub fn total_length(&self) -> usize {
        self.core.total()
    }

    pub fn is_visible(&self) -> bool {
        self.core
            .detector
            .borrow()
            .as_ref()
            .is_some_and(VisibilityDetector::is_visible)
    }

    pub fn has_pending_tick(&self) -> bool {
        self.core.state.borrow().pending_timer.is_some()
    }

    /// Whether the cursor is drawn this frame. Always false without a cursor
    /// or after teardown. Steady while idle; blinks once typing starts.
    pub fn cursor_visible(&self) -> bool {
        let core = &self.core;
        if core.cursor_fps == 0 || core.torn_down.get() {
            return false;
        }
        core.cursor.borrow().is_none() || get_blink_phase(&core.scheduler, core.cursor_fps)
    }

    pub fn is_torn_down(&self) -> bool {
        self.core.torn_down.get()
    }

    /// Disconnect, cancel the pending tick, and release the element.
    /// Safe to call any number of times.
    pub fn teardown(&self) {
        self.core.teardown(true);
    }

    /// Convert into a [`Cleanup`] that tears the typewriter down.
    pub fn into_cleanup(self) -> Cleanup {
        Box::new(move || drop(self))
    }
}

impl Drop for Typewriter {
    fn drop(&mut self) {
        self.core.teardown(true);
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{is_allocated, reset_registry, set_bounds};
    use crate::state::animate::reset_blink_registries;
    use crate::state::timers::{advance, pending_timers, reset_timers};
    use crate::state::viewport::{reset_viewport, scroll_to, set_viewport_height};
    use crate::state::visibility::{check_intersections, observation_count, reset_observations};
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

    /// Typewriter laid out below the fold at 200..220.
    fn mount(text: &str, interval: u64) -> Typewriter {
        let typewriter = Typewriter::mount(
            &RevealHost::local(),
            TypewriterProps {
                interval: ms(interval),
                cursor_fps: 0,
                ..TypewriterProps::new(text)
            },
        );
        set_bounds(typewriter.index(), Bounds::new(200.0, 20.0));
        typewriter
    }

    fn reveal() {
        scroll_to(150.0);
        check_intersections();
    }

    #[test]
    fn test_hello_timeline() {
        setup();
        let typewriter = mount("HELLO", 100);

        reveal();
        assert_eq!(typewriter.phase(), TypewriterPhase::Typing);
        assert_eq!(typewriter.displayed_text(), "");

        let expected = ["H", "HE", "HEL", "HELL", "HELLO"];
        for text in expected {
            advance(ms(99));
            assert_ne!(typewriter.displayed_text(), text);
            advance(ms(1));
            assert_eq!(typewriter.displayed_text(), text);
        }

        assert_eq!(typewriter.phase(), TypewriterPhase::Done);
        assert!(!typewriter.has_pending_tick());
        assert_eq!(pending_timers(), 0);

        advance(ms(100));
        assert_eq!(typewriter.displayed_text(), "HELLO");
        assert_eq!(typewriter.revealed_length(), 5);
    }

    #[test]
    fn test_idle_until_visible() {
        setup();
        let typewriter = mount("HELLO", 100);

        check_intersections();
        advance(ms(1000));

        assert_eq!(typewriter.phase(), TypewriterPhase::Idle);
        assert_eq!(typewriter.displayed_text(), "");
        assert_eq!(pending_timers(), 0);
    }

    #[test]
    fn test_teardown_mid_typing() {
        setup();
        let typewriter = mount("HELLO", 100);
        let index = typewriter.index();

        reveal();
        advance(ms(200));
        assert_eq!(typewriter.displayed_text(), "HE");
        assert!(typewriter.has_pending_tick());

        typewriter.teardown();
        typewriter.teardown();
        assert_eq!(pending_timers(), 0);
        assert!(!is_allocated(index));

        advance(ms(1000));
        assert_eq!(typewriter.displayed_text(), "HE");
    }

    #[test]
    fn test_drop_before_visible() {
        setup();
        let typewriter = mount("HELLO", 100);
        drop(typewriter);

        assert_eq!(observation_count(), 0);
        reveal();
        advance(ms(1000));
        assert_eq!(pending_timers(), 0);
    }

    #[test]
    fn test_element_release_tears_down() {
        setup();
        let typewriter = mount("HELLO", 100);
        reveal();
        advance(ms(100));

        release_index(typewriter.index());
        assert!(typewriter.is_torn_down());
        assert_eq!(pending_timers(), 0);

        // Dropping afterwards must not release a reused index
        let other = allocate_index(Some("other"));
        drop(typewriter);
        assert!(is_allocated(other));
    }

    #[test]
    fn test_duplicate_ids_stay_independent() {
        setup();
        let host = RevealHost::local();
        let props = TypewriterProps {
            id: Some("name".to_string()),
            cursor_fps: 0,
            ..TypewriterProps::new("HELLO")
        };
        let first = Typewriter::mount(&host, props.clone());
        let second = Typewriter::mount(&host, props);
        assert_ne!(first.index(), second.index());

        first.teardown();
        assert!(!second.is_torn_down());
        assert!(is_allocated(second.index()));

        set_bounds(second.index(), Bounds::new(200.0, 20.0));
        reveal();
        advance(ms(150));
        assert_eq!(second.displayed_text(), "H");
    }

    #[test]
    fn test_empty_text() {
        setup();
        let typewriter = mount("", 100);
        reveal();

        assert_eq!(typewriter.phase(), TypewriterPhase::Done);
        assert_eq!(pending_timers(), 0);
    }

    #[test]
    fn test_zero_interval_reveals_immediately() {
        setup();
        let typewriter = mount("HELLO", 0);
        reveal();

        assert_eq!(typewriter.displayed_text(), "HELLO");
        assert_eq!(typewriter.phase(), TypewriterPhase::Done);
        assert_eq!(pending_timers(), 0);
    }

    #[test]
    fn test_graphemes_are_single_steps() {
        setup();
        let typewriter = mount("é😎!", 10);
        assert_eq!(typewriter.total_length(), 3);

        reveal();
        advance(ms(10));
        assert_eq!(typewriter.displayed_text(), "é");
        advance(ms(10));
        assert_eq!(typewriter.displayed_text(), "é😎");
        advance(ms(10));
        assert_eq!(typewriter.displayed_text(), "é😎!");
    }

    #[test]
    fn test_cursor_steady_until_visible() {
        setup();
        let typewriter = Typewriter::mount(&RevealHost::local(), TypewriterProps::new("HI"));
        set_bounds(typewriter.index(), Bounds::new(200.0, 20.0));

        check_intersections();
        for _ in 0..4 {
            advance(ms(250));
            assert!(typewriter.cursor_visible());
        }
        assert_eq!(typewriter.phase(), TypewriterPhase::Idle);
        assert_eq!(pending_timers(), 0);
    }

    #[test]
    fn test_cursor_blinks_until_teardown() {
        setup();
        let typewriter = Typewriter::mount(&RevealHost::local(), TypewriterProps::new("HI"));
        set_bounds(typewriter.index(), Bounds::new(200.0, 20.0));
        reveal();

        assert!(typewriter.cursor_visible());
        advance(ms(150));
        assert!(typewriter.cursor_visible());
        advance(ms(100));
        assert!(!typewriter.cursor_visible());

        // Keeps blinking after the text is done
        advance(ms(250));
        assert_eq!(typewriter.phase(), TypewriterPhase::Done);
        assert!(typewriter.cursor_visible());
        assert_eq!(pending_timers(), 1);

        typewriter.teardown();
        assert!(!typewriter.cursor_visible());
        assert_eq!(pending_timers(), 0);
    }
}
