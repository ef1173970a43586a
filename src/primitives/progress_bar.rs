//! Progress Bar Primitive - Fill a bar to its target once visible.
//!
//! State machine: `Hidden -> Animating -> Settled`.
//!
//! Before its element is visible the bar is empty. On the visibility
//! trigger it runs one ease-out transition to the target and settles there.
//! The transition cannot be interrupted, restarted, or reversed.

use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::time::Duration;

use spark_signals::{Signal, signal};

use crate::engine::{allocate_index, on_destroy, release_index};
use crate::state::animate::{Easing, Transition};
use crate::state::{Scheduler, TimerHandle, VisibilityDetector};
use crate::types::{Percentage, ProgressPhase};

use super::types::{Cleanup, ProgressBarProps, RevealHost};

struct ProgressCore {
    index: usize,
    name: String,
    level: String,
    /// `None` when the caller's target could not be parsed.
    target: Option<Percentage>,
    duration: Duration,
    scheduler: Rc<dyn Scheduler>,
    phase: Signal<ProgressPhase>,
    transition: Cell<Option<Transition>>,
    completion: Cell<Option<TimerHandle>>,
    detector: RefCell<Option<VisibilityDetector>>,
    /// Fill sampled at teardown.
    frozen: Cell<Option<f32>>,
    torn_down: Cell<bool>,
}

impl ProgressCore {
    fn start(core: &Rc<ProgressCore>) {
        if core.torn_down.get() || core.phase.get() != ProgressPhase::Hidden {
            return;
        }
        let Some(target) = core.target else {
            tracing::debug!(element = core.index, "progress bar has no valid target, staying empty");
            return;
        };

        let now = core.scheduler.now();
        core.transition
            .set(Some(Transition::new(now, core.duration, Easing::EaseOutCubic)));
        tracing::debug!(element = core.index, %target, "progress bar animating");

        if core.duration.is_zero() {
            core.phase.set(ProgressPhase::Settled);
            return;
        }

        core.phase.set(ProgressPhase::Animating);
        let weak = Rc::downgrade(core);
        let handle = core.scheduler.set_timeout(
            core.duration,
            Box::new(move || {
                if let Some(core) = weak.upgrade() {
                    core.settle();
                }
            }),
        );
        core.completion.set(Some(handle));
    }

    fn settle(&self) {
        self.completion.set(None);
        if self.torn_down.get() {
            return;
        }
        self.phase.set(ProgressPhase::Settled);
        tracing::debug!(element = self.index, "progress bar settled");
    }

    fn fill(&self) -> f32 {
        self.frozen.get().unwrap_or_else(|| self.sample())
    }

    fn sample(&self) -> f32 {
        let Some(target) = self.target else { return 0.0 };
        match self.phase.get() {
            ProgressPhase::Hidden => 0.0,
            ProgressPhase::Settled => target.value(),
            ProgressPhase::Animating => {
                let Some(transition) = self.transition.get() else {
                    return 0.0;
                };
                let now = self.scheduler.now();
                if transition.is_complete(now) {
                    target.value()
                } else {
                    (target.value() * transition.progress(now)).min(target.value())
                }
            }
        }
    }

    fn teardown(&self, release_element: bool) {
        if self.torn_down.replace(true) {
            return;
        }
        self.frozen.set(Some(self.sample()));

        let detector = self.detector.borrow_mut().take();
        drop(detector);

        if let Some(handle) = self.completion.take() {
            self.scheduler.clear_timeout(handle);
        }

        tracing::debug!(element = self.index, "progress bar torn down");
        if release_element {
            release_index(self.index);
        }
    }
}

// =============================================================================
// Progress Bar Component
// =============================================================================

/// Scroll-triggered skill bar. Dropping it tears it down.
pub struct ProgressBar {
    core: Rc<ProgressCore>,
}

impl ProgressBar {
    /// Create a progress bar and start watching its element.
    ///
    /// A malformed `target` is logged and leaves the bar empty for its
    /// whole lifetime.
    pub fn mount(host: &RevealHost, props: ProgressBarProps) -> Self {
        let index = allocate_index(props.id.as_deref());
        let target = match props.target.parse::<Percentage>() {
            Ok(target) => Some(target),
            Err(err) => {
                tracing::warn!(element = index, error = %err, "ignoring progress target");
                None
            }
        };

        let core = Rc::new(ProgressCore {
            index,
            name: props.name,
            level: props.level,
            target,
            duration: props.duration,
            scheduler: host.scheduler.clone(),
            phase: signal(ProgressPhase::Hidden),
            transition: Cell::new(None),
            completion: Cell::new(None),
            detector: RefCell::new(None),
            frozen: Cell::new(None),
            torn_down: Cell::new(false),
        });

        let weak = Rc::downgrade(&core);
        let detector = VisibilityDetector::register(
            host.trigger.clone(),
            Some(index),
            props.threshold,
            move || {
                if let Some(core) = weak.upgrade() {
                    ProgressCore::start(&core);
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

    pub fn index(&self) -> usize {
        self.core.index
    }

    pub fn name(&self) -> &str {
        &self.core.name
    }

    pub fn level(&self) -> &str {
        &self.core.level
    }

    /// Parsed target, `None` if the caller's value was malformed.
    pub fn target(&self) -> Option<Percentage> {
        self.core.target
    }

    pub fn phase(&self) -> ProgressPhase {
        self.core.phase.get()
    }

    pub fn phase_signal(&self) -> Signal<ProgressPhase> {
        self.core.phase.clone()
    }

    /// Current fill in percent, sampled at the scheduler's clock. Fixed at
    /// its last value once torn down.
    pub fn fill(&self) -> f32 {
        self.core.fill()
    }

    /// Current fill in `[0, 1]`.
    pub fn fill_fraction(&self) -> f32 {
        self.fill() / 100.0
    }

    pub fn is_torn_down(&self) -> bool {
        self.core.torn_down.get()
    }

    /// Disconnect, cancel the completion timer, and release the element.
    /// Safe to call any number of times.
    pub fn teardown(&self) {
        self.core.teardown(true);
    }

    pub fn into_cleanup(self) -> Cleanup {
        Box::new(move || drop(self))
    }
}

impl Drop for ProgressBar {
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
    use crate::engine::{reset_registry, set_bounds};
    use crate::state::timers::{advance, pending_timers, reset_timers};
    use crate::state::viewport::{reset_viewport, scroll_to, set_viewport_height};
    use crate::state::visibility::{check_intersections, reset_observations};
    use crate::types::Bounds;

    fn setup() {
        reset_registry();
        reset_observations();
        reset_timers();
        reset_viewport();
        set_viewport_height(100.0);
    }

    fn ms(value: u64) -> Duration {
        Duration::from_millis(value)
    }

    fn mount(target: &str) -> ProgressBar {
        let bar = ProgressBar::mount(
            &RevealHost::local(),
            ProgressBarProps::new("JavaScript (ES6+)", "INTERMEDIATE", target),
        );
        set_bounds(bar.index(), Bounds::new(300.0, 10.0));
        bar
    }

    fn reveal() {
        scroll_to(250.0);
        check_intersections();
    }

    #[test]
    fn test_fills_to_target() {
        setup();
        let bar = mount("75%");
        assert_eq!(bar.name(), "JavaScript (ES6+)");
        assert_eq!(bar.level(), "INTERMEDIATE");

        reveal();
        assert_eq!(bar.phase(), ProgressPhase::Animating);
        assert_eq!(bar.fill(), 0.0);

        let mut last = 0.0;
        for _ in 0..15 {
            advance(ms(100));
            let fill = bar.fill();
            assert!(fill >= last);
            assert!(fill <= 75.0);
            last = fill;
        }

        assert_eq!(bar.phase(), ProgressPhase::Settled);
        assert_eq!(bar.fill(), 75.0);
        assert_eq!(pending_timers(), 0);

        advance(ms(5000));
        assert_eq!(bar.fill(), 75.0);
    }

    #[test]
    fn test_midway_is_partial() {
        setup();
        let bar = mount("60");
        reveal();

        advance(ms(750));
        let fill = bar.fill();
        assert!(fill > 0.0 && fill < 60.0);
    }

    #[test]
    fn test_empty_before_visible() {
        setup();
        let bar = mount("40%");

        check_intersections();
        advance(ms(3000));
        assert_eq!(bar.phase(), ProgressPhase::Hidden);
        assert_eq!(bar.fill(), 0.0);
    }

    #[test]
    fn test_scrolling_away_does_not_interrupt() {
        setup();
        let bar = mount("75%");
        reveal();

        advance(ms(300));
        scroll_to(0.0);
        check_intersections();
        advance(ms(1200));

        assert_eq!(bar.phase(), ProgressPhase::Settled);
        assert_eq!(bar.fill(), 75.0);
    }

    #[test]
    fn test_malformed_target_stays_empty() {
        setup();
        let bar = mount("lots");
        assert_eq!(bar.target(), None);

        reveal();
        advance(ms(2000));
        assert_eq!(bar.fill(), 0.0);
        assert_eq!(bar.phase(), ProgressPhase::Hidden);
        assert_eq!(pending_timers(), 0);
    }

    #[test]
    fn test_zero_duration_settles_immediately() {
        setup();
        let bar = ProgressBar::mount(
            &RevealHost::local(),
            ProgressBarProps {
                duration: Duration::ZERO,
                ..ProgressBarProps::new("SQL", "INTERMEDIATE", "60%")
            },
        );
        set_bounds(bar.index(), Bounds::new(300.0, 10.0));

        reveal();
        assert_eq!(bar.phase(), ProgressPhase::Settled);
        assert_eq!(bar.fill(), 60.0);
        assert_eq!(pending_timers(), 0);
    }

    #[test]
    fn test_teardown_while_animating() {
        setup();
        let bar = mount("75%");
        reveal();
        advance(ms(500));

        let fill = bar.fill();
        assert!(fill > 0.0 && fill < 75.0);

        bar.teardown();
        bar.teardown();
        assert!(bar.is_torn_down());
        assert_eq!(pending_timers(), 0);
        assert_eq!(bar.fill(), fill);

        advance(ms(5000));
        assert_eq!(bar.phase(), ProgressPhase::Animating);
        assert_eq!(bar.fill(), fill);
    }

    #[test]
    fn test_duplicate_ids_stay_independent() {
        setup();
        let host = RevealHost::local();
        let props = ProgressBarProps {
            id: Some("sql".to_string()),
            ..ProgressBarProps::new("SQL", "INTERMEDIATE", "60%")
        };
        let first = ProgressBar::mount(&host, props.clone());
        let second = ProgressBar::mount(&host, props);
        assert_ne!(first.index(), second.index());

        first.teardown();
        assert!(!second.is_torn_down());
        set_bounds(second.index(), Bounds::new(300.0, 10.0));
        reveal();
        assert_eq!(second.phase(), ProgressPhase::Animating);
    }
}
