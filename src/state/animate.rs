//! Animation System - Easing curves, transitions, and shared blink clocks.
//!
//! - [`Easing`] maps linear progress to eased progress (CSS-compatible
//!   cubic-bezier curves included)
//! - [`Transition`] is a one-way, time-boxed interpolation sampled against
//!   a scheduler clock
//! - Blink clocks: all cursors at the same FPS on the same scheduler share
//!   one toggle timer, so they blink in sync
//!
//! # Blink Pattern
//!
//! - Multiple cursors blinking at 2 FPS share one timer
//! - Timer starts with the first subscriber, stops with the last
//! - Phase signal toggles true/false for blink visibility
//!
//! # Example
//!
//! ```ignore
//! use spark_reveal::state::animate::{subscribe_to_blink, get_blink_phase};
//!
//! let scheduler: Rc<dyn Scheduler> = Rc::new(LocalScheduler);
//! let unsubscribe = subscribe_to_blink(&scheduler, 2);
//! let visible = get_blink_phase(&scheduler, 2);
//! unsubscribe();
//! ```

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;
use std::time::Duration;

use spark_signals::{Signal, signal};

use super::timers::{Scheduler, TimerHandle};

// =============================================================================
// EASING
// =============================================================================

/// Easing curve applied to linear progress in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Easing {
    Linear,
    /// `1 - (1 - t)^3`. Monotonic, never overshoots.
    EaseOutCubic,
    /// CSS `cubic-bezier(x1, y1, x2, y2)`. May overshoot when y1/y2 leave `[0, 1]`.
    CubicBezier(f32, f32, f32, f32),
}

/// Soft bounce used by reveal blocks: `cubic-bezier(0.175, 0.885, 0.32, 1.275)`.
pub const EASE_OUT_BACK: Easing = Easing::CubicBezier(0.175, 0.885, 0.32, 1.275);

impl Easing {
    /// Eased value for linear progress `t`. Endpoints are exact: 0 at
    /// `t <= 0` and 1 at `t >= 1`.
    pub fn apply(self, t: f32) -> f32 {
        if t.is_nan() || t <= 0.0 {
            return 0.0;
        }
        if t >= 1.0 {
            return 1.0;
        }
        match self {
            Easing::Linear => t,
            Easing::EaseOutCubic => {
                let inv = 1.0 - t;
                1.0 - inv * inv * inv
            }
            Easing::CubicBezier(x1, y1, x2, y2) => UnitBezier::new(x1, y1, x2, y2).solve(t),
        }
    }
}

/// Polynomial form of a cubic bezier from (0,0) to (1,1).
struct UnitBezier {
    ax: f32,
    bx: f32,
    cx: f32,
    ay: f32,
    by: f32,
    cy: f32,
}

impl UnitBezier {
    const EPSILON: f32 = 1e-6;

    fn new(x1: f32, y1: f32, x2: f32, y2: f32) -> Self {
        // Control x values outside [0, 1] make x(t) non-monotonic
        let x1 = x1.clamp(0.0, 1.0);
        let x2 = x2.clamp(0.0, 1.0);
        let cx = 3.0 * x1;
        let bx = 3.0 * (x2 - x1) - cx;
        let cy = 3.0 * y1;
        let by = 3.0 * (y2 - y1) - cy;
        Self {
            ax: 1.0 - cx - bx,
            bx,
            cx,
            ay: 1.0 - cy - by,
            by,
            cy,
        }
    }

    fn sample_x(&self, t: f32) -> f32 {
        ((self.ax * t + self.bx) * t + self.cx) * t
    }

    fn sample_y(&self, t: f32) -> f32 {
        ((self.ay * t + self.by) * t + self.cy) * t
    }

    fn sample_dx(&self, t: f32) -> f32 {
        (3.0 * self.ax * t + 2.0 * self.bx) * t + self.cx
    }

    /// Find the curve parameter whose x equals `x`.
    fn solve_t(&self, x: f32) -> f32 {
        // Newton first, bisection if it stalls
        let mut t = x;
        for _ in 0..8 {
            let err = self.sample_x(t) - x;
            if err.abs() < Self::EPSILON {
                return t;
            }
            let dx = self.sample_dx(t);
            if dx.abs() < Self::EPSILON {
                break;
            }
            t -= err / dx;
        }

        let (mut lo, mut hi) = (0.0_f32, 1.0_f32);
        t = x;
        for _ in 0..32 {
            let sample = self.sample_x(t);
            if (sample - x).abs() < Self::EPSILON {
                break;
            }
            if sample < x {
                lo = t;
            } else {
                hi = t;
            }
            t = (lo + hi) * 0.5;
        }
        t
    }

    fn solve(&self, x: f32) -> f32 {
        self.sample_y(self.solve_t(x))
    }
}

// =============================================================================
// TRANSITION
// =============================================================================

/// A one-way transition from 0 to 1 starting at `start` on a scheduler clock.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transition {
    pub start: Duration,
    pub duration: Duration,
    pub easing: Easing,
}

impl Transition {
    pub fn new(start: Duration, duration: Duration, easing: Easing) -> Self {
        Self {
            start,
            duration,
            easing,
        }
    }

    /// Clock time at which the transition is complete.
    pub fn end(&self) -> Duration {
        self.start.saturating_add(self.duration)
    }

    pub fn is_complete(&self, now: Duration) -> bool {
        now >= self.end()
    }

    /// Eased progress at `now`: 0 before it starts, exactly 1 from `end()` on.
    pub fn progress(&self, now: Duration) -> f32 {
        if self.is_complete(now) {
            return 1.0;
        }
        let elapsed = now.saturating_sub(self.start);
        let linear = elapsed.as_secs_f32() / self.duration.as_secs_f32();
        self.easing.apply(linear)
    }
}

// =============================================================================
// BLINK REGISTRY
// =============================================================================

/// Per-clock blink registry containing shared clock state
struct BlinkRegistry {
    /// Scheduler that drives the toggles
    scheduler: Rc<dyn Scheduler>,
    /// Phase signal (true = visible)
    phase: Signal<bool>,
    /// Pending toggle timer
    timer: Option<TimerHandle>,
    /// Number of active subscribers
    subscribers: usize,
}

/// One clock per (scheduler, FPS) pair.
type BlinkKey = (usize, u8);

thread_local! {
    /// Map from clock key to blink registry
    static BLINK_REGISTRIES: RefCell<HashMap<BlinkKey, BlinkRegistry>> = RefCell::new(HashMap::new());
}

fn blink_key(scheduler: &Rc<dyn Scheduler>, fps: u8) -> BlinkKey {
    (Rc::as_ptr(scheduler).cast::<()>() as usize, fps)
}

/// Half of a blink cycle: 2 FPS toggles every 250ms.
fn toggle_interval(fps: u8) -> Duration {
    Duration::from_millis((1000 / u64::from(fps) / 2).max(1))
}

fn schedule_toggle(scheduler: &Rc<dyn Scheduler>, key: BlinkKey) -> TimerHandle {
    scheduler.set_timeout(toggle_interval(key.1), Box::new(move || toggle(key)))
}

fn toggle(key: BlinkKey) {
    let clock = BLINK_REGISTRIES.with(|registries| {
        let mut registries = registries.borrow_mut();
        let registry = registries.get_mut(&key)?;
        registry.timer = None;
        (registry.subscribers > 0).then(|| (registry.phase.clone(), registry.scheduler.clone()))
    });
    let Some((phase, scheduler)) = clock else { return };

    // Outside the borrow: setting the signal may run effects that read it
    phase.set(!phase.get());

    let handle = schedule_toggle(&scheduler, key);
    BLINK_REGISTRIES.with(|registries| {
        if let Some(registry) = registries.borrow_mut().get_mut(&key) {
            registry.timer = Some(handle);
        }
    });
}

/// Subscribe to blink animation at the given FPS on `scheduler`.
///
/// Returns an unsubscribe function that must be called when done.
/// Subscribers on the same scheduler at the same FPS share one timer and
/// blink in sync.
///
/// # Arguments
///
/// * `scheduler` - Clock that drives the toggles
/// * `fps` - Blink frequency. 2 FPS = 500ms on/off cycle.
///   If 0, returns a no-op unsubscribe (blink disabled).
pub fn subscribe_to_blink(scheduler: &Rc<dyn Scheduler>, fps: u8) -> Box<dyn FnOnce()> {
    if fps == 0 {
        return Box::new(|| {});
    }

    let key = blink_key(scheduler, fps);
    let start = BLINK_REGISTRIES.with(|registries| {
        let mut registries = registries.borrow_mut();
        let registry = registries.entry(key).or_insert_with(|| BlinkRegistry {
            scheduler: scheduler.clone(),
            phase: signal(true),
            timer: None,
            subscribers: 0,
        });
        registry.subscribers += 1;
        registry.subscribers == 1
    });

    if start {
        let handle = schedule_toggle(scheduler, key);
        BLINK_REGISTRIES.with(|registries| {
            if let Some(registry) = registries.borrow_mut().get_mut(&key) {
                registry.timer = Some(handle);
            }
        });
    }

    Box::new(move || unsubscribe(key))
}

/// The last subscriber removes the clock, releasing its scheduler.
fn unsubscribe(key: BlinkKey) {
    let stopped = BLINK_REGISTRIES.with(|registries| {
        let mut registries = registries.borrow_mut();
        let registry = registries.get_mut(&key)?;
        registry.subscribers = registry.subscribers.saturating_sub(1);
        if registry.subscribers > 0 {
            return None;
        }
        registries.remove(&key)
    });

    if let Some(registry) = stopped {
        if let Some(timer) = registry.timer {
            registry.scheduler.clear_timeout(timer);
        }
        registry.phase.set(true);
    }
}

/// Get the current blink phase for the given clock.
///
/// Returns true (visible) if no clock is running.
pub fn get_blink_phase(scheduler: &Rc<dyn Scheduler>, fps: u8) -> bool {
    get_blink_phase_signal(scheduler, fps).is_none_or(|phase| phase.get())
}

/// Get the blink phase signal for the given clock, for reactive tracking.
pub fn get_blink_phase_signal(scheduler: &Rc<dyn Scheduler>, fps: u8) -> Option<Signal<bool>> {
    let key = blink_key(scheduler, fps);
    BLINK_REGISTRIES.with(|registries| registries.borrow().get(&key).map(|r| r.phase.clone()))
}

/// Check if a blink clock is currently running.
pub fn is_blink_running(scheduler: &Rc<dyn Scheduler>, fps: u8) -> bool {
    let key = blink_key(scheduler, fps);
    BLINK_REGISTRIES.with(|registries| {
        registries
            .borrow()
            .get(&key)
            .is_some_and(|r| r.subscribers > 0 && r.timer.is_some())
    })
}

/// Get the number of subscribers for a given clock.
pub fn get_subscriber_count(scheduler: &Rc<dyn Scheduler>, fps: u8) -> usize {
    let key = blink_key(scheduler, fps);
    BLINK_REGISTRIES.with(|registries| {
        registries
            .borrow()
            .get(&key)
            .map(|r| r.subscribers)
            .unwrap_or(0)
    })
}

/// Reset all blink registries (for testing).
///
/// Cancels all toggle timers and clears all registries.
pub fn reset_blink_registries() {
    let registries = BLINK_REGISTRIES.with(|registries| std::mem::take(&mut *registries.borrow_mut()));
    for registry in registries.into_values() {
        if let Some(timer) = registry.timer {
            registry.scheduler.clear_timeout(timer);
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================
