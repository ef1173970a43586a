//! State Module - Runtime state behind the reveal effects
//!
//! - **Viewport** - Scroll position, intersection ratios
//! - **Timers** - Virtual-clock timer queue, `Scheduler` capability
//! - **Visibility** - One-shot visibility observations and detectors
//! - **Animate** - Easing, transitions, shared blink clocks

pub mod animate;
pub mod timers;
pub mod viewport;
pub mod visibility;

pub use animate::{EASE_OUT_BACK, Easing, Transition, subscribe_to_blink};
pub use timers::{LocalScheduler, Scheduler, TimerHandle};
pub use visibility::{
    ObserverId, RevealTarget, ViewportTrigger, VisibilityDetector, VisibilityTrigger,
    check_intersections,
};
