//! # spark-reveal
//!
//! Scroll-triggered, one-shot reveal effects for reactive UIs.
//!
//! Built on [spark-signals](https://github.com/RLabs-Inc/spark-signals): every
//! effect publishes its output as signals the host renders from.
//!
//! ## Architecture
//!
//! Effects stay dormant until their element scrolls into view, then run
//! exactly once:
//!
//! ```text
//! registry bounds + viewport → VisibilityDetector (one-shot) → effect engine → signals
//!                                   timer queue ─────────────────┘
//! ```
//!
//! Scheduling is single-threaded and cooperative. The host calls
//! [`pipeline::tick`] from its frame loop; nothing runs between ticks.
//!
//! ## Modules
//!
//! - [`types`] - Bounds, percentages, phase enums
//! - [`engine`] - Element registry (indices, bounds, destroy callbacks)
//! - [`state`] - Viewport, timers, visibility detection, animation
//! - [`primitives`] - Typewriter, progress bar, scroll reveal
//! - [`pipeline`] - Mount handle and frame ticking
//! - [`config`] - TOML-configurable defaults

pub mod config;
pub mod engine;
pub mod error;
pub mod pipeline;
pub mod primitives;
pub mod state;
pub mod types;

// Re-export commonly used items
pub use types::*;

pub use config::{ProgressConfig, RevealBlockConfig, RevealConfig, TypewriterConfig};
pub use error::RevealError;

pub use engine::{
    DestroyHook, allocate_index, destroy_callback_count, get_bounds, get_index, is_allocated,
    on_destroy, release_index, remove_destroy_hook, reset_registry, set_bounds,
};

pub use pipeline::{FrameClock, MountHandle, mount, tick};

pub use primitives::{
    Cleanup, ProgressBar, ProgressBarProps, RevealHost, ScrollReveal, ScrollRevealProps,
    Typewriter, TypewriterProps, TypewriterState,
};

pub use state::{
    EASE_OUT_BACK, Easing, LocalScheduler, ObserverId, RevealTarget, Scheduler, TimerHandle,
    Transition, ViewportTrigger, VisibilityDetector, VisibilityTrigger, check_intersections,
};

pub use state::viewport::{intersection_ratio, scroll_by, scroll_to, scroll_top, set_viewport_height};

/// Reset all thread-local reveal state (for testing).
pub fn reset_all() {
    state::animate::reset_blink_registries();
    state::timers::reset_timers();
    state::visibility::reset_observations();
    state::viewport::reset_viewport();
    engine::reset_registry();
}
