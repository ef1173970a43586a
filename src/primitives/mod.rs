//! Reveal Primitives - Scroll-triggered, one-shot effects.
//!
//! - [`Typewriter`] - Reveal text one character at a time
//! - [`ProgressBar`] - Fill a bar to its target
//! - [`ScrollReveal`] - Fade and slide nested content into place
//!
//! # Lifecycle
//!
//! Every primitive:
//! 1. Allocates an element index from the registry
//! 2. Registers one [`VisibilityDetector`](crate::state::VisibilityDetector)
//!    on that element
//! 3. Stays idle until the detector fires, then runs its effect once
//! 4. Tears down on `teardown()`, on drop, or when its element is released
//!
//! Engines publish their output as signals (`displayed_signal`,
//! `phase_signal`) plus snapshot getters sampled at the scheduler clock.

mod types;
mod progress_bar;
mod scroll_reveal;
mod typewriter;

pub use types::*;
pub use progress_bar::ProgressBar;
pub use scroll_reveal::ScrollReveal;
pub use typewriter::{Typewriter, TypewriterState};
