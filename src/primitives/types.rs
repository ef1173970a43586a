//! Primitive Types - Host capabilities, props, and cleanup.

use std::rc::Rc;
use std::time::Duration;

use crate::config::{ProgressConfig, RevealBlockConfig, TypewriterConfig};
use crate::state::animate::{EASE_OUT_BACK, Easing};
use crate::state::{LocalScheduler, Scheduler, ViewportTrigger, VisibilityTrigger};

// =============================================================================
// Cleanup Function
// =============================================================================

/// Cleanup function returned by components.
///
/// Call this to unmount the component and release resources.
pub type Cleanup = Box<dyn FnOnce()>;

// =============================================================================
// Host Capabilities
// =============================================================================

/// The capabilities every reveal engine consumes from its host.
#[derive(Clone)]
pub struct RevealHost {
    /// Fires one-shot visibility notifications.
    pub trigger: Rc<dyn VisibilityTrigger>,
    /// Schedules and cancels deferred callbacks.
    pub scheduler: Rc<dyn Scheduler>,
}

impl RevealHost {
    pub fn new(trigger: Rc<dyn VisibilityTrigger>, scheduler: Rc<dyn Scheduler>) -> Self {
        Self { trigger, scheduler }
    }

    /// Host backed by this thread's viewport and timer queue.
    pub fn local() -> Self {
        Self::new(Rc::new(ViewportTrigger), Rc::new(LocalScheduler))
    }
}

impl Default for RevealHost {
    fn default() -> Self {
        Self::local()
    }
}

// =============================================================================
// Typewriter Props
// =============================================================================

/// Properties for [`super::Typewriter`].
#[derive(Debug, Clone, PartialEq)]
pub struct TypewriterProps {
    /// Element ID (generated when `None`).
    pub id: Option<String>,
    /// Text to reveal.
    pub text: String,
    /// Delay between characters. Zero reveals everything at once.
    pub interval: Duration,
    /// Visible fraction that starts typing.
    pub threshold: f32,
    /// Cursor blink rate. 0 hides the cursor.
    pub cursor_fps: u8,
}

impl TypewriterProps {
    pub fn new(text: impl Into<String>) -> Self {
        Self::from_config(text, &TypewriterConfig::default())
    }

    pub fn from_config(text: impl Into<String>, config: &TypewriterConfig) -> Self {
        Self {
            id: None,
            text: text.into(),
            interval: config.interval(),
            threshold: config.threshold,
            cursor_fps: config.cursor_fps,
        }
    }
}

// =============================================================================
// Progress Bar Props
// =============================================================================

/// Properties for [`super::ProgressBar`].
#[derive(Debug, Clone, PartialEq)]
pub struct ProgressBarProps {
    pub id: Option<String>,
    /// Label shown above the bar.
    pub name: String,
    /// Level badge shown next to the name.
    pub level: String,
    /// Fill target such as `"75%"`. Malformed targets leave the bar empty.
    pub target: String,
    pub threshold: f32,
    /// Length of the fill transition.
    pub duration: Duration,
}

impl ProgressBarProps {
    pub fn new(name: impl Into<String>, level: impl Into<String>, target: impl Into<String>) -> Self {
        Self::from_config(name, level, target, &ProgressConfig::default())
    }

    pub fn from_config(
        name: impl Into<String>,
        level: impl Into<String>,
        target: impl Into<String>,
        config: &ProgressConfig,
    ) -> Self {
        Self {
            id: None,
            name: name.into(),
            level: level.into(),
            target: target.into(),
            threshold: config.threshold,
            duration: config.duration(),
        }
    }
}

// =============================================================================
// Scroll Reveal Props
// =============================================================================

/// Properties for [`super::ScrollReveal`].
#[derive(Debug, Clone, PartialEq)]
pub struct ScrollRevealProps {
    pub id: Option<String>,
    pub threshold: f32,
    pub duration: Duration,
    /// Vertical offset of the hidden content.
    pub offset: f32,
    pub easing: Easing,
}

impl ScrollRevealProps {
    pub fn from_config(config: &RevealBlockConfig) -> Self {
        Self {
            id: None,
            threshold: config.threshold,
            duration: config.duration(),
            offset: config.offset,
            easing: EASE_OUT_BACK,
        }
    }
}

impl Default for ScrollRevealProps {
    fn default() -> Self {
        Self::from_config(&RevealBlockConfig::default())
    }
}
