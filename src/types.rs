//! Core types shared by the reveal engines.
//!
//! - [`Bounds`] - vertical placement of an element in page coordinates
//! - [`Percentage`] - validated fill target for progress bars
//! - Phase enums for each engine's state machine
//! - [`VisibilityState`] - what a detector has seen so far

use std::fmt;
use std::str::FromStr;

use crate::error::RevealError;

// =============================================================================
// Geometry
// =============================================================================

/// Vertical extent of an element on the page.
///
/// Reveal effects only care about vertical scrolling, so horizontal
/// placement is left to the host's layout.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Bounds {
    /// Distance from the top of the page.
    pub top: f32,
    /// Element height. Zero-height elements are allowed.
    pub height: f32,
}

impl Bounds {
    pub fn new(top: f32, height: f32) -> Self {
        Self {
            top,
            height: height.max(0.0),
        }
    }

    pub fn bottom(&self) -> f32 {
        self.top + self.height
    }
}

// =============================================================================
// Percentage
// =============================================================================

/// A fill level in `[0, 100]`.
///
/// Parses `"75%"`, `"75"` and `" 75.5 % "`. Anything else, including
/// values outside the range or non-finite numbers, is rejected.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default)]
pub struct Percentage(f32);

impl Percentage {
    pub const ZERO: Percentage = Percentage(0.0);
    pub const FULL: Percentage = Percentage(100.0);

    /// Create a percentage from a raw value.
    pub fn new(value: f32) -> Result<Self, RevealError> {
        if value.is_finite() && (0.0..=100.0).contains(&value) {
            Ok(Self(value))
        } else {
            Err(RevealError::InvalidPercentage(value.to_string()))
        }
    }

    /// Value in `[0, 100]`.
    pub fn value(self) -> f32 {
        self.0
    }

    /// Value in `[0, 1]`.
    pub fn fraction(self) -> f32 {
        self.0 / 100.0
    }
}

impl FromStr for Percentage {
    type Err = RevealError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let number = trimmed.strip_suffix('%').unwrap_or(trimmed).trim();
        let value: f32 = number
            .parse()
            .map_err(|_| RevealError::InvalidPercentage(s.to_string()))?;
        Percentage::new(value).map_err(|_| RevealError::InvalidPercentage(s.to_string()))
    }
}

impl fmt::Display for Percentage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}%", self.0)
    }
}

// =============================================================================
// Engine Phases
// =============================================================================

/// Detector state. `visible` flips to true at most once and never reverts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct VisibilityState {
    /// An observation is currently active.
    pub observed: bool,
    /// The threshold has been crossed.
    pub visible: bool,
}

/// Typewriter state machine: `Idle -> Typing -> Done`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TypewriterPhase {
    #[default]
    Idle,
    Typing,
    Done,
}

/// Progress bar state machine: `Hidden -> Animating -> Settled`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProgressPhase {
    #[default]
    Hidden,
    Animating,
    Settled,
}

/// Fade/slide wrapper state. One transition only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RevealPhase {
    #[default]
    Hidden,
    Shown,
}

/// Visual properties a fade/slide wrapper applies to its content.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RevealStyle {
    /// Opacity in `[0, 1]`.
    pub opacity: f32,
    /// Vertical offset in layout units (positive = below resting place).
    pub offset_y: f32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_percentage_parse() {
        assert_eq!("75%".parse::<Percentage>().unwrap().value(), 75.0);
        assert_eq!("40".parse::<Percentage>().unwrap().value(), 40.0);
        assert_eq!(" 12.5 % ".parse::<Percentage>().unwrap().value(), 12.5);
        assert_eq!("0%".parse::<Percentage>().unwrap(), Percentage::ZERO);
        assert_eq!("100%".parse::<Percentage>().unwrap(), Percentage::FULL);
    }

    #[test]
    fn test_percentage_rejects_malformed() {
        assert!("".parse::<Percentage>().is_err());
        assert!("%".parse::<Percentage>().is_err());
        assert!("abc".parse::<Percentage>().is_err());
        assert!("-5%".parse::<Percentage>().is_err());
        assert!("150%".parse::<Percentage>().is_err());
        assert!("NaN".parse::<Percentage>().is_err());
        assert!(Percentage::new(f32::INFINITY).is_err());
    }

    #[test]
    fn test_percentage_display_and_fraction() {
        let p = Percentage::new(75.0).unwrap();
        assert_eq!(p.to_string(), "75%");
        assert!((p.fraction() - 0.75).abs() < f32::EPSILON);
    }

    #[test]
    fn test_bounds_clamps_height() {
        let b = Bounds::new(10.0, -4.0);
        assert_eq!(b.height, 0.0);
        assert_eq!(b.bottom(), 10.0);
    }
}
