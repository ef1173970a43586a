//! Viewport State - Page scroll position and intersection math.
//!
//! The viewport is a vertical window of `height` units starting at
//! `scroll_top` in page coordinates. Element bounds come from the
//! registry; this module only answers "how much of it is on screen".

use std::cell::Cell;

use crate::types::Bounds;

// =============================================================================
// VIEWPORT STATE
// =============================================================================

/// Default viewport height until the host reports one.
pub const DEFAULT_VIEWPORT_HEIGHT: f32 = 24.0;

thread_local! {
    static VIEWPORT_HEIGHT: Cell<f32> = const { Cell::new(DEFAULT_VIEWPORT_HEIGHT) };
    static SCROLL_TOP: Cell<f32> = const { Cell::new(0.0) };
}

/// Set the viewport height (negative and non-finite values become 0).
pub fn set_viewport_height(height: f32) {
    let height = if height.is_finite() { height.max(0.0) } else { 0.0 };
    VIEWPORT_HEIGHT.with(|h| h.set(height));
}

pub fn viewport_height() -> f32 {
    VIEWPORT_HEIGHT.with(Cell::get)
}

/// Current scroll offset from the top of the page.
pub fn scroll_top() -> f32 {
    SCROLL_TOP.with(Cell::get)
}

// =============================================================================
// SCROLL OPERATIONS
// =============================================================================

/// Scroll to an absolute offset (clamped at 0).
pub fn scroll_to(y: f32) {
    let y = if y.is_finite() { y.max(0.0) } else { 0.0 };
    SCROLL_TOP.with(|top| top.set(y));
}

/// Scroll by a delta.
///
/// Returns `true` if the offset changed, `false` if already at the top.
pub fn scroll_by(delta: f32) -> bool {
    let current = scroll_top();
    scroll_to(current + delta);
    scroll_top() != current
}

// =============================================================================
// INTERSECTION
// =============================================================================

/// Fraction of `bounds` currently inside the viewport, in `[0, 1]`.
///
/// A zero-height element counts as fully visible while its top edge lies
/// inside the viewport, and invisible otherwise.
pub fn intersection_ratio(bounds: Bounds) -> f32 {
    let view_top = scroll_top();
    let view_bottom = view_top + viewport_height();

    if bounds.height <= 0.0 {
        return if bounds.top >= view_top && bounds.top <= view_bottom {
            1.0
        } else {
            0.0
        };
    }

    let visible = bounds.bottom().min(view_bottom) - bounds.top.max(view_top);
    (visible / bounds.height).clamp(0.0, 1.0)
}

/// Reset viewport state (for testing).
pub fn reset_viewport() {
    VIEWPORT_HEIGHT.with(|h| h.set(DEFAULT_VIEWPORT_HEIGHT));
    SCROLL_TOP.with(|top| top.set(0.0));
}
