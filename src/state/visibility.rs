//! Visibility Module - One-shot "scrolled into view" notifications.
//!
//! Two layers:
//!
//! - The **observation table**: a thread-local set of pending observations
//!   (element, threshold, callback). [`check_intersections`] evaluates them
//!   against the viewport and fires the ones whose threshold was reached.
//!   An observation is removed before its callback runs, so it can never
//!   fire twice.
//! - [`VisibilityDetector`]: the per-instance handle engines own. It tracks
//!   [`VisibilityState`], disconnects on [`VisibilityDetector::disconnect`]
//!   or on drop, and talks to the table through the [`VisibilityTrigger`]
//!   trait so hosts can plug their own intersection source.
//!
//! # Example
//!
//! ```ignore
//! use spark_reveal::state::visibility::{VisibilityDetector, ViewportTrigger};
//!
//! let detector = VisibilityDetector::register(
//!     Rc::new(ViewportTrigger),
//!     Some(index),
//!     0.5,
//!     || println!("half of it is on screen"),
//! );
//!
//! // Host frame loop
//! check_intersections();
//! ```

use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::rc::Rc;

use crate::engine::{DestroyHook, get_bounds, is_allocated, on_destroy, remove_destroy_hook};
use crate::types::VisibilityState;

use super::viewport::intersection_ratio;

// =============================================================================
// TRIGGER CAPABILITY
// =============================================================================

/// Identifier of a pending observation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObserverId(u64);

impl ObserverId {
    /// Build an id for a host-provided [`VisibilityTrigger`].
    pub const fn from_raw(id: u64) -> Self {
        Self(id)
    }

    pub const fn raw(self) -> u64 {
        self.0
    }
}

/// Visibility-trigger capability consumed by [`VisibilityDetector`].
pub trait VisibilityTrigger {
    /// Start observing `element`. `on_visible` must run at most once, the
    /// first time the element's visible fraction reaches `threshold`.
    ///
    /// Returns `None` when the element does not exist; nothing is observed.
    fn observe(
        &self,
        element: usize,
        threshold: f32,
        on_visible: Box<dyn FnOnce()>,
    ) -> Option<ObserverId>;

    /// Stop observing. Must be safe for fired or unknown ids.
    fn disconnect(&self, id: ObserverId);
}

/// [`VisibilityTrigger`] backed by the registry bounds and the viewport.
#[derive(Debug, Clone, Copy, Default)]
pub struct ViewportTrigger;

impl VisibilityTrigger for ViewportTrigger {
    fn observe(
        &self,
        element: usize,
        threshold: f32,
        on_visible: Box<dyn FnOnce()>,
    ) -> Option<ObserverId> {
        observe(element, threshold, on_visible)
    }

    fn disconnect(&self, id: ObserverId) {
        disconnect(id);
    }
}

// =============================================================================
// OBSERVATION TABLE
// =============================================================================

struct Observation {
    element: usize,
    threshold: f32,
    callback: Box<dyn FnOnce()>,
    /// Drops the observation if the element is released first.
    release_hook: DestroyHook,
}

thread_local! {
    static OBSERVATIONS: RefCell<BTreeMap<ObserverId, Observation>> = const { RefCell::new(BTreeMap::new()) };
    static NEXT_OBSERVER_ID: Cell<u64> = const { Cell::new(0) };
}

/// Clamp a threshold into `[0, 1]`; NaN becomes 0.
pub fn normalize_threshold(threshold: f32) -> f32 {
    if threshold.is_nan() {
        0.0
    } else {
        threshold.clamp(0.0, 1.0)
    }
}

/// Add an observation for an allocated element.
///
/// The observation is dropped automatically when the element is released.
pub fn observe(element: usize, threshold: f32, callback: Box<dyn FnOnce()>) -> Option<ObserverId> {
    if !is_allocated(element) {
        tracing::debug!(element, "observe skipped: element does not exist");
        return None;
    }

    let id = NEXT_OBSERVER_ID.with(|next| {
        let id = next.get();
        next.set(id + 1);
        ObserverId(id)
    });
    let threshold = normalize_threshold(threshold);
    let release_hook = on_destroy(element, move || {
        disconnect(id);
    });

    OBSERVATIONS.with(|observations| {
        observations.borrow_mut().insert(
            id,
            Observation {
                element,
                threshold,
                callback,
                release_hook,
            },
        );
    });

    tracing::debug!(element, threshold, observer = id.0, "observing element");
    Some(id)
}

/// Remove an observation without firing it.
///
/// Returns `true` if it was still pending.
pub fn disconnect(id: ObserverId) -> bool {
    let removed = OBSERVATIONS.with(|observations| observations.borrow_mut().remove(&id));
    let Some(observation) = removed else {
        return false;
    };
    remove_destroy_hook(observation.element, observation.release_hook);
    tracing::debug!(observer = id.0, "observation disconnected");
    true
}

/// Whether an observation has reached its threshold.
///
/// The element must actually intersect the viewport, so a threshold of 0
/// still waits for the first visible sliver.
fn has_crossed(observation: &Observation) -> bool {
    let Some(bounds) = get_bounds(observation.element) else {
        return false;
    };
    let ratio = intersection_ratio(bounds);
    ratio > 0.0 && ratio >= observation.threshold
}

/// Evaluate all pending observations and fire the ones that crossed.
///
/// Fired observations are removed before their callbacks run. A callback
/// that disconnects another observation from the same batch prevents it
/// from firing.
///
/// # Returns
///
/// Number of callbacks fired.
pub fn check_intersections() -> usize {
    let crossed: Vec<ObserverId> = OBSERVATIONS.with(|observations| {
        observations
            .borrow()
            .iter()
            .filter(|(_, observation)| has_crossed(observation))
            .map(|(&id, _)| id)
            .collect()
    });

    let mut fired = 0;
    for id in crossed {
        let observation = OBSERVATIONS.with(|observations| observations.borrow_mut().remove(&id));
        let Some(observation) = observation else { continue };
        remove_destroy_hook(observation.element, observation.release_hook);

        tracing::debug!(
            element = observation.element,
            observer = id.0,
            "element became visible"
        );
        (observation.callback)();
        fired += 1;
    }
    fired
}

/// Number of observations still waiting to fire.
pub fn observation_count() -> usize {
    OBSERVATIONS.with(|observations| observations.borrow().len())
}

/// Drop all observations without firing (for testing).
pub fn reset_observations() {
    let dropped = OBSERVATIONS.with(|observations| std::mem::take(&mut *observations.borrow_mut()));
    drop(dropped);
    NEXT_OBSERVER_ID.with(|next| next.set(0));
}

// =============================================================================
// DETECTOR
// =============================================================================

/// The element and threshold a detector watches.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RevealTarget {
    pub element: usize,
    pub threshold: f32,
}

/// One-shot visibility subscription owned by a single reveal instance.
///
/// Fires its callback at most once. Disconnects right before firing, on
/// [`disconnect`](Self::disconnect), on drop, and when the watched element
/// is released.
pub struct VisibilityDetector {
    trigger: Rc<dyn VisibilityTrigger>,
    target: Rc<Cell<Option<RevealTarget>>>,
    observer: Rc<Cell<Option<ObserverId>>>,
    state: Rc<Cell<VisibilityState>>,
    release_hook: Rc<Cell<Option<DestroyHook>>>,
}

/// Drop the detector's element hook, if it is still registered.
fn clear_release_hook(target: &Cell<Option<RevealTarget>>, release_hook: &Cell<Option<DestroyHook>>) {
    if let (Some(target), Some(hook)) = (target.get(), release_hook.take()) {
        remove_destroy_hook(target.element, hook);
    }
}

impl VisibilityDetector {
    /// Start watching `element`.
    ///
    /// # Arguments
    ///
    /// * `trigger` - Intersection source
    /// * `element` - Element index. `None` or an unallocated index makes
    ///   this a silent no-op: the callback never runs.
    /// * `threshold` - Visible fraction in `[0, 1]` (clamped)
    /// * `on_visible` - Runs once when the threshold is first reached
    pub fn register(
        trigger: Rc<dyn VisibilityTrigger>,
        element: Option<usize>,
        threshold: f32,
        on_visible: impl FnOnce() + 'static,
    ) -> Self {
        let threshold = normalize_threshold(threshold);
        let detector = Self {
            trigger,
            target: Rc::new(Cell::new(
                element.map(|element| RevealTarget { element, threshold }),
            )),
            observer: Rc::new(Cell::new(None)),
            state: Rc::new(Cell::new(VisibilityState::default())),
            release_hook: Rc::new(Cell::new(None)),
        };

        let Some(target) = detector.target.get() else {
            tracing::debug!("visibility detector registered without an element");
            return detector;
        };

        let observer = detector.observer.clone();
        let state = detector.state.clone();
        let target_cell = detector.target.clone();
        let release_hook = detector.release_hook.clone();
        let id = detector.trigger.observe(
            target.element,
            target.threshold,
            Box::new(move || {
                observer.set(None);
                clear_release_hook(&target_cell, &release_hook);
                state.set(VisibilityState {
                    observed: false,
                    visible: true,
                });
                on_visible();
            }),
        );
        let Some(id) = id else { return detector };
        if detector.state.get().visible {
            // Trigger fired during observe
            return detector;
        }

        detector.observer.set(Some(id));
        detector.state.set(VisibilityState {
            observed: true,
            visible: false,
        });

        // Releasing the element ends the observation for any trigger
        if is_allocated(target.element) {
            let trigger = detector.trigger.clone();
            let observer = detector.observer.clone();
            let state = detector.state.clone();
            let target_cell = detector.target.clone();
            let release_hook = detector.release_hook.clone();
            let hook = on_destroy(target.element, move || {
                release_hook.set(None);
                if let Some(id) = observer.take() {
                    trigger.disconnect(id);
                }
                target_cell.set(None);
                let current = state.get();
                state.set(VisibilityState {
                    observed: false,
                    ..current
                });
            });
            detector.release_hook.set(Some(hook));
        }

        detector
    }

    /// Stop watching. Safe to call any number of times, before or after
    /// the detector fired.
    pub fn disconnect(&self) {
        if let Some(id) = self.observer.take() {
            self.trigger.disconnect(id);
        }
        clear_release_hook(&self.target, &self.release_hook);
        self.target.set(None);
        let state = self.state.get();
        self.state.set(VisibilityState {
            observed: false,
            ..state
        });
    }

    pub fn state(&self) -> VisibilityState {
        self.state.get()
    }

    pub fn is_visible(&self) -> bool {
        self.state.get().visible
    }

    pub fn is_observing(&self) -> bool {
        self.state.get().observed
    }

    /// The watched target; `None` once torn down or when nothing was watched.
    pub fn target(&self) -> Option<RevealTarget> {
        self.target.get()
    }
}

impl Drop for VisibilityDetector {
    fn drop(&mut self) {
        self.disconnect();
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{
        allocate_index, destroy_callback_count, release_index, reset_registry, set_bounds,
    };
    use crate::state::viewport::{reset_viewport, scroll_to, set_viewport_height};
    use crate::types::Bounds;

    fn setup() -> usize {
        reset_registry();
        reset_observations();
        reset_viewport();
        set_viewport_height(100.0);

        // Element sits below the fold: 200..240
        let index = allocate_index(None);
        set_bounds(index, Bounds::new(200.0, 40.0));
        index
    }

    fn counter() -> (Rc<Cell<u32>>, impl FnOnce() + 'static) {
        let count = Rc::new(Cell::new(0));
        let count_clone = count.clone();
        (count, move || count_clone.set(count_clone.get() + 1))
    }

    fn trigger() -> Rc<dyn VisibilityTrigger> {
        Rc::new(ViewportTrigger)
    }

    #[test]
    fn test_fires_once_at_threshold() {
        let index = setup();
        let (count, callback) = counter();
        let detector = VisibilityDetector::register(trigger(), Some(index), 0.5, callback);

        assert!(detector.is_observing());
        assert_eq!(check_intersections(), 0);

        // 25% visible: below threshold
        scroll_to(110.0);
        check_intersections();
        assert_eq!(count.get(), 0);
        assert!(!detector.is_visible());

        // Exactly 50%
        scroll_to(120.0);
        assert_eq!(check_intersections(), 1);
        assert_eq!(count.get(), 1);
        assert_eq!(
            detector.state(),
            VisibilityState {
                observed: false,
                visible: true
            }
        );

        // Leave and re-enter
        scroll_to(0.0);
        check_intersections();
        scroll_to(180.0);
        check_intersections();
        assert_eq!(count.get(), 1);
        assert_eq!(observation_count(), 0);
    }

    #[test]
    fn test_not_synchronous_on_register() {
        let index = setup();
        scroll_to(200.0);

        let (count, callback) = counter();
        let _detector = VisibilityDetector::register(trigger(), Some(index), 0.5, callback);
        assert_eq!(count.get(), 0);

        check_intersections();
        assert_eq!(count.get(), 1);
    }

    #[test]
    fn test_zero_threshold_needs_intersection() {
        let index = setup();
        let (count, callback) = counter();
        let _detector = VisibilityDetector::register(trigger(), Some(index), 0.0, callback);

        check_intersections();
        assert_eq!(count.get(), 0);

        scroll_to(101.0);
        check_intersections();
        assert_eq!(count.get(), 1);
    }

    #[test]
    fn test_absent_element_is_noop() {
        setup();
        let (count, callback) = counter();
        let detector = VisibilityDetector::register(trigger(), None, 0.5, callback);

        assert!(!detector.is_observing());
        assert_eq!(detector.target(), None);
        assert_eq!(observation_count(), 0);

        let (count2, callback2) = counter();
        let released = allocate_index(None);
        release_index(released);
        let detector2 = VisibilityDetector::register(trigger(), Some(released), 0.5, callback2);
        assert!(!detector2.is_observing());

        scroll_to(200.0);
        check_intersections();
        assert_eq!(count.get(), 0);
        assert_eq!(count2.get(), 0);
        detector.disconnect();
        detector2.disconnect();
    }

    #[test]
    fn test_disconnect_before_visible() {
        let index = setup();
        let (count, callback) = counter();
        let detector = VisibilityDetector::register(trigger(), Some(index), 0.5, callback);

        detector.disconnect();
        detector.disconnect();
        assert_eq!(observation_count(), 0);
        assert_eq!(detector.target(), None);

        scroll_to(200.0);
        check_intersections();
        assert_eq!(count.get(), 0);
        assert!(!detector.is_visible());
    }

    #[test]
    fn test_drop_disconnects() {
        let index = setup();
        let (count, callback) = counter();
        drop(VisibilityDetector::register(trigger(), Some(index), 0.5, callback));

        assert_eq!(observation_count(), 0);
        scroll_to(200.0);
        check_intersections();
        assert_eq!(count.get(), 0);
    }

    #[test]
    fn test_element_release_disconnects() {
        let index = setup();
        let (count, callback) = counter();
        let detector = VisibilityDetector::register(trigger(), Some(index), 0.5, callback);

        release_index(index);
        assert_eq!(observation_count(), 0);
        assert!(!detector.is_observing());
        assert!(!detector.is_visible());
        assert_eq!(detector.target(), None);

        scroll_to(200.0);
        check_intersections();
        assert_eq!(count.get(), 0);
        detector.disconnect();
    }

    #[test]
    fn test_release_hooks_do_not_accumulate() {
        let index = setup();

        for _ in 0..1000 {
            let (_, callback) = counter();
            let detector = VisibilityDetector::register(trigger(), Some(index), 0.5, callback);
            detector.disconnect();
        }
        assert_eq!(destroy_callback_count(index), 0);
        assert_eq!(observation_count(), 0);

        // Firing also drops the hooks
        let (count, callback) = counter();
        let _detector = VisibilityDetector::register(trigger(), Some(index), 0.5, callback);
        assert_eq!(destroy_callback_count(index), 2);
        scroll_to(200.0);
        check_intersections();
        assert_eq!(count.get(), 1);
        assert_eq!(destroy_callback_count(index), 0);

        // Raw observations clean up after themselves too
        let id = observe(index, 0.5, Box::new(|| {}));
        assert_eq!(destroy_callback_count(index), 1);
        assert!(id.is_some_and(disconnect));
        assert_eq!(destroy_callback_count(index), 0);
    }

    #[test]
    fn test_threshold_normalized() {
        assert_eq!(normalize_threshold(-1.0), 0.0);
        assert_eq!(normalize_threshold(2.0), 1.0);
        assert_eq!(normalize_threshold(f32::NAN), 0.0);
        assert_eq!(normalize_threshold(0.2), 0.2);
    }

    #[test]
    fn test_callback_can_disconnect_peer() {
        let index = setup();
        let (count, callback) = counter();

        let peer = Rc::new(RefCell::new(None::<VisibilityDetector>));
        let peer_clone = peer.clone();
        let _first = VisibilityDetector::register(trigger(), Some(index), 0.5, move || {
            if let Some(detector) = peer_clone.borrow_mut().take() {
                detector.disconnect();
            }
        });
        *peer.borrow_mut() = Some(VisibilityDetector::register(
            trigger(),
            Some(index),
            0.5,
            callback,
        ));

        scroll_to(200.0);
        assert_eq!(check_intersections(), 1);
        assert_eq!(count.get(), 0);
    }
}
