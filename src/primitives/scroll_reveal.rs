//! Scroll Reveal Primitive - Fade and slide nested content into place.
//!
//! Hidden content sits at zero opacity, pushed down by `offset`. When the
//! wrapper scrolls into view it transitions once to full opacity and zero
//! offset, and never hides again.
//!
//! # Example
//!
//! ```ignore
//! use spark_reveal::primitives::{ScrollReveal, ScrollRevealProps, Typewriter, TypewriterProps};
//!
//! let host = RevealHost::local();
//! let (card, name) = ScrollReveal::mount(&host, ScrollRevealProps::default(), || {
//!     Typewriter::mount(&host, TypewriterProps::new("[YOUR NAME]"))
//! });
//!
//! let style = card.style();
//! ```

use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::time::Duration;

use spark_signals::{Signal, signal};

use crate::engine::{allocate_index, on_destroy, pop_parent_context, push_parent_context, release_index};
use crate::state::animate::{Easing, Transition};
use crate::state::{Scheduler, VisibilityDetector};
use crate::types::{RevealPhase, RevealStyle};

use super::types::{Cleanup, RevealHost, ScrollRevealProps};

struct RevealCore {
    index: usize,
    offset: f32,
    duration: Duration,
    easing: Easing,
    scheduler: Rc<dyn Scheduler>,
    phase: Signal<RevealPhase>,
    transition: Cell<Option<Transition>>,
    detector: RefCell<Option<VisibilityDetector>>,
    /// Style sampled at teardown.
    frozen: Cell<Option<RevealStyle>>,
    torn_down: Cell<bool>,
}

impl RevealCore {
    fn show(&self) {
        if self.torn_down.get() || self.phase.get() != RevealPhase::Hidden {
            return;
        }
        let now = self.scheduler.now();
        self.transition
            .set(Some(Transition::new(now, self.duration, self.easing)));
        self.phase.set(RevealPhase::Shown);
        tracing::debug!(element = self.index, "reveal block shown");
    }

    fn style(&self) -> RevealStyle {
        self.frozen.get().unwrap_or_else(|| self.sample())
    }

    fn sample(&self) -> RevealStyle {
        let hidden = RevealStyle {
            opacity: 0.0,
            offset_y: self.offset,
        };
        if self.phase.get() == RevealPhase::Hidden {
            return hidden;
        }
        let Some(transition) = self.transition.get() else {
            return hidden;
        };

        let now = self.scheduler.now();
        if transition.is_complete(now) {
            return RevealStyle {
                opacity: 1.0,
                offset_y: 0.0,
            };
        }
        let progress = transition.progress(now);
        RevealStyle {
            opacity: progress.clamp(0.0, 1.0),
            offset_y: self.offset * (1.0 - progress),
        }
    }

    fn teardown(&self, release_element: bool) {
        if self.torn_down.replace(true) {
            return;
        }
        self.frozen.set(Some(self.sample()));

        let detector = self.detector.borrow_mut().take();
        drop(detector);

        tracing::debug!(element = self.index, "reveal block torn down");
        if release_element {
            release_index(self.index);
        }
    }
}

// =============================================================================
// Scroll Reveal Component
// =============================================================================

/// Fade/slide wrapper. Dropping it tears it down along with nested elements.
pub struct ScrollReveal {
    core: Rc<RevealCore>,
}

impl ScrollReveal {
    /// Create the wrapper and build its nested content.
    ///
    /// Elements allocated inside `children` are parented to the wrapper and
    /// released with it.
    ///
    /// # Returns
    ///
    /// The wrapper and whatever `children` returned.
    pub fn mount<T>(
        host: &RevealHost,
        props: ScrollRevealProps,
        children: impl FnOnce() -> T,
    ) -> (Self, T) {
        let index = allocate_index(props.id.as_deref());

        let offset = if props.offset.is_finite() {
            props.offset
        } else {
            tracing::warn!(element = index, "non-finite reveal offset, using 0");
            0.0
        };

        let core = Rc::new(RevealCore {
            index,
            offset,
            duration: props.duration,
            easing: props.easing,
            scheduler: host.scheduler.clone(),
            phase: signal(RevealPhase::Hidden),
            transition: Cell::new(None),
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
                    core.show();
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

        push_parent_context(index);
        let content = children();
        pop_parent_context();

        (Self { core }, content)
    }

    pub fn index(&self) -> usize {
        self.core.index
    }

    pub fn phase(&self) -> RevealPhase {
        self.core.phase.get()
    }

    pub fn phase_signal(&self) -> Signal<RevealPhase> {
        self.core.phase.clone()
    }

    /// Opacity and offset to apply now. Fixed once torn down.
    pub fn style(&self) -> RevealStyle {
        self.core.style()
    }

    /// Shown and past the end of its transition.
    pub fn is_settled(&self) -> bool {
        if let Some(style) = self.core.frozen.get() {
            return style.opacity == 1.0 && style.offset_y == 0.0;
        }
        self.core
            .transition
            .get()
            .is_some_and(|transition| transition.is_complete(self.core.scheduler.now()))
    }

    pub fn is_torn_down(&self) -> bool {
        self.core.torn_down.get()
    }

    /// Disconnect and release the wrapper and its nested elements.
    /// Safe to call any number of times.
    pub fn teardown(&self) {
        self.core.teardown(true);
    }

    pub fn into_cleanup(self) -> Cleanup {
        Box::new(move || drop(self))
    }
}

impl Drop for ScrollReveal {
    fn drop(&mut self) {
        self.core.teardown(true);
    }
}

// =============================================================================
// TESTS
// =============================================================================
