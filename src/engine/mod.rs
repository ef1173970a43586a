//! Element Engine - Registry of observable elements.
//!
//! Elements are NOT objects. They are indices with side tables:
//!
//! ```text
//! Index 0: "profile"  (parent=None, bounds=[120, 480))
//! Index 1: "e1"       (parent=0,    bounds=[160, 200))
//! Index 2: "skills"   (parent=None, bounds=unset)
//! ```
//!
//! Reveal engines allocate an index, let the host lay it out via
//! [`set_bounds`], and hook their teardown into [`on_destroy`].

mod registry;

pub use registry::*;
