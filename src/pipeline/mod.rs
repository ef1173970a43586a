//! Pipeline - Host frame loop integration.
//!
//! ```text
//! host scroll/layout → tick(dt) → check_intersections → timers::advance → engine signals → render
//! ```

mod mount;

pub use mount::*;
