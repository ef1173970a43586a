//! Timer Queue - Deferred execution on a cooperative virtual clock.
//!
//! Timers never fire on their own. The host advances the clock from its
//! frame loop (see [`crate::pipeline::tick`]) and every timer that falls due
//! inside the advanced span runs, in due order, on the calling thread.
//!
//! # Pattern
//!
//! - `set_timeout` returns a [`TimerHandle`]
//! - `clear_timeout` cancels it; clearing twice or after firing is a no-op
//! - Callbacks run with no internal borrow held, so they may schedule or
//!   cancel other timers
//!
//! # Example
//!
//! ```ignore
//! use spark_reveal::state::timers;
//!
//! let handle = timers::set_timeout(Duration::from_millis(100), Box::new(|| {
//!     // runs once the clock passes 100ms
//! }));
//! timers::advance(Duration::from_millis(100));
//! ```

use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap};
use std::time::Duration;

// =============================================================================
// TYPES
// =============================================================================

/// Handle to a scheduled callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerHandle(u64);

impl TimerHandle {
    /// Build a handle for a host-provided [`Scheduler`].
    pub const fn from_raw(id: u64) -> Self {
        Self(id)
    }

    pub const fn raw(self) -> u64 {
        self.0
    }
}

/// Deferred-execution capability consumed by the reveal engines.
pub trait Scheduler {
    /// Run `callback` once, `delay` after the current time.
    fn set_timeout(&self, delay: Duration, callback: Box<dyn FnOnce()>) -> TimerHandle;

    /// Cancel a pending callback. Must be safe for fired or unknown handles.
    fn clear_timeout(&self, handle: TimerHandle);

    /// Current time on this scheduler's clock.
    fn now(&self) -> Duration;
}

/// [`Scheduler`] backed by this thread's timer queue.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalScheduler;

impl Scheduler for LocalScheduler {
    fn set_timeout(&self, delay: Duration, callback: Box<dyn FnOnce()>) -> TimerHandle {
        set_timeout(delay, callback)
    }

    fn clear_timeout(&self, handle: TimerHandle) {
        clear_timeout(handle);
    }

    fn now(&self) -> Duration {
        now()
    }
}

// =============================================================================
// TIMER QUEUE
// =============================================================================

#[derive(Default)]
struct TimerQueue {
    /// Current virtual time.
    now: Duration,
    /// Sequence for handles; also breaks ties between equal due times.
    next_id: u64,
    /// Pending callbacks keyed by (due time, id).
    pending: BTreeMap<(Duration, u64), Box<dyn FnOnce()>>,
    /// Due time per pending id, for cancellation.
    due_by_id: HashMap<u64, Duration>,
}

thread_local! {
    static TIMERS: RefCell<TimerQueue> = RefCell::new(TimerQueue::default());
}

// =============================================================================
// PUBLIC API
// =============================================================================

/// Schedule `callback` to run `delay` from now.
pub fn set_timeout(delay: Duration, callback: Box<dyn FnOnce()>) -> TimerHandle {
    TIMERS.with(|timers| {
        let mut queue = timers.borrow_mut();
        let id = queue.next_id;
        queue.next_id += 1;

        let due = queue.now.saturating_add(delay);
        queue.pending.insert((due, id), callback);
        queue.due_by_id.insert(id, due);

        tracing::trace!(id, due_ms = due.as_millis() as u64, "timer scheduled");
        TimerHandle(id)
    })
}

/// Cancel a pending timer.
///
/// Returns `true` if the timer was still pending.
pub fn clear_timeout(handle: TimerHandle) -> bool {
    // Drop the callback after the borrow ends: its captures may own timers
    let removed = TIMERS.with(|timers| {
        let mut queue = timers.borrow_mut();
        let due = queue.due_by_id.remove(&handle.0)?;
        queue.pending.remove(&(due, handle.0))
    });
    if removed.is_some() {
        tracing::trace!(id = handle.0, "timer cleared");
    }
    removed.is_some()
}

/// Current virtual time.
pub fn now() -> Duration {
    TIMERS.with(|timers| timers.borrow().now)
}

/// Number of callbacks waiting to fire.
pub fn pending_timers() -> usize {
    TIMERS.with(|timers| timers.borrow().pending.len())
}

/// Check if a particular timer is still pending.
pub fn is_pending(handle: TimerHandle) -> bool {
    TIMERS.with(|timers| timers.borrow().due_by_id.contains_key(&handle.0))
}

/// Advance the clock by `dt`, running every timer that falls due.
///
/// Timers scheduled by a callback that fall inside the same span run in
/// this call too. During a callback, [`now`] reports that timer's due time.
///
/// # Returns
///
/// Number of callbacks run.
pub fn advance(dt: Duration) -> usize {
    let target = now().saturating_add(dt);
    let mut fired = 0;

    loop {
        let next = TIMERS.with(|timers| {
            let mut queue = timers.borrow_mut();
            let (&(due, id), _) = queue.pending.first_key_value()?;
            if due > target {
                return None;
            }
            let callback = queue.pending.remove(&(due, id))?;
            queue.due_by_id.remove(&id);
            queue.now = queue.now.max(due);
            Some(callback)
        });
        let Some(callback) = next else { break };

        callback();
        fired += 1;
    }

    TIMERS.with(|timers| {
        let mut queue = timers.borrow_mut();
        queue.now = queue.now.max(target);
    });
    fired
}

/// Reset the clock and drop every pending timer (for testing).
pub fn reset_timers() {
    let dropped = TIMERS.with(|timers| std::mem::take(&mut *timers.borrow_mut()));
    drop(dropped);
}

// =============================================================================
// TESTS
// =============================================================================
