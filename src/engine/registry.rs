//! Element Registry - Index allocation for observable elements.
//!
//! Manages the lifecycle of element indices:
//! - ID ↔ Index bidirectional mapping
//! - Free index pool for O(1) reuse
//! - Layout bounds per element (written by the host's layout pass)
//! - Parent context stack for nested content
//! - Destroy callbacks, run when an element is released (removable by handle)

use std::cell::RefCell;
use std::collections::{BTreeSet, HashMap};

use crate::types::Bounds;

// =============================================================================
// Registry State
// =============================================================================

thread_local! {
    /// Map element ID to index.
    static ID_TO_INDEX: RefCell<HashMap<String, usize>> = RefCell::new(HashMap::new());

    /// Map index to element ID.
    static INDEX_TO_ID: RefCell<HashMap<usize, String>> = RefCell::new(HashMap::new());

    /// Currently allocated indices, ordered for deterministic iteration.
    static ALLOCATED_INDICES: RefCell<BTreeSet<usize>> = const { RefCell::new(BTreeSet::new()) };

    /// Pool of freed indices for reuse.
    static FREE_INDICES: RefCell<Vec<usize>> = const { RefCell::new(Vec::new()) };

    /// Next index to allocate if pool is empty.
    static NEXT_INDEX: RefCell<usize> = const { RefCell::new(0) };

    /// Counter for generating unique IDs.
    static ID_COUNTER: RefCell<usize> = const { RefCell::new(0) };

    /// Stack of parent indices for nested content creation.
    static PARENT_STACK: RefCell<Vec<usize>> = const { RefCell::new(Vec::new()) };

    /// Parent of each nested element.
    static PARENTS: RefCell<HashMap<usize, usize>> = RefCell::new(HashMap::new());

    /// Layout bounds per element.
    static BOUNDS: RefCell<HashMap<usize, Bounds>> = RefCell::new(HashMap::new());

    /// Destroy callbacks registered per index, tagged with their hook id.
    static DESTROY_CALLBACKS: RefCell<HashMap<usize, Vec<(DestroyHook, Box<dyn FnOnce()>)>>> = RefCell::new(HashMap::new());

    /// Counter for destroy hook ids.
    static NEXT_HOOK: RefCell<u64> = const { RefCell::new(0) };
}

/// Handle to a destroy callback, for removing it before the element is released.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DestroyHook(u64);

// =============================================================================
// Parent Context Stack
// =============================================================================

/// Get current parent index (None at the root).
pub fn get_current_parent_index() -> Option<usize> {
    PARENT_STACK.with(|stack| stack.borrow().last().copied())
}

/// Push a parent index onto the stack.
pub fn push_parent_context(index: usize) {
    PARENT_STACK.with(|stack| {
        stack.borrow_mut().push(index);
    })
}

/// Pop a parent index from the stack.
pub fn pop_parent_context() {
    PARENT_STACK.with(|stack| {
        stack.borrow_mut().pop();
    })
}

/// Get the parent an element was created under.
pub fn get_parent_index(index: usize) -> Option<usize> {
    PARENTS.with(|parents| parents.borrow().get(&index).copied())
}

// =============================================================================
// Index Allocation
// =============================================================================

/// Next generated ID not already taken by a caller-supplied one.
fn generate_id() -> String {
    loop {
        let id = ID_COUNTER.with(|counter| {
            let mut counter = counter.borrow_mut();
            let id = format!("e{}", *counter);
            *counter += 1;
            id
        });
        if get_index(&id).is_none() {
            return id;
        }
    }
}

/// Allocate an index for a new element.
///
/// The element is parented to the current parent context, if any.
///
/// # Arguments
/// * `id` - Optional element ID. If not provided, one is generated.
///   Every call yields a distinct element: an ID that is already live is
///   logged and replaced by a generated one, and lookups by that ID keep
///   pointing at the first element.
///
/// # Returns
/// The allocated index.
pub fn allocate_index(id: Option<&str>) -> usize {
    let element_id = match id {
        Some(id) if get_index(id).is_some() => {
            tracing::warn!(id, "element id already in use, allocating a fresh element");
            generate_id()
        }
        Some(id) => id.to_string(),
        None => generate_id(),
    };

    let index = FREE_INDICES.with(|free| {
        let mut free = free.borrow_mut();
        if let Some(index) = free.pop() {
            index
        } else {
            NEXT_INDEX.with(|next| {
                let mut next = next.borrow_mut();
                let index = *next;
                *next += 1;
                index
            })
        }
    });

    ID_TO_INDEX.with(|map| {
        map.borrow_mut().insert(element_id.clone(), index);
    });
    INDEX_TO_ID.with(|map| {
        map.borrow_mut().insert(index, element_id);
    });
    ALLOCATED_INDICES.with(|set| {
        set.borrow_mut().insert(index);
    });
    if let Some(parent) = get_current_parent_index() {
        PARENTS.with(|parents| {
            parents.borrow_mut().insert(index, parent);
        });
    }

    index
}

/// Release an index back to the pool.
///
/// Children are released first, then the element's destroy callbacks run.
/// Releasing an index that is not allocated does nothing.
pub fn release_index(index: usize) {
    let id = INDEX_TO_ID.with(|map| map.borrow().get(&index).cloned());
    let Some(id) = id else { return };

    // Collect first: release mutates the parent map
    let children: Vec<usize> = PARENTS.with(|parents| {
        parents
            .borrow()
            .iter()
            .filter(|&(_, &parent)| parent == index)
            .map(|(&child, _)| child)
            .collect()
    });
    for child in children {
        release_index(child);
    }

    run_destroy_callbacks(index);

    ID_TO_INDEX.with(|map| {
        map.borrow_mut().remove(&id);
    });
    INDEX_TO_ID.with(|map| {
        map.borrow_mut().remove(&index);
    });
    ALLOCATED_INDICES.with(|set| {
        set.borrow_mut().remove(&index);
    });
    PARENTS.with(|parents| {
        parents.borrow_mut().remove(&index);
    });
    BOUNDS.with(|bounds| {
        bounds.borrow_mut().remove(&index);
    });

    FREE_INDICES.with(|free| {
        free.borrow_mut().push(index);
    });

    let is_empty = ALLOCATED_INDICES.with(|set| set.borrow().is_empty());
    if is_empty {
        FREE_INDICES.with(|free| free.borrow_mut().clear());
        NEXT_INDEX.with(|next| *next.borrow_mut() = 0);
    }
}

// =============================================================================
// Bounds
// =============================================================================

/// Record the layout bounds of an element. Ignored for unallocated indices.
pub fn set_bounds(index: usize, bounds: Bounds) {
    if !is_allocated(index) {
        return;
    }
    BOUNDS.with(|map| {
        map.borrow_mut().insert(index, bounds);
    });
}

/// Get the layout bounds of an element, if the host has laid it out.
pub fn get_bounds(index: usize) -> Option<Bounds> {
    BOUNDS.with(|map| map.borrow().get(&index).copied())
}

// =============================================================================
// Destroy Callbacks
// =============================================================================

/// Register a callback to run when the element at `index` is released.
///
/// Keep the returned hook to drop the callback early with
/// [`remove_destroy_hook`] when its owner goes away first.
pub fn on_destroy(index: usize, callback: impl FnOnce() + 'static) -> DestroyHook {
    let hook = NEXT_HOOK.with(|next| {
        let mut next = next.borrow_mut();
        let hook = DestroyHook(*next);
        *next += 1;
        hook
    });
    DESTROY_CALLBACKS.with(|callbacks| {
        callbacks
            .borrow_mut()
            .entry(index)
            .or_default()
            .push((hook, Box::new(callback)));
    });
    hook
}

/// Remove a destroy callback without running it.
///
/// Returns `true` if it was still registered.
pub fn remove_destroy_hook(index: usize, hook: DestroyHook) -> bool {
    // Drop the callback after the borrow ends: its captures may own hooks
    let removed = DESTROY_CALLBACKS.with(|callbacks| {
        let mut callbacks = callbacks.borrow_mut();
        let list = callbacks.get_mut(&index)?;
        let position = list.iter().position(|(id, _)| *id == hook)?;
        let entry = list.remove(position);
        if list.is_empty() {
            callbacks.remove(&index);
        }
        Some(entry)
    });
    removed.is_some()
}

/// Number of destroy callbacks waiting on an element.
pub fn destroy_callback_count(index: usize) -> usize {
    DESTROY_CALLBACKS.with(|callbacks| callbacks.borrow().get(&index).map_or(0, Vec::len))
}

/// Run and clear destroy callbacks for an index.
fn run_destroy_callbacks(index: usize) {
    let callbacks = DESTROY_CALLBACKS.with(|callbacks| callbacks.borrow_mut().remove(&index));
    for (_, callback) in callbacks.into_iter().flatten() {
        callback();
    }
}

// =============================================================================
// Lookups
// =============================================================================

/// Get index for an element ID.
pub fn get_index(id: &str) -> Option<usize> {
    ID_TO_INDEX.with(|map| map.borrow().get(id).copied())
}

/// Get ID for an index.
pub fn get_id(index: usize) -> Option<String> {
    INDEX_TO_ID.with(|map| map.borrow().get(&index).cloned())
}

/// Get all currently allocated indices in ascending order.
pub fn get_allocated_indices() -> Vec<usize> {
    ALLOCATED_INDICES.with(|set| set.borrow().iter().copied().collect())
}

/// Check if an index is currently allocated.
pub fn is_allocated(index: usize) -> bool {
    ALLOCATED_INDICES.with(|set| set.borrow().contains(&index))
}

/// Get the count of currently allocated elements.
pub fn get_allocated_count() -> usize {
    ALLOCATED_INDICES.with(|set| set.borrow().len())
}

// =============================================================================
// Reset (for testing)
// =============================================================================

/// Reset all registry state (for testing).
///
/// Pending destroy callbacks are dropped without running.
pub fn reset_registry() {
    ID_TO_INDEX.with(|map| map.borrow_mut().clear());
    INDEX_TO_ID.with(|map| map.borrow_mut().clear());
    ALLOCATED_INDICES.with(|set| set.borrow_mut().clear());
    FREE_INDICES.with(|free| free.borrow_mut().clear());
    NEXT_INDEX.with(|next| *next.borrow_mut() = 0);
    ID_COUNTER.with(|counter| *counter.borrow_mut() = 0);
    PARENT_STACK.with(|stack| stack.borrow_mut().clear());
    PARENTS.with(|parents| parents.borrow_mut().clear());
    BOUNDS.with(|bounds| bounds.borrow_mut().clear());
    NEXT_HOOK.with(|next| *next.borrow_mut() = 0);
    let dropped = DESTROY_CALLBACKS.with(|callbacks| std::mem::take(&mut *callbacks.borrow_mut()));
    drop(dropped);
}
