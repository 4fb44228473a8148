//! Reference-counted handle table.
//!
//! Every registered resource starts with one reference. [`HandleTable::retain`]
//! adds one, [`HandleTable::release`] drops one and frees the resource when
//! the count reaches zero. Handle ids are never reused, so a released handle
//! is always recognisable.
//!
//! Releasing a freed handle, touching a freed handle, or presenting a handle
//! the table never issued is an integrity violation. The offending call
//! reports the violation and the table is poisoned: every later call fails
//! with [`HandleError::Poisoned`].

use parking_lot::Mutex;
use std::collections::HashMap;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

static NEXT_TABLE_ID: AtomicU64 = AtomicU64::new(1);

/// Opaque handle to a tracked resource.
///
/// Equality and hashing use handle identity only. The string form is the
/// fixed label `ProofSession{}`.
#[derive(Clone, Copy)]
pub struct ProofHandle {
    table: u64,
    id: u64,
}

impl PartialEq for ProofHandle {
    fn eq(&self, other: &Self) -> bool {
        self.table == other.table && self.id == other.id
    }
}

impl Eq for ProofHandle {}

impl Hash for ProofHandle {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.table.hash(state);
        self.id.hash(state);
    }
}

impl fmt::Display for ProofHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ProofSession{}")
    }
}

impl fmt::Debug for ProofHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ProofSession{}")
    }
}

/// Outcome of a release
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Release {
    /// References remain
    Retained(usize),
    /// Last reference dropped; the resource was freed
    Freed,
}

/// Handle tracking failures
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum HandleError {
    /// Release of a handle whose count already reached zero
    #[error("Handle released after it was freed")]
    DoubleRelease,

    /// Use or retain of a handle whose count already reached zero
    #[error("Handle used after it was freed")]
    UseAfterRelease,

    /// Handle was not issued by this table
    #[error("Handle was not issued by this table")]
    UnknownHandle,

    /// An earlier integrity violation poisoned the table
    #[error("Handle table is poisoned by an earlier integrity violation")]
    Poisoned,
}

struct Entry<T> {
    refs: usize,
    value: Arc<T>,
}

struct TableState<T> {
    entries: HashMap<u64, Entry<T>>,
    next_id: u64,
    poisoned: bool,
}

/// Thread-safe table of reference-counted resources
pub struct HandleTable<T> {
    table_id: u64,
    state: Mutex<TableState<T>>,
}

impl<T> Default for HandleTable<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for HandleTable<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.lock();
        f.debug_struct("HandleTable")
            .field("live", &state.entries.len())
            .field("poisoned", &state.poisoned)
            .finish()
    }
}

impl<T> HandleTable<T> {
    /// Empty table
    pub fn new() -> Self {
        Self {
            table_id: NEXT_TABLE_ID.fetch_add(1, Ordering::Relaxed),
            state: Mutex::new(TableState {
                entries: HashMap::new(),
                next_id: 1,
                poisoned: false,
            }),
        }
    }

    /// Track `value` with a reference count of one
    pub fn register(&self, value: T) -> Result<ProofHandle, HandleError> {
        let mut state = self.state.lock();
        if state.poisoned {
            return Err(HandleError::Poisoned);
        }
        let id = state.next_id;
        state.next_id += 1;
        state.entries.insert(
            id,
            Entry {
                refs: 1,
                value: Arc::new(value),
            },
        );
        tracing::trace!(handle = id, "handle registered");
        Ok(ProofHandle {
            table: self.table_id,
            id,
        })
    }

    /// Take an additional reference; returns the new count
    pub fn retain(&self, handle: &ProofHandle) -> Result<usize, HandleError> {
        let mut state = self.state.lock();
        let entry = self.live_entry(&mut state, handle, HandleError::UseAfterRelease)?;
        entry.refs += 1;
        Ok(entry.refs)
    }

    /// Drop one reference, freeing the resource when none remain
    pub fn release(&self, handle: &ProofHandle) -> Result<Release, HandleError> {
        let freed = {
            let mut state = self.state.lock();
            let entry = self.live_entry(&mut state, handle, HandleError::DoubleRelease)?;
            entry.refs -= 1;
            if entry.refs > 0 {
                return Ok(Release::Retained(entry.refs));
            }
            state.entries.remove(&handle.id)
        };
        // Drop outside the lock; the value may be large
        drop(freed);
        tracing::trace!(handle = handle.id, "handle freed");
        Ok(Release::Freed)
    }

    /// Run `f` against the resource behind `handle`.
    ///
    /// The table lock is not held while `f` runs. A release racing with `f`
    /// frees the resource once `f` returns.
    pub fn with<R>(&self, handle: &ProofHandle, f: impl FnOnce(&T) -> R) -> Result<R, HandleError> {
        let value = {
            let mut state = self.state.lock();
            let entry = self.live_entry(&mut state, handle, HandleError::UseAfterRelease)?;
            Arc::clone(&entry.value)
        };
        Ok(f(&value))
    }

    /// Current reference count of a live handle
    pub fn ref_count(&self, handle: &ProofHandle) -> Result<usize, HandleError> {
        let mut state = self.state.lock();
        let entry = self.live_entry(&mut state, handle, HandleError::UseAfterRelease)?;
        Ok(entry.refs)
    }

    /// Number of live handles
    pub fn len(&self) -> usize {
        self.state.lock().entries.len()
    }

    /// Whether no handle is live
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether an integrity violation has occurred
    pub fn is_poisoned(&self) -> bool {
        self.state.lock().poisoned
    }

    fn live_entry<'a>(
        &self,
        state: &'a mut TableState<T>,
        handle: &ProofHandle,
        freed_error: HandleError,
    ) -> Result<&'a mut Entry<T>, HandleError> {
        if state.poisoned {
            return Err(HandleError::Poisoned);
        }
        let violation = if handle.table != self.table_id || handle.id == 0 || handle.id >= state.next_id {
            HandleError::UnknownHandle
        } else if state.entries.contains_key(&handle.id) {
            return state
                .entries
                .get_mut(&handle.id)
                .ok_or(HandleError::UnknownHandle);
        } else {
            freed_error
        };

        state.poisoned = true;
        tracing::error!(handle = handle.id, error = %violation, "handle integrity violation");
        Err(violation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::atomic::AtomicUsize;

    struct DropCounter(Arc<AtomicUsize>);

    impl Drop for DropCounter {
        fn drop(&mut self) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn test_freed_on_third_release() {
        let drops = Arc::new(AtomicUsize::new(0));
        let table = HandleTable::new();
        let handle = table.register(DropCounter(drops.clone())).unwrap();

        assert_eq!(table.retain(&handle).unwrap(), 2);
        assert_eq!(table.retain(&handle).unwrap(), 3);

        assert_eq!(table.release(&handle).unwrap(), Release::Retained(2));
        assert_eq!(drops.load(Ordering::SeqCst), 0);
        assert_eq!(table.release(&handle).unwrap(), Release::Retained(1));
        assert_eq!(drops.load(Ordering::SeqCst), 0);
        assert_eq!(table.release(&handle).unwrap(), Release::Freed);
        assert_eq!(drops.load(Ordering::SeqCst), 1);
        assert!(table.is_empty());
    }

    #[test]
    fn test_double_release_poisons() {
        let table = HandleTable::new();
        let handle = table.register(5u32).unwrap();
        let other = table.register(6u32).unwrap();
        assert_eq!(table.release(&handle).unwrap(), Release::Freed);

        assert_eq!(table.release(&handle), Err(HandleError::DoubleRelease));
        assert!(table.is_poisoned());
        assert_eq!(table.with(&other, |v| *v), Err(HandleError::Poisoned));
        assert_eq!(table.register(7u32), Err(HandleError::Poisoned));
    }

    #[test]
    fn test_use_after_release_poisons() {
        let table = HandleTable::new();
        let handle = table.register(String::from("session")).unwrap();
        assert_eq!(table.with(&handle, |s| s.len()).unwrap(), 7);
        table.release(&handle).unwrap();

        assert_eq!(table.with(&handle, |s| s.len()), Err(HandleError::UseAfterRelease));
        assert_eq!(table.retain(&handle), Err(HandleError::Poisoned));
    }

    #[test]
    fn test_retain_after_release_is_use_after_release() {
        let table = HandleTable::new();
        let handle = table.register(1u8).unwrap();
        table.release(&handle).unwrap();
        assert_eq!(table.retain(&handle), Err(HandleError::UseAfterRelease));
    }

    #[test]
    fn test_foreign_handle_is_unknown() {
        let first = HandleTable::new();
        let second = HandleTable::<u8>::new();
        let handle = first.register(1u8).unwrap();
        assert_eq!(second.release(&handle), Err(HandleError::UnknownHandle));
        assert!(second.is_poisoned());
        assert!(!first.is_poisoned());
    }

    #[test]
    fn test_identity_semantics() {
        let table = HandleTable::new();
        let a = table.register(42u64).unwrap();
        let b = table.register(42u64).unwrap();
        let a_copy = a;

        assert_ne!(a, b);
        assert_eq!(a, a_copy);
        assert_eq!(a.to_string(), "ProofSession{}");
        assert_eq!(format!("{:?}", b), "ProofSession{}");

        let set: HashSet<ProofHandle> = [a, b, a_copy].into_iter().collect();
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn test_value_outlives_release_during_use() {
        let drops = Arc::new(AtomicUsize::new(0));
        let table = Arc::new(HandleTable::new());
        let handle = table.register(DropCounter(drops.clone())).unwrap();

        let inner = table.clone();
        table
            .with(&handle, |_| {
                assert_eq!(inner.release(&handle).unwrap(), Release::Freed);
                assert_eq!(drops.load(Ordering::SeqCst), 0);
            })
            .unwrap();
        assert_eq!(drops.load(Ordering::SeqCst), 1);
    }
}
