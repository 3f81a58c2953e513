//! Snapshot observer registry.
//!
//! Observers receive the full store snapshot after every applied delta,
//! every successful resync, and once on start. Emission works against a
//! copy of the registry taken up front, so an observer removed mid-round is
//! still called that round and one added mid-round waits for the next; the
//! internal lock is never held while an observer runs, so observers may
//! register or remove freely. Each observer runs under panic isolation: one
//! broken observer cannot stop delta application or starve the rest of the
//! round.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

/// Identifier returned by [`SnapshotObservers::observe`], accepted by
/// [`SnapshotObservers::remove`].
pub type ObserverId = u64;

type SnapshotFn<T> = dyn Fn(&[T]) + Send + Sync;

/// Registry of snapshot observers for one synchronized collection.
pub struct SnapshotObservers<T> {
    entries: Mutex<Vec<(ObserverId, Arc<SnapshotFn<T>>)>>,
    next_id: AtomicU64,
}

impl<T> SnapshotObservers<T> {
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(Vec::new()),
            next_id: AtomicU64::new(1),
        }
    }

    /// Register an observer; it receives every emitted snapshot until
    /// removed via [`remove`](Self::remove).
    pub fn observe(&self, observer: impl Fn(&[T]) + Send + Sync + 'static) -> ObserverId {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.entries.lock().push((id, Arc::new(observer)));
        id
    }

    /// Remove an observer. Unknown ids are ignored.
    pub fn remove(&self, id: ObserverId) {
        self.entries.lock().retain(|(oid, _)| *oid != id);
    }

    /// Deliver `snapshot` to every currently registered observer, in
    /// registration order.
    pub fn emit(&self, snapshot: &[T]) {
        let round: Vec<(ObserverId, Arc<SnapshotFn<T>>)> = {
            let guard = self.entries.lock();
            guard
                .iter()
                .map(|(id, f)| (*id, Arc::clone(f)))
                .collect()
        };
        for (id, observer) in round {
            if catch_unwind(AssertUnwindSafe(|| observer(snapshot))).is_err() {
                tracing::warn!(observer = id, "snapshot observer panicked");
            }
        }
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}

impl<T> Default for SnapshotObservers<T> {
    fn default() -> Self {
        Self::new()
    }
}
