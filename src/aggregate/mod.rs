//! DerivedAggregator — deterministic aggregates over a store snapshot.
//!
//! Aggregates are always recomputed from the full snapshot after each
//! applied delta, never incrementally patched. Incrementing a counter in
//! place alongside occasional full recounts is how tallies drift; a pure
//! reduction over the snapshot cannot disagree with a direct recount.

use std::collections::HashMap;
use std::sync::Arc;

/// A pure reduction from a snapshot to an aggregate value.
pub struct DerivedAggregator<T, A> {
    reduce: Arc<dyn Fn(&[T]) -> A + Send + Sync>,
}

impl<T, A> DerivedAggregator<T, A> {
    pub fn new(reduce: impl Fn(&[T]) -> A + Send + Sync + 'static) -> Self {
        Self {
            reduce: Arc::new(reduce),
        }
    }

    /// Recompute the aggregate from `snapshot`.
    pub fn compute(&self, snapshot: &[T]) -> A {
        (self.reduce)(snapshot)
    }
}

impl<T, A> Clone for DerivedAggregator<T, A> {
    fn clone(&self) -> Self {
        Self {
            reduce: Arc::clone(&self.reduce),
        }
    }
}

// ---------------------------------------------------------------------------
// Stock reducers
// ---------------------------------------------------------------------------

/// Count of records matching `predicate`.
pub fn count_where<T>(
    predicate: impl Fn(&T) -> bool + Send + Sync + 'static,
) -> DerivedAggregator<T, usize> {
    DerivedAggregator::new(move |snapshot: &[T]| {
        snapshot.iter().filter(|record| predicate(record)).count()
    })
}

/// Counts bucketed by a string key (e.g. vote type, category).
pub fn count_by<T>(
    key: impl Fn(&T) -> String + Send + Sync + 'static,
) -> DerivedAggregator<T, HashMap<String, usize>> {
    DerivedAggregator::new(move |snapshot: &[T]| {
        let mut counts: HashMap<String, usize> = HashMap::new();
        for record in snapshot {
            *counts.entry(key(record)).or_default() += 1;
        }
        counts
    })
}

/// Sum of a numeric field.
pub fn sum_by<T>(
    value: impl Fn(&T) -> f64 + Send + Sync + 'static,
) -> DerivedAggregator<T, f64> {
    DerivedAggregator::new(move |snapshot: &[T]| snapshot.iter().map(&value).sum())
}

/// Mean of a numeric field; `None` for an empty snapshot rather than NaN.
pub fn average_by<T>(
    value: impl Fn(&T) -> f64 + Send + Sync + 'static,
) -> DerivedAggregator<T, Option<f64>> {
    DerivedAggregator::new(move |snapshot: &[T]| {
        if snapshot.is_empty() {
            return None;
        }
        let total: f64 = snapshot.iter().map(&value).sum();
        Some(total / snapshot.len() as f64)
    })
}
