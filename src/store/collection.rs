//! CollectionStore<T> — the in-memory ordered collection a synchronizer
//! owns.
//!
//! All operations are synchronous and touch nothing but the store's own
//! state — no I/O, no callbacks — which keeps them trivially testable. The
//! apply operations are deliberately forgiving so the store self-heals
//! around an at-least-once feed:
//!   - insert of an existing id behaves as an update (idempotent),
//!   - update of an unknown id behaves as an insert (missed-insert repair),
//!   - delete of an unknown id is a no-op.
//!
//! Insertion order is preserved for `snapshot()` because consumers display
//! it; it carries no correctness weight.

use std::collections::HashMap;

use crate::types::Entity;

pub struct CollectionStore<T> {
    records: HashMap<String, T>,
    /// Display order; every entry has a record in `records` and vice versa.
    order: Vec<String>,
}

impl<T: Entity> CollectionStore<T> {
    pub fn new() -> Self {
        Self {
            records: HashMap::new(),
            order: Vec::new(),
        }
    }

    /// Insert `record`, or replace the existing record with the same id
    /// (keeping its order position).
    pub fn apply_insert(&mut self, record: T) {
        let id = record.id().to_string();
        if self.records.insert(id.clone(), record).is_none() {
            self.order.push(id);
        }
    }

    /// Apply an update. Unknown ids are treated as inserts.
    pub fn apply_upsert(&mut self, record: T) {
        self.apply_insert(record);
    }

    /// Remove the record with `id`, returning it. Unknown ids are a no-op.
    pub fn apply_delete(&mut self, id: &str) -> Option<T> {
        let removed = self.records.remove(id)?;
        self.order.retain(|existing| existing != id);
        Some(removed)
    }

    /// All records in insertion order.
    pub fn snapshot(&self) -> Vec<T> {
        self.order
            .iter()
            .filter_map(|id| self.records.get(id).cloned())
            .collect()
    }

    /// The cached sequence for `id`, if present.
    pub fn last_sequence(&self, id: &str) -> Option<i64> {
        self.records.get(id).map(|record| record.sequence())
    }

    pub fn get(&self, id: &str) -> Option<&T> {
        self.records.get(id)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Replace the entire contents with `records` — used by resync so the
    /// store converges to exactly the fetched set. Later duplicates of an
    /// id win within the batch.
    pub fn replace_all(&mut self, records: Vec<T>) {
        self.records.clear();
        self.order.clear();
        for record in records {
            self.apply_insert(record);
        }
    }

    pub fn clear(&mut self) {
        self.records.clear();
        self.order.clear();
    }
}

impl<T: Entity> Default for CollectionStore<T> {
    fn default() -> Self {
        Self::new()
    }
}
