//! Tests for `CollectionStore<T>` apply semantics.

use feedsync::store::CollectionStore;
use feedsync::types::Entity;

#[derive(Debug, Clone, PartialEq)]
struct Item {
    id: String,
    seq: i64,
    label: String,
}

impl Entity for Item {
    fn id(&self) -> &str {
        &self.id
    }

    fn sequence(&self) -> i64 {
        self.seq
    }
}

fn item(id: &str, seq: i64, label: &str) -> Item {
    Item {
        id: id.to_string(),
        seq,
        label: label.to_string(),
    }
}

// ============================================================================
// Insert
// ============================================================================

#[test]
fn insert_then_snapshot() {
    let mut store = CollectionStore::new();
    store.apply_insert(item("a", 1, "first"));
    store.apply_insert(item("b", 2, "second"));

    let snapshot = store.snapshot();
    assert_eq!(snapshot.len(), 2);
    assert_eq!(snapshot[0].id, "a");
    assert_eq!(snapshot[1].id, "b");
}

#[test]
fn insert_is_idempotent_on_duplicate_id() {
    let mut store = CollectionStore::new();
    store.apply_insert(item("a", 1, "first"));
    let once = store.snapshot();

    store.apply_insert(item("a", 1, "first"));
    assert_eq!(store.snapshot(), once);
}

#[test]
fn duplicate_insert_replaces_in_place() {
    let mut store = CollectionStore::new();
    store.apply_insert(item("a", 1, "old"));
    store.apply_insert(item("b", 1, "other"));
    store.apply_insert(item("a", 2, "new"));

    let snapshot = store.snapshot();
    assert_eq!(snapshot.len(), 2);
    // Order position retained.
    assert_eq!(snapshot[0].id, "a");
    assert_eq!(snapshot[0].label, "new");
}

// ============================================================================
// Upsert
// ============================================================================

#[test]
fn upsert_of_unknown_id_inserts() {
    let mut store = CollectionStore::new();
    store.apply_upsert(item("ghost", 3, "appeared"));

    assert_eq!(store.len(), 1);
    assert_eq!(store.get("ghost").unwrap().label, "appeared");
}

#[test]
fn upsert_replaces_existing() {
    let mut store = CollectionStore::new();
    store.apply_insert(item("a", 1, "v1"));
    store.apply_upsert(item("a", 2, "v2"));

    assert_eq!(store.len(), 1);
    assert_eq!(store.get("a").unwrap().label, "v2");
    assert_eq!(store.last_sequence("a"), Some(2));
}

// ============================================================================
// Delete
// ============================================================================

#[test]
fn delete_removes_record() {
    let mut store = CollectionStore::new();
    store.apply_insert(item("a", 1, "x"));
    store.apply_insert(item("b", 2, "y"));

    let removed = store.apply_delete("a");
    assert_eq!(removed.unwrap().id, "a");

    let snapshot = store.snapshot();
    assert_eq!(snapshot.len(), 1);
    assert_eq!(snapshot[0].id, "b");
}

#[test]
fn delete_of_unknown_id_is_noop() {
    let mut store = CollectionStore::new();
    store.apply_insert(item("a", 1, "x"));
    let before = store.snapshot();

    assert!(store.apply_delete("missing").is_none());
    assert_eq!(store.snapshot(), before);
}

// ============================================================================
// replace_all / misc
// ============================================================================

#[test]
fn replace_all_converges_to_given_set() {
    let mut store = CollectionStore::new();
    store.apply_insert(item("a", 1, "stale"));
    store.apply_insert(item("b", 2, "gone"));

    store.replace_all(vec![item("b", 5, "fresh"), item("c", 6, "new")]);

    let snapshot = store.snapshot();
    assert_eq!(snapshot.len(), 2);
    assert!(store.get("a").is_none());
    assert_eq!(store.get("b").unwrap().label, "fresh");
    assert_eq!(store.get("c").unwrap().seq, 6);
}

#[test]
fn last_sequence_tracks_stored_record() {
    let mut store = CollectionStore::new();
    assert_eq!(store.last_sequence("a"), None);

    store.apply_insert(item("a", 7, "x"));
    assert_eq!(store.last_sequence("a"), Some(7));

    store.apply_delete("a");
    assert_eq!(store.last_sequence("a"), None);
}

#[test]
fn empty_store() {
    let store: CollectionStore<Item> = CollectionStore::new();
    assert!(store.is_empty());
    assert_eq!(store.len(), 0);
    assert!(store.snapshot().is_empty());
}
