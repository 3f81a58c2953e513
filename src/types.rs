//! Shared plain types used across the crate.

use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// Entity
// ---------------------------------------------------------------------------

/// A record that can live in a [`CollectionStore`](crate::store::CollectionStore).
///
/// `sequence` is the backend's version marker for the row (a monotonic
/// counter or commit timestamp encoded as `i64`). The synchronizer compares
/// it against the cached value to drop stale or duplicate deltas.
pub trait Entity: Clone + Send + Sync + 'static {
    fn id(&self) -> &str;
    fn sequence(&self) -> i64;
}

// ---------------------------------------------------------------------------
// SubscriptionScope
// ---------------------------------------------------------------------------

/// What a synchronizer watches: a table plus an optional row filter in the
/// backend's filter syntax (e.g. `vendor_id=eq.v1`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SubscriptionScope {
    pub table: String,
    pub filter: Option<String>,
}

impl SubscriptionScope {
    pub fn table(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            filter: None,
        }
    }

    pub fn filtered(table: impl Into<String>, filter: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            filter: Some(filter.into()),
        }
    }
}

impl fmt::Display for SubscriptionScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.filter {
            Some(filter) => write!(f, "{}[{}]", self.table, filter),
            None => write!(f, "{}", self.table),
        }
    }
}

// ---------------------------------------------------------------------------
// ChangeKind / SyncStatus
// ---------------------------------------------------------------------------

/// What an applied delta did, as reported to notification sinks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    Inserted,
    Updated,
    Deleted,
}

/// Connection/health state reported through the status callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncStatus {
    /// Initial fetch done, subscription active, store current.
    Live,
    /// Transport reported a disconnect; data is last-known-good.
    Disconnected,
    /// A resync fetch is in flight after a feed gap.
    Resyncing,
    /// A resync attempt failed; retrying on backoff with stale data served.
    Degraded,
}
