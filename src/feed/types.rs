//! Feed-specific types: the client trait, signals delivered to listeners,
//! and the raw (unvalidated) event shape coming off the wire.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

use crate::types::SubscriptionScope;

// ============================================================================
// ChangeFeedClient — user-provided backend layer
// ============================================================================

/// User-implemented client for the backend's bulk-read and change-feed
/// capabilities. Implementations handle the actual transport (WebSocket,
/// SSE, etc.) against the hosted data store.
///
/// Delivery contract: at-least-once, ordered per row, no cross-row ordering.
/// After any transport gap the client must emit [`FeedSignal::ResyncNeeded`]
/// rather than silently resuming — the synchronizer treats a gap as
/// "resync needed", never as "nothing happened".
#[async_trait]
pub trait ChangeFeedClient: Send + Sync {
    /// Bulk read of all current rows matching the scope. Used for the
    /// initial load and for every resync.
    async fn fetch(&self, scope: &SubscriptionScope)
        -> Result<Vec<Value>, FeedTransportError>;

    /// Open a change-feed subscription for the scope. The listener is
    /// invoked for every signal until [`unsubscribe`](Self::unsubscribe)
    /// is called with the returned handle.
    fn subscribe(
        &self,
        scope: &SubscriptionScope,
        listener: FeedListener,
    ) -> Result<SubscriptionHandle, FeedTransportError>;

    /// Tear down the subscription identified by `handle`. Unknown handles
    /// are ignored.
    fn unsubscribe(&self, handle: SubscriptionHandle);
}

/// Listener closure receiving feed signals.
pub type FeedListener = Arc<dyn Fn(FeedSignal) + Send + Sync>;

/// Opaque identifier for an active subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionHandle(pub u64);

// ============================================================================
// Signals
// ============================================================================

/// What a change-feed client can deliver to its listener.
#[derive(Debug, Clone)]
pub enum FeedSignal {
    /// A row-level change event (still unvalidated).
    Event(RawFeedEvent),
    /// The transport lost its connection. Data stays last-known-good; the
    /// synchronizer surfaces a non-blocking indicator.
    Disconnected,
    /// The transport reconnected after a possible gap. A full resync is
    /// mandatory.
    ResyncNeeded,
}

/// A change event as it comes off the wire, before validation.
///
/// `action` is the backend's tag string (`INSERT` / `UPDATE` / `DELETE`,
/// case-insensitive). `sequence` is the backend's marker for the change;
/// for deletes it is the authoritative ordering marker since the deleted
/// row carries no version of its own.
#[derive(Debug, Clone, Deserialize)]
pub struct RawFeedEvent {
    pub action: String,
    #[serde(default)]
    pub old: Option<Value>,
    #[serde(default)]
    pub new: Option<Value>,
    pub sequence: i64,
}

// ============================================================================
// Transport errors
// ============================================================================

/// Transport-level error: whatever message the client's backend produced,
/// tagged with a retriability classification.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct FeedTransportError {
    pub message: String,
    pub kind: FeedErrorKind,
}

impl FeedTransportError {
    fn tagged(kind: FeedErrorKind, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            kind,
        }
    }

    /// A retriable failure (network trouble, backend briefly unavailable).
    pub fn transient(message: impl Into<String>) -> Self {
        Self::tagged(FeedErrorKind::Transient, message)
    }

    /// A failure retrying cannot cure (bad scope, missing table).
    pub fn permanent(message: impl Into<String>) -> Self {
        Self::tagged(FeedErrorKind::Permanent, message)
    }

    /// The backend rejected the caller's credentials or permissions.
    pub fn auth(message: impl Into<String>) -> Self {
        Self::tagged(FeedErrorKind::Auth, message)
    }
}

/// Classification of transport failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedErrorKind {
    /// Retriable (network, temporary backend failures).
    Transient,
    /// Not retriable (bad scope, missing table).
    Permanent,
    /// Authentication or authorization failed.
    Auth,
}
