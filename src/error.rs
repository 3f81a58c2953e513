use thiserror::Error;

use crate::feed::types::FeedErrorKind;

// ---------------------------------------------------------------------------
// FeedError — top-level taxonomy
// ---------------------------------------------------------------------------

/// Errors surfaced by the synchronizer and the feed boundary.
///
/// Stale events are deliberately absent: dropping an out-of-date delta is
/// expected behavior, not a failure.
#[derive(Debug, Error)]
pub enum FeedError {
    /// Initial or resync bulk read failed. Terminal for that start attempt;
    /// the caller may retry by calling `start` again.
    #[error("Fetch failed for {scope}: {message}")]
    Fetch {
        scope: String,
        message: String,
        kind: FeedErrorKind,
    },

    /// Establishing the change-feed subscription failed.
    #[error("Subscribe failed for {scope}: {message}")]
    Subscribe { scope: String, message: String },

    /// A change event did not parse into a record. Logged and dropped by
    /// the synchronizer — never fatal to the subscription.
    #[error("Malformed change event: {0}")]
    Malformed(String),

    /// The synchronizer was stopped; the operation's result was discarded.
    #[error("Synchronizer is stopped")]
    Stopped,
}

impl FeedError {
    /// Whether retrying the same operation could succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Fetch { kind, .. } => *kind == FeedErrorKind::Transient,
            Self::Subscribe { .. } => true,
            Self::Malformed(_) | Self::Stopped => false,
        }
    }
}

/// Convenience alias — the default error type is `FeedError`.
pub type Result<T, E = FeedError> = std::result::Result<T, E>;

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
