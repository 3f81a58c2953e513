//! Change-feed boundary — the transport trait and event validation.
//!
//! # Modules
//!
//! - [`types`] — [`ChangeFeedClient`] trait, [`FeedSignal`], raw payloads,
//!   transport errors.
//! - [`event`] — [`ChangeEvent`] and parsing of duck-typed payloads into it.

pub mod event;
pub mod types;

pub use event::{parse_event, ChangeEvent};
pub use types::{
    ChangeFeedClient, FeedErrorKind, FeedListener, FeedSignal, FeedTransportError, RawFeedEvent,
    SubscriptionHandle,
};
