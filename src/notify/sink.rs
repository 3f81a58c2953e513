//! NotificationSink — the boundary toward whatever renders toasts, logs, or
//! ignores applied deltas. The synchronizer calls it after each applied
//! delta and for resync failures; it neither knows nor cares what the sink
//! does with the information.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use crate::error::FeedError;
use crate::types::ChangeKind;

pub trait NotificationSink<T>: Send + Sync {
    /// An applied delta. For deletes, `record` is the removed record.
    fn notify(&self, kind: ChangeKind, record: &T);

    /// A surfaced failure (resync fetch errors). Default: ignore.
    fn notify_error(&self, _error: &FeedError) {}
}

/// Invoke `notify`, swallowing sink panics — a broken sink must not break
/// the subscription.
pub(crate) fn notify_applied<T>(
    sink: &Option<Arc<dyn NotificationSink<T>>>,
    kind: ChangeKind,
    record: &T,
) {
    if let Some(sink) = sink {
        let _ = catch_unwind(AssertUnwindSafe(|| sink.notify(kind, record)));
    }
}

/// Invoke `notify_error`, swallowing sink panics.
pub(crate) fn notify_failure<T>(
    sink: &Option<Arc<dyn NotificationSink<T>>>,
    error: &FeedError,
) {
    if let Some(sink) = sink {
        let _ = catch_unwind(AssertUnwindSafe(|| sink.notify_error(error)));
    }
}
