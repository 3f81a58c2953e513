//! Notification layer — the sink boundary toward presentation code and the
//! snapshot observer registry backing `observe`.

pub mod observers;
pub mod sink;

pub use observers::{ObserverId, SnapshotObservers};
pub use sink::NotificationSink;
