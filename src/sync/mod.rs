pub mod manager;
pub mod resync;

pub use manager::{StatusCallback, Synchronizer, SynchronizerOptions};
pub use resync::ResyncBackoff;
