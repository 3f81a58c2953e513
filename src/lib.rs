pub mod error;
pub mod types;

pub mod aggregate;
pub mod feed;
pub mod notify;
pub mod store;
pub mod sync;
