//! Synchronization support shared by the offline queue
//!
//! - **`retry`**: exponential backoff scheduling for queued operations

pub mod retry;

pub use retry::BackoffPolicy;
