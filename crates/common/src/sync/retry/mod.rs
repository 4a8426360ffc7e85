// Retry scheduling for queued operations: capped exponential backoff

pub mod backoff;
pub mod constants;

pub use backoff::BackoffPolicy;
