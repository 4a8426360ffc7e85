//! Application constants
//!
//! Centralized location for all domain-level constants used throughout the
//! application.

// Entity limits
/// Longest accepted reminder or task id
pub const MAX_ID_LENGTH: usize = 64;
/// Longest accepted reminder title
pub const MAX_TITLE_LENGTH: usize = 200;
/// Longest accepted task text
pub const MAX_TASK_TEXT_LENGTH: usize = 500;
/// Most tasks one reminder may own
pub const MAX_TASKS_PER_REMINDER: usize = 100;
/// Earliest accepted due-date year
pub const MIN_DUE_YEAR: i32 = 1970;
/// Latest accepted due-date year
pub const MAX_DUE_YEAR: i32 = 2100;

// Fallback store keys (namespaced in the key-value store)
/// Serialized operation queue
pub const FALLBACK_QUEUE_KEY: &str = "tether:queue";
/// Serialized fallback mode flag
pub const FALLBACK_MODE_KEY: &str = "tether:mode";
/// Serialized entity cache
pub const FALLBACK_CACHE_KEY: &str = "tether:cache";
/// Start time of the last successful pull
pub const FALLBACK_LAST_SYNC_KEY: &str = "tether:last_sync";

// Sync defaults
/// Operations claimed per drain
pub const DEFAULT_SYNC_BATCH_SIZE: usize = 200;
/// Failed attempts before the user is told an operation is stuck
pub const DEFAULT_DIAGNOSTIC_RETRY_THRESHOLD: u32 = 5;

// Fallback reasons
/// A health probe failed
pub const REASON_CONNECTION_LOST: &str = "connection_lost";
/// The OS reported the network as down
pub const REASON_NETWORK_OFFLINE: &str = "network_offline";
/// A remote write failed with a transport error
pub const REASON_REMOTE_WRITE_FAILED: &str = "remote_write_failed";
