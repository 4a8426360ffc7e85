//! Version conflict records and resolution strategies

use serde::{Deserialize, Serialize};

use super::reminder::Reminder;
use crate::impl_domain_status_conversions;

/// A reminder whose cached and remote copies disagree on `version`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConflictRecord {
    /// Reminder in conflict
    pub entity_id: String,
    /// Version of the cached copy
    pub local_version: Option<u64>,
    /// Version of the remote copy
    pub remote_version: Option<u64>,
    /// Cached copy
    pub local_snapshot: Reminder,
    /// Remote copy
    pub remote_snapshot: Reminder,
}

/// Caller-selected resolution for a [`ConflictRecord`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConflictStrategy {
    Local,
    Remote,
    Merge,
}

impl_domain_status_conversions!(ConflictStrategy {
    Local => "local",
    Remote => "remote",
    Merge => "merge",
});
