//! Values exchanged with the remote store and the backup executor

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Result of an optimistic versioned write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionedWrite {
    /// False when the stored version did not match
    pub updated: bool,
    /// Version assigned by the write
    pub new_version: Option<u64>,
}

impl VersionedWrite {
    /// Write accepted at `new_version`
    pub const fn applied(new_version: u64) -> Self {
        Self { updated: true, new_version: Some(new_version) }
    }

    /// Write rejected on a version mismatch
    pub const fn stale() -> Self {
        Self { updated: false, new_version: None }
    }
}

/// Remote reachability as reported by the health endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteStatus {
    /// Health endpoint answered successfully
    pub connected: bool,
}

/// A task row the remote store holds without a parent reminder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrphanTask {
    /// Orphaned task row
    pub task_id: String,
    /// Missing parent reminder
    pub reminder_id: String,
}

/// Result of creating a backup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackupOutcome {
    /// Whether the backup was written
    pub success: bool,
    /// Backup file, when written
    pub path: Option<PathBuf>,
    /// Why the backup failed
    pub error: Option<String>,
}

impl BackupOutcome {
    /// Outcome for a backup written to `path`
    pub const fn created(path: PathBuf) -> Self {
        Self { success: true, path: Some(path), error: None }
    }

    /// Outcome for a backup that could not be written
    pub fn failed(error: impl Into<String>) -> Self {
        Self { success: false, path: None, error: Some(error.into()) }
    }
}

/// Result of verifying a backup file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackupVerification {
    /// File opened and passed the integrity check
    pub valid: bool,
    /// Why verification failed
    pub error: Option<String>,
}
