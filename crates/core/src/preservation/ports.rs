//! Port interfaces for the data preservation layer

use std::path::Path;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tether_domain::{
    BackupOutcome, BackupVerification, NotificationSeverity, OrphanTask, Reminder, RemoteStatus,
    Result, VersionedWrite,
};

/// Authoritative remote store for reminders
#[async_trait]
pub trait RemoteRepository: Send + Sync {
    /// Create a reminder; the stored copy carries version 1
    async fn create(&self, reminder: &Reminder) -> Result<Reminder>;

    /// Write only if the stored version equals `expected_version`
    async fn update_versioned(
        &self,
        reminder: &Reminder,
        expected_version: u64,
    ) -> Result<VersionedWrite>;

    /// Unconditional write; `None` when the reminder does not exist
    async fn update(&self, reminder: &Reminder) -> Result<Option<Reminder>>;

    /// Delete a reminder; `false` when it did not exist
    async fn delete(&self, id: &str) -> Result<bool>;

    /// Fetch every reminder
    async fn get_all(&self) -> Result<Vec<Reminder>>;

    /// Fetch a single reminder
    async fn get(&self, id: &str) -> Result<Option<Reminder>>;

    /// Fetch reminders modified at or after `since`
    async fn query_updated_since(&self, since: DateTime<Utc>) -> Result<Vec<Reminder>>;

    /// Task rows whose parent reminder no longer exists
    async fn find_orphan_tasks(&self) -> Result<Vec<OrphanTask>> {
        Ok(Vec::new())
    }
}

/// Reachability probe for the remote store
#[async_trait]
pub trait HealthProbe: Send + Sync {
    /// Succeeds when the remote answered its health endpoint
    async fn health_check(&self) -> Result<()>;

    /// Reachability as a status value
    async fn remote_status(&self) -> RemoteStatus {
        RemoteStatus { connected: self.health_check().await.is_ok() }
    }
}

/// Durable string key-value storage for fallback state
///
/// Calls are synchronous so that queue mutations are persisted before the
/// fallback store releases its lock.
pub trait KeyValueStore: Send + Sync {
    /// Read a value
    fn get(&self, key: &str) -> Result<Option<String>>;

    /// Write a value, replacing any previous one
    fn set(&self, key: &str, value: &str) -> Result<()>;

    /// Remove a value; missing keys are not an error
    fn remove(&self, key: &str) -> Result<()>;
}

/// Backup and restore of local state
#[async_trait]
pub trait BackupExecutor: Send + Sync {
    /// Write a new backup and report where it went
    async fn create_backup(&self) -> Result<BackupOutcome>;

    /// Check that a backup file is readable and consistent
    async fn verify_backup(&self, path: &Path) -> Result<BackupVerification>;

    /// Replace local state with the contents of a backup
    async fn restore_backup(&self, path: &Path) -> Result<()>;
}

/// Receiver for user-facing notifications; delivery is fire-and-forget
pub trait NotificationObserver: Send + Sync {
    fn notify(&self, severity: NotificationSeverity, message: &str);
}
