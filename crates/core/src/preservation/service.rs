//! Data preservation layer - the single entry point for reminder mutations
//!
//! Routes every call to the remote store while it is usable, and to the
//! offline queue plus local cache otherwise. Transport failures are absorbed:
//! the layer enters fallback mode, queues the mutation and reports a
//! `Degraded` outcome. Any other remote error (validation, a rejected
//! duplicate, a deleted reminder) reaches the caller, as does a missing
//! backup executor.

use std::path::Path;
use std::sync::Arc;

use tether_common::Clock;
use tether_domain::constants::{REASON_CONNECTION_LOST, REASON_REMOTE_WRITE_FAILED};
use tether_domain::{
    BackupOutcome, BackupVerification, ConflictRecord, ConflictStrategy, IntegrityReport,
    MutationOutcome, MutationResult, NotificationSeverity, PreservationStatus, QueuedOperation,
    QueuedPayload, Reminder, ReminderInput, Result, SyncOutcome, TetherError,
};
use tracing::{debug, info, instrument, warn};

use super::connection_monitor::ConnectionMonitor;
use super::fallback_store::FallbackStore;
use super::integrity::IntegrityValidator;
use super::ports::{BackupExecutor, NotificationObserver, RemoteRepository};
use super::sync_engine::{SyncEngine, VersionedWriteOutcome};

const REASON_VERSION_CONFLICT: &str = "version_conflict";

/// Orchestrates remote-first writes with offline fallback
pub struct DataPreservationLayer {
    remote: Arc<dyn RemoteRepository>,
    fallback: Arc<FallbackStore>,
    monitor: Arc<ConnectionMonitor>,
    sync: Arc<SyncEngine>,
    validator: IntegrityValidator,
    notifier: Arc<dyn NotificationObserver>,
    clock: Arc<dyn Clock>,
    backup: Option<Arc<dyn BackupExecutor>>,
}

impl DataPreservationLayer {
    /// Wire the layer to its collaborators; backups stay disabled until
    /// [`DataPreservationLayer::with_backup_executor`] is called.
    pub fn new(
        remote: Arc<dyn RemoteRepository>,
        fallback: Arc<FallbackStore>,
        monitor: Arc<ConnectionMonitor>,
        sync: Arc<SyncEngine>,
        notifier: Arc<dyn NotificationObserver>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self> {
        let validator = IntegrityValidator::new(Arc::clone(&remote), Arc::clone(&clock))?;
        Ok(Self { remote, fallback, monitor, sync, validator, notifier, clock, backup: None })
    }

    /// Attach the executor used by the backup passthroughs
    #[must_use]
    pub fn with_backup_executor(mut self, executor: Arc<dyn BackupExecutor>) -> Self {
        self.backup = Some(executor);
        self
    }

    /// Remote is usable when connected and not in fallback mode
    pub fn can_use_remote(&self) -> bool {
        self.monitor.is_connected() && !self.fallback.is_fallback_mode()
    }

    /// Validator applied before every write
    pub const fn validator(&self) -> &IntegrityValidator {
        &self.validator
    }

    /// Create a reminder remotely, or cache and queue it while offline
    #[instrument(skip(self, input), fields(title = %input.title))]
    pub async fn create_entity(&self, input: ReminderInput) -> Result<MutationResult<Reminder>> {
        let reminder = Reminder::from_input(input, self.clock.utc_now());
        self.ensure_valid(&reminder)?;

        let mut outcome = MutationOutcome::Queued;
        if self.can_use_remote() {
            self.log_reference_issues(&reminder).await;
            match self.remote.create(&reminder).await {
                Ok(created) => {
                    self.fallback.update_stored_entity(created.clone());
                    return Ok(self.finish(created, MutationOutcome::Committed));
                }
                Err(err) => {
                    self.absorb(err, &reminder.id)?;
                    outcome = MutationOutcome::Degraded;
                }
            }
        }

        self.queue(outcome, QueuedPayload::CreateReminder { reminder: reminder.clone() });
        self.fallback.update_stored_entity(reminder.clone());
        Ok(self.finish(reminder, outcome))
    }

    /// Versioned update remotely, or cache and queue it while offline
    #[instrument(skip(self, entity), fields(entity_id = %entity.id))]
    pub async fn update_entity(
        &self,
        entity: Reminder,
        expected_version: Option<u64>,
    ) -> Result<MutationResult<Reminder>> {
        let entity = Reminder { updated_at: self.clock.utc_now(), ..entity };
        self.ensure_valid(&entity)?;

        let mut outcome = MutationOutcome::Queued;
        if self.can_use_remote() {
            self.log_reference_issues(&entity).await;
            match self.write_remote(&entity, expected_version).await {
                Ok(written) => {
                    self.fallback.update_stored_entity(written.clone());
                    return Ok(self.finish(written, MutationOutcome::Committed));
                }
                Err(TetherError::NotFound(message)) => {
                    self.fallback.remove_stored_entity(&entity.id);
                    return Err(TetherError::NotFound(message));
                }
                Err(err @ TetherError::VersionConflict { .. }) => {
                    warn!(error = %err, "conflict unresolved after retry; queueing for backoff");
                    self.fallback.queue_with_fallback(
                        REASON_VERSION_CONFLICT,
                        QueuedPayload::UpdateReminder {
                            reminder: entity.clone(),
                            expected_version,
                        },
                    );
                    self.fallback.update_stored_entity(entity.clone());
                    return Ok(self.finish(entity, MutationOutcome::Degraded));
                }
                Err(err) => {
                    self.absorb(err, &entity.id)?;
                    outcome = MutationOutcome::Degraded;
                }
            }
        }

        let payload = QueuedPayload::UpdateReminder { reminder: entity.clone(), expected_version };
        self.queue(outcome, payload);
        self.fallback.update_stored_entity(entity.clone());
        Ok(self.finish(entity, outcome))
    }

    /// Delete a reminder. The value reports whether it existed.
    #[instrument(skip(self))]
    pub async fn delete_entity(&self, id: &str) -> Result<MutationResult<bool>> {
        if id.trim().is_empty() {
            return Err(tether_common::ValidationError::field("id", "Value cannot be empty").into());
        }

        let mut outcome = MutationOutcome::Queued;
        if self.can_use_remote() {
            match self.remote.delete(id).await {
                Ok(existed) => {
                    self.fallback.remove_stored_entity(id);
                    self.notify_outcome(MutationOutcome::Committed);
                    return Ok(MutationResult::committed(existed));
                }
                Err(err) => {
                    self.absorb(err, id)?;
                    outcome = MutationOutcome::Degraded;
                }
            }
        }

        self.queue(outcome, QueuedPayload::DeleteReminder { id: id.to_string() });
        let existed = self.fallback.remove_stored_entity(id).is_some();
        self.notify_outcome(outcome);
        Ok(MutationResult::new(existed, outcome))
    }

    /// Read-through fetch; serves the cache when the remote is unusable
    #[instrument(skip(self))]
    pub async fn get_entity(&self, id: &str) -> Result<Option<Reminder>> {
        if self.can_use_remote() {
            match self.remote.get(id).await {
                Ok(Some(reminder)) => {
                    self.fallback.refresh_stored_entities(vec![reminder.clone()]);
                    return Ok(Some(reminder));
                }
                Ok(None) => {
                    if !self.fallback.has_queued_operations(id) {
                        self.fallback.remove_stored_entity(id);
                    }
                    return Ok(None);
                }
                Err(err) => warn!(error = %err, "remote read failed; serving cached copy"),
            }
        }
        Ok(self.fallback.get_stored_entity(id))
    }

    /// Read-through listing; serves the cache when the remote is unusable
    #[instrument(skip(self))]
    pub async fn get_all_entities(&self) -> Result<Vec<Reminder>> {
        if self.can_use_remote() {
            match self.remote.get_all().await {
                Ok(all) => {
                    self.fallback.replace_stored_entities(all.clone());
                    return Ok(all);
                }
                Err(err) => warn!(error = %err, "remote listing failed; serving cached copies"),
            }
        }
        Ok(self.fallback.stored_entities())
    }

    /// Probe the connection and run a drain
    pub async fn trigger_sync(&self) -> SyncOutcome {
        self.monitor.check_connection().await;
        self.sync.sync().await
    }

    /// Dataset integrity scan, against the remote when usable
    pub async fn validate_integrity(&self) -> Result<IntegrityReport> {
        if self.can_use_remote() {
            match self.validator.validate_referential_integrity().await {
                Ok(report) => return Ok(report),
                Err(err) if err.is_transport() => {
                    warn!(error = %err, "remote integrity scan failed; scanning cache");
                }
                Err(err) => return Err(err),
            }
        }
        Ok(self.validator.scan(&self.fallback.stored_entities(), &[]))
    }

    /// Cached reminders whose version differs from the remote copy
    pub async fn detect_conflicts(&self) -> Result<Vec<ConflictRecord>> {
        self.sync.detect_conflicts().await
    }

    /// Apply the chosen strategy to one detected conflict
    pub async fn resolve_conflict(
        &self,
        record: &ConflictRecord,
        strategy: ConflictStrategy,
    ) -> Result<Reminder> {
        self.sync.apply_resolution(record, strategy).await
    }

    /// Write a backup through the configured executor
    pub async fn create_backup(&self) -> Result<BackupOutcome> {
        let outcome = self.backup_executor()?.create_backup().await?;
        if outcome.success {
            info!(path = ?outcome.path, "backup created");
        } else {
            warn!(error = ?outcome.error, "backup failed");
            self.notifier.notify(NotificationSeverity::Error, "Backup failed.");
        }
        Ok(outcome)
    }

    /// Check a backup file without restoring it
    pub async fn verify_backup(&self, path: &Path) -> Result<BackupVerification> {
        self.backup_executor()?.verify_backup(path).await
    }

    /// Restore a verified backup, reload local state and scan it
    #[instrument(skip(self))]
    pub async fn restore_backup(&self, path: &Path) -> Result<IntegrityReport> {
        let executor = self.backup_executor()?;
        let verification = executor.verify_backup(path).await?;
        if !verification.valid {
            return Err(TetherError::Integrity(format!(
                "backup {} failed verification: {}",
                path.display(),
                verification.error.unwrap_or_else(|| "unknown error".to_string())
            )));
        }
        executor.restore_backup(path).await?;
        self.fallback.reload();
        let report = self.validate_integrity().await?;
        if !report.is_clean() {
            warn!(issues = report.issues.len(), "restored data has integrity issues");
        }
        self.notifier.notify(NotificationSeverity::Success, "Backup restored.");
        Ok(report)
    }

    /// Connection, fallback and queue snapshot
    pub fn status(&self) -> PreservationStatus {
        PreservationStatus {
            connection: self.monitor.status(),
            fallback: self.fallback.status(),
            can_use_remote: self.can_use_remote(),
        }
    }

    /// Ordered snapshot of the offline queue
    pub fn operation_queue(&self) -> Vec<QueuedOperation> {
        self.fallback.operation_queue()
    }

    async fn write_remote(
        &self,
        entity: &Reminder,
        expected_version: Option<u64>,
    ) -> Result<Reminder> {
        let missing = || TetherError::NotFound(format!("reminder {} no longer exists", entity.id));
        match expected_version {
            Some(expected) => match self.sync.write_versioned(entity, expected).await? {
                VersionedWriteOutcome::Written { reminder, .. } => Ok(reminder),
                VersionedWriteOutcome::Missing => Err(missing()),
            },
            None => self.remote.update(entity).await?.ok_or_else(missing),
        }
    }

    fn ensure_valid(&self, reminder: &Reminder) -> Result<()> {
        let warnings = self.validator.validate_entity(reminder).into_result()?;
        for warning in warnings {
            debug!(
                entity_id = %reminder.id,
                field = %warning.field,
                message = %warning.message,
                "validation warning"
            );
        }
        Ok(())
    }

    async fn log_reference_issues(&self, reminder: &Reminder) {
        if let Err(err) = self.validator.check_references(reminder).await {
            warn!(entity_id = %reminder.id, error = %err, "reference check failed");
        }
    }

    /// Only transport failures become a fallback transition; any other remote
    /// error reaches the caller and nothing is queued.
    fn absorb(&self, err: TetherError, entity_id: &str) -> Result<()> {
        if !err.is_transport() {
            warn!(entity_id, error = %err, "remote rejected the write");
            return Err(err);
        }
        warn!(entity_id, error = %err, "remote write failed; falling back to local queue");
        self.fallback.enable_fallback_mode(REASON_REMOTE_WRITE_FAILED);
        Ok(())
    }

    fn queue(&self, outcome: MutationOutcome, payload: QueuedPayload) -> QueuedOperation {
        let reason = match outcome {
            MutationOutcome::Degraded => REASON_REMOTE_WRITE_FAILED,
            MutationOutcome::Queued | MutationOutcome::Committed => REASON_CONNECTION_LOST,
        };
        self.fallback.queue_with_fallback(reason, payload)
    }

    fn finish(&self, reminder: Reminder, outcome: MutationOutcome) -> MutationResult<Reminder> {
        self.notify_outcome(outcome);
        MutationResult::new(reminder, outcome)
    }

    fn notify_outcome(&self, outcome: MutationOutcome) {
        let (severity, message) = match outcome {
            MutationOutcome::Committed => (NotificationSeverity::Success, "Saved."),
            MutationOutcome::Queued => (
                NotificationSeverity::Info,
                "Saved offline. Will sync when the connection returns.",
            ),
            MutationOutcome::Degraded => (
                NotificationSeverity::Warning,
                "Could not reach the server. Saved locally and will retry.",
            ),
        };
        self.notifier.notify(severity, message);
    }

    fn backup_executor(&self) -> Result<&Arc<dyn BackupExecutor>> {
        self.backup
            .as_ref()
            .ok_or_else(|| TetherError::Config("no backup executor configured".to_string()))
    }
}
