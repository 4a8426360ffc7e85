//! Queue drain, conflict resolution and remote pull

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tether_common::Clock;
use tether_domain::constants::DEFAULT_SYNC_BATCH_SIZE;
use tether_domain::{
    ConflictRecord, ConflictStrategy, NotificationSeverity, QueuedOperation, QueuedPayload,
    Reminder, Result, SyncConfig, SyncOutcome, SyncReport, SyncSkipReason, TetherError,
};
use tracing::{debug, info, instrument, warn};

use super::conflict;
use super::connection_monitor::ConnectionMonitor;
use super::fallback_store::FallbackStore;
use super::ports::{NotificationObserver, RemoteRepository};

/// Sync engine tuning
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncEngineConfig {
    /// Maximum operations claimed per drain
    pub batch_size: usize,
}

impl Default for SyncEngineConfig {
    fn default() -> Self {
        Self { batch_size: DEFAULT_SYNC_BATCH_SIZE }
    }
}

impl From<&SyncConfig> for SyncEngineConfig {
    fn from(config: &SyncConfig) -> Self {
        Self { batch_size: config.batch_size.max(1) }
    }
}

/// Result of a versioned write that may have gone through one merge
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VersionedWriteOutcome {
    Written { reminder: Reminder, resolved_conflict: bool },
    /// The remote no longer holds the reminder
    Missing,
}

enum Replay {
    Applied { resolved_conflict: bool },
    Dropped,
}

struct InFlightGuard<'a>(&'a AtomicBool);

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Claimed operations not yet settled when a drain is dropped mid-batch.
///
/// On drop the operation being replayed is recorded as a failed attempt and
/// the rest go back to pending, so nothing stays `processing`.
struct ClaimGuard<'a> {
    fallback: &'a FallbackStore,
    outstanding: Vec<String>,
    in_flight: Option<String>,
}

impl<'a> ClaimGuard<'a> {
    fn new(fallback: &'a FallbackStore, claimed: &[QueuedOperation]) -> Self {
        let outstanding = claimed.iter().map(|op| op.id.clone()).collect();
        Self { fallback, outstanding, in_flight: None }
    }

    fn settle(&mut self, id: &str) {
        self.outstanding.retain(|outstanding| outstanding != id);
        if self.in_flight.as_deref() == Some(id) {
            self.in_flight = None;
        }
    }

    fn disarm(&mut self) {
        self.outstanding.clear();
        self.in_flight = None;
    }
}

impl Drop for ClaimGuard<'_> {
    fn drop(&mut self) {
        if let Some(id) = self.in_flight.take() {
            warn!(operation_id = %id, "drain interrupted during replay");
            self.fallback.mark_operation_failed(&id, "sync interrupted before the remote answered");
            self.outstanding.retain(|outstanding| outstanding != &id);
        }
        if !self.outstanding.is_empty() {
            debug!(released = self.outstanding.len(), "returning unreplayed claims to pending");
            self.fallback.release_operations(&self.outstanding);
        }
    }
}

/// Drains the offline queue against the remote store.
///
/// At most one drain runs at a time; a concurrent call returns
/// [`SyncOutcome::AlreadyInProgress`] instead of waiting.
pub struct SyncEngine {
    remote: Arc<dyn RemoteRepository>,
    fallback: Arc<FallbackStore>,
    monitor: Arc<ConnectionMonitor>,
    notifier: Arc<dyn NotificationObserver>,
    clock: Arc<dyn Clock>,
    config: SyncEngineConfig,
    in_flight: AtomicBool,
}

impl SyncEngine {
    /// Build an idle engine; nothing is drained until [`SyncEngine::sync`] is called.
    pub fn new(
        remote: Arc<dyn RemoteRepository>,
        fallback: Arc<FallbackStore>,
        monitor: Arc<ConnectionMonitor>,
        notifier: Arc<dyn NotificationObserver>,
        clock: Arc<dyn Clock>,
        config: SyncEngineConfig,
    ) -> Self {
        Self {
            remote,
            fallback,
            monitor,
            notifier,
            clock,
            config,
            in_flight: AtomicBool::new(false),
        }
    }

    /// Whether a drain currently holds the single-flight flag
    pub fn is_syncing(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Drain the queue, pull remote changes and leave fallback mode when done.
    #[instrument(skip(self))]
    pub async fn sync(&self) -> SyncOutcome {
        let claimed =
            self.in_flight.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire);
        if claimed.is_err() {
            debug!("sync already in progress");
            return SyncOutcome::AlreadyInProgress;
        }
        let _guard = InFlightGuard(&self.in_flight);

        if !self.monitor.is_connected() {
            return SyncOutcome::Skipped { reason: SyncSkipReason::Disconnected };
        }
        if !self.fallback.is_fallback_mode() {
            return SyncOutcome::Skipped { reason: SyncSkipReason::NotInFallback };
        }

        let report = self.drain().await;
        SyncOutcome::Completed { report }
    }

    /// Versioned write with a single fetch-merge-retry on a stale version
    pub async fn write_versioned(
        &self,
        reminder: &Reminder,
        expected_version: u64,
    ) -> Result<VersionedWriteOutcome> {
        let first = self.remote.update_versioned(reminder, expected_version).await?;
        if first.updated {
            let written = Reminder {
                version: Some(first.new_version.unwrap_or(expected_version + 1)),
                ..reminder.clone()
            };
            return Ok(VersionedWriteOutcome::Written {
                reminder: written,
                resolved_conflict: false,
            });
        }

        let Some(current) = self.remote.get(&reminder.id).await? else {
            return Ok(VersionedWriteOutcome::Missing);
        };
        let current_version = current.version.unwrap_or(0);
        let mut merged = conflict::merge(reminder, &current);
        let second = self.remote.update_versioned(&merged, current_version).await?;
        if !second.updated {
            return Err(TetherError::VersionConflict {
                entity_id: reminder.id.clone(),
                expected: Some(current_version),
                actual: None,
            });
        }

        merged.version = Some(second.new_version.unwrap_or(current_version + 1));
        info!(
            entity_id = %reminder.id,
            expected_version,
            remote_version = current_version,
            new_version = ?merged.version,
            "resolved version conflict by merge"
        );
        Ok(VersionedWriteOutcome::Written { reminder: merged, resolved_conflict: true })
    }

    /// Cached reminders whose version differs from the remote copy
    #[instrument(skip(self))]
    pub async fn detect_conflicts(&self) -> Result<Vec<ConflictRecord>> {
        let remote: HashMap<String, Reminder> =
            self.remote.get_all().await?.into_iter().map(|r| (r.id.clone(), r)).collect();

        let conflicts: Vec<ConflictRecord> = self
            .fallback
            .stored_entities()
            .into_iter()
            .filter_map(|local| {
                let remote = remote.get(&local.id)?;
                (local.version != remote.version).then(|| ConflictRecord {
                    entity_id: local.id.clone(),
                    local_version: local.version,
                    remote_version: remote.version,
                    local_snapshot: local,
                    remote_snapshot: remote.clone(),
                })
            })
            .collect();
        debug!(conflicts = conflicts.len(), "conflict scan finished");
        Ok(conflicts)
    }

    /// Apply a caller-chosen resolution to one conflict
    #[instrument(skip(self, record), fields(entity_id = %record.entity_id))]
    pub async fn apply_resolution(
        &self,
        record: &ConflictRecord,
        strategy: ConflictStrategy,
    ) -> Result<Reminder> {
        let chosen = conflict::resolve(record, strategy);
        if strategy == ConflictStrategy::Remote {
            self.fallback.update_stored_entity(chosen.clone());
            return Ok(chosen);
        }

        let expected = record.remote_version.unwrap_or(0);
        let write = self.remote.update_versioned(&chosen, expected).await?;
        if !write.updated {
            return Err(TetherError::VersionConflict {
                entity_id: record.entity_id.clone(),
                expected: record.remote_version,
                actual: None,
            });
        }
        let version = write.new_version.unwrap_or(expected + 1);
        let written = Reminder { version: Some(version), ..chosen };
        self.fallback.update_stored_entity(written.clone());
        info!(%strategy, version = ?written.version, "conflict resolved");
        Ok(written)
    }

    async fn drain(&self) -> SyncReport {
        let mut report = SyncReport::default();
        let operations = self.fallback.dequeue_ready_operations(self.config.batch_size);
        report.claimed = operations.len();

        let mut claims = ClaimGuard::new(&self.fallback, &operations);
        let mut failed_entities: HashSet<String> = HashSet::new();
        let mut released = Vec::new();

        for op in operations {
            if failed_entities.contains(op.entity_id()) {
                released.push(op.id.clone());
                continue;
            }
            claims.in_flight = Some(op.id.clone());
            match self.replay(&op).await {
                Ok(Replay::Applied { resolved_conflict }) => {
                    self.fallback.complete_operations(std::slice::from_ref(&op.id));
                    report.succeeded += 1;
                    if resolved_conflict {
                        report.conflicts_resolved += 1;
                    }
                }
                Ok(Replay::Dropped) => {
                    self.fallback.complete_operations(std::slice::from_ref(&op.id));
                    report.dropped += 1;
                }
                Err(err) => {
                    self.fallback.mark_operation_failed(&op.id, &err.to_string());
                    report.failed += 1;
                    failed_entities.insert(op.entity_id().to_string());
                }
            }
            claims.settle(&op.id);
        }
        report.released = released.len();
        self.fallback.release_operations(&released);
        claims.disarm();

        self.pull(&mut report).await;

        report.remaining = self.fallback.queue_len();
        if report.pull_error.is_none() {
            report.fallback_cleared = self.fallback.exit_fallback_mode_if_drained();
        }

        info!(
            claimed = report.claimed,
            succeeded = report.succeeded,
            failed = report.failed,
            released = report.released,
            dropped = report.dropped,
            conflicts = report.conflicts_resolved,
            pulled = report.pulled,
            remaining = report.remaining,
            fallback_cleared = report.fallback_cleared,
            "sync drain finished"
        );
        self.notify_report(&report);
        report
    }

    async fn replay(&self, op: &QueuedOperation) -> Result<Replay> {
        debug!(
            operation_id = %op.id,
            entity_id = op.entity_id(),
            kind = %op.kind(),
            "replaying operation"
        );
        match &op.payload {
            QueuedPayload::CreateReminder { reminder } => {
                if let Some(existing) = self.remote.get(&reminder.id).await? {
                    debug!(entity_id = %reminder.id, "create already applied remotely");
                    self.adopt_version(&existing);
                    return Ok(Replay::Applied { resolved_conflict: false });
                }
                let created = self.remote.create(reminder).await?;
                self.adopt_version(&created);
                Ok(Replay::Applied { resolved_conflict: false })
            }
            QueuedPayload::UpdateReminder { reminder, expected_version: Some(expected) } => {
                match self.write_versioned(reminder, *expected).await? {
                    VersionedWriteOutcome::Written { reminder, resolved_conflict } => {
                        self.adopt_version(&reminder);
                        Ok(Replay::Applied { resolved_conflict })
                    }
                    VersionedWriteOutcome::Missing => Ok(self.drop_missing(op)),
                }
            }
            QueuedPayload::UpdateReminder { reminder, expected_version: None } => {
                match self.remote.update(reminder).await? {
                    Some(updated) => {
                        self.adopt_version(&updated);
                        Ok(Replay::Applied { resolved_conflict: false })
                    }
                    None => Ok(self.drop_missing(op)),
                }
            }
            QueuedPayload::DeleteReminder { id } => {
                if !self.remote.delete(id).await? {
                    debug!(entity_id = %id, "delete target already absent remotely");
                }
                Ok(Replay::Applied { resolved_conflict: false })
            }
        }
    }

    fn adopt_version(&self, reminder: &Reminder) {
        if let Some(version) = reminder.version {
            self.fallback.adopt_remote_version(&reminder.id, version);
        }
    }

    fn drop_missing(&self, op: &QueuedOperation) -> Replay {
        warn!(
            operation_id = %op.id,
            entity_id = op.entity_id(),
            "dropping queued update for a reminder deleted remotely"
        );
        self.fallback.remove_stored_entity(op.entity_id());
        Replay::Dropped
    }

    async fn pull(&self, report: &mut SyncReport) {
        let started_at = self.clock.utc_now();
        let result = match self.fallback.last_sync_at() {
            Some(since) => self
                .remote
                .query_updated_since(since)
                .await
                .map(|changed| self.fallback.refresh_stored_entities(changed)),
            None => self.remote.get_all().await.map(|all| {
                let count = all.len();
                self.fallback.replace_stored_entities(all);
                count
            }),
        };

        match result {
            Ok(pulled) => {
                report.pulled = pulled;
                self.fallback.record_sync_at(started_at);
            }
            Err(err) => {
                warn!(error = %err, "pulling remote changes failed");
                report.pull_error = Some(err.to_string());
            }
        }
    }

    fn notify_report(&self, report: &SyncReport) {
        if report.failed > 0 {
            self.notifier.notify(
                NotificationSeverity::Warning,
                &format!("{} change(s) could not be synced and will be retried.", report.failed),
            );
        }
        if report.dropped > 0 {
            self.notifier.notify(
                NotificationSeverity::Warning,
                &format!(
                    "{} offline change(s) were discarded because the reminder was deleted \
                     elsewhere.",
                    report.dropped
                ),
            );
        }
        if report.failed == 0 && report.succeeded > 0 {
            self.notifier.notify(
                NotificationSeverity::Info,
                &format!("Synced {} offline change(s).", report.succeeded),
            );
        }
    }
}
