//! Durable offline queue, fallback mode flag and local entity cache.
//!
//! All state lives behind one mutex and is written through the
//! [`KeyValueStore`] before the lock is released, so a restart resumes from
//! the last completed mutation. Entries left `processing` by a crash are
//! returned to `pending` on load.

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tether_common::{BackoffPolicy, Clock};
use tether_domain::constants::{
    DEFAULT_DIAGNOSTIC_RETRY_THRESHOLD, FALLBACK_CACHE_KEY, FALLBACK_LAST_SYNC_KEY,
    FALLBACK_MODE_KEY, FALLBACK_QUEUE_KEY,
};
use tether_domain::{
    FallbackMode, FallbackStatus, NotificationSeverity, OperationStatus, QueuedOperation,
    QueuedPayload, Reminder, SyncConfig, TetherError,
};
use thiserror::Error;
use tokio::sync::Notify;
use tracing::{debug, info, warn};

use super::ports::{KeyValueStore, NotificationObserver};

const OFFLINE_NOTICE: &str =
    "Working offline. Changes are saved locally and will sync when the connection returns.";

/// Queue misuse errors
#[derive(Debug, Error, PartialEq, Eq)]
pub enum QueueError {
    #[error("operations can only be queued while in fallback mode")]
    NotInFallbackMode,
}

impl From<QueueError> for TetherError {
    fn from(value: QueueError) -> Self {
        Self::Internal(value.to_string())
    }
}

/// Fallback store tuning
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FallbackStoreConfig {
    /// Retry delay schedule for failed operations
    pub backoff: BackoffPolicy,
    /// Retry count at which a failing operation is reported to the user
    pub diagnostic_threshold: u32,
}

impl Default for FallbackStoreConfig {
    fn default() -> Self {
        Self {
            backoff: BackoffPolicy::default(),
            diagnostic_threshold: DEFAULT_DIAGNOSTIC_RETRY_THRESHOLD,
        }
    }
}

impl From<&SyncConfig> for FallbackStoreConfig {
    fn from(config: &SyncConfig) -> Self {
        Self {
            backoff: BackoffPolicy::new(
                std::time::Duration::from_secs(config.backoff_base_seconds),
                std::time::Duration::from_secs(config.backoff_max_seconds),
            ),
            diagnostic_threshold: config.diagnostic_retry_threshold,
        }
    }
}

#[derive(Debug, Default)]
struct FallbackState {
    mode: FallbackMode,
    queue: Vec<QueuedOperation>,
    cache: BTreeMap<String, Reminder>,
    last_sync_at: Option<DateTime<Utc>>,
}

impl FallbackState {
    fn has_queued(&self, entity_id: &str) -> bool {
        self.queue.iter().any(|op| op.entity_id() == entity_id)
    }
}

/// Offline queue, mode flag and entity cache
pub struct FallbackStore {
    store: Arc<dyn KeyValueStore>,
    clock: Arc<dyn Clock>,
    notifier: Arc<dyn NotificationObserver>,
    config: FallbackStoreConfig,
    state: Mutex<FallbackState>,
    drain_requested: Arc<Notify>,
}

impl FallbackStore {
    /// Load persisted state, resetting interrupted claims to pending
    pub fn load(
        store: Arc<dyn KeyValueStore>,
        clock: Arc<dyn Clock>,
        notifier: Arc<dyn NotificationObserver>,
        config: FallbackStoreConfig,
    ) -> Self {
        let this = Self {
            store,
            clock,
            notifier,
            config,
            state: Mutex::new(FallbackState::default()),
            drain_requested: Arc::new(Notify::new()),
        };
        this.reload();
        this
    }

    /// Re-read all state from the key-value store
    pub fn reload(&self) {
        let mut state = self.state.lock();
        let mut queue: Vec<QueuedOperation> = self.read_key(FALLBACK_QUEUE_KEY).unwrap_or_default();
        let cache: BTreeMap<String, Reminder> =
            self.read_key(FALLBACK_CACHE_KEY).unwrap_or_default();
        let mut mode: FallbackMode = self.read_key(FALLBACK_MODE_KEY).unwrap_or_default();
        let last_sync_at = self.read_key(FALLBACK_LAST_SYNC_KEY);

        let mut reset = 0usize;
        for op in queue.iter_mut().filter(|op| op.status == OperationStatus::Processing) {
            op.status = OperationStatus::Pending;
            reset += 1;
        }

        if !queue.is_empty() && !mode.active {
            warn!(
                queued = queue.len(),
                "queued operations found outside fallback mode; re-entering fallback"
            );
            mode = FallbackMode {
                active: true,
                reason: Some("recovered_queue".to_string()),
                since: Some(self.clock.utc_now()),
            };
            self.write_key(FALLBACK_MODE_KEY, &mode);
        }

        *state = FallbackState { mode, queue, cache, last_sync_at };
        if reset > 0 {
            info!(reset, "returned interrupted operations to pending");
            self.write_key(FALLBACK_QUEUE_KEY, &state.queue);
        }
        debug!(
            queued = state.queue.len(),
            cached = state.cache.len(),
            fallback = state.mode.active,
            "fallback state loaded"
        );
    }

    /// Signal raised when a drain should run
    pub fn drain_signal(&self) -> Arc<Notify> {
        Arc::clone(&self.drain_requested)
    }

    /// Whether writes are currently routed to the queue
    pub fn is_fallback_mode(&self) -> bool {
        self.state.lock().mode.active
    }

    /// Current mode flag with its reason and entry time
    pub fn mode(&self) -> FallbackMode {
        self.state.lock().mode.clone()
    }

    /// Enter fallback mode. Returns `false` if it was already active.
    pub fn enable_fallback_mode(&self, reason: &str) -> bool {
        {
            let mut state = self.state.lock();
            if state.mode.active {
                return false;
            }
            self.activate(&mut state, reason);
        }
        warn!(reason, "entered fallback mode");
        self.notifier.notify(
            NotificationSeverity::Warning,
            "Working offline. Changes are saved locally and will sync when the connection returns.",
        );
        true
    }

    /// Request leaving fallback mode.
    ///
    /// With an empty queue the flag is cleared immediately; otherwise a drain
    /// is requested and the sync engine clears the flag once the queue empties.
    pub fn disable_fallback_mode(&self) {
        let queued = {
            let state = self.state.lock();
            if !state.mode.active {
                return;
            }
            state.queue.len()
        };

        if queued == 0 {
            self.exit_fallback_mode_if_drained();
        } else {
            info!(queued, "connection restored; requesting queue drain");
            self.drain_requested.notify_one();
        }
    }

    /// Clear fallback mode if nothing is queued. Returns whether it was cleared.
    pub fn exit_fallback_mode_if_drained(&self) -> bool {
        {
            let mut state = self.state.lock();
            if !state.mode.active || !state.queue.is_empty() {
                return false;
            }
            state.mode = FallbackMode::default();
            self.write_key(FALLBACK_MODE_KEY, &state.mode);
        }
        info!("left fallback mode");
        self.notifier.notify(NotificationSeverity::Success, "Back online. All changes are synced.");
        true
    }

    /// Append an operation. Only valid while in fallback mode.
    pub fn queue_operation(&self, payload: QueuedPayload) -> Result<QueuedOperation, QueueError> {
        let mut state = self.state.lock();
        if !state.mode.active {
            return Err(QueueError::NotInFallbackMode);
        }
        Ok(self.push(&mut state, payload))
    }

    /// Enter fallback mode if needed and append an operation, atomically.
    pub fn queue_with_fallback(&self, reason: &str, payload: QueuedPayload) -> QueuedOperation {
        let (op, entered) = {
            let mut state = self.state.lock();
            let entered = !state.mode.active;
            if entered {
                self.activate(&mut state, reason);
            }
            (self.push(&mut state, payload), entered)
        };
        if entered {
            warn!(reason, "entered fallback mode");
            self.notifier.notify(NotificationSeverity::Warning, OFFLINE_NOTICE);
        }
        op
    }

    /// Claim up to `limit` ready operations, flipping them to processing.
    ///
    /// Operations for one entity are claimed in enqueue order: an entity whose
    /// earliest entry is not claimable blocks its later entries.
    pub fn dequeue_ready_operations(&self, limit: usize) -> Vec<QueuedOperation> {
        let now = self.clock.utc_now();
        let mut state = self.state.lock();
        let mut blocked: HashSet<String> = HashSet::new();
        let mut claimed = Vec::new();

        for op in &mut state.queue {
            if claimed.len() >= limit {
                break;
            }
            if blocked.contains(op.entity_id()) {
                continue;
            }
            if op.is_ready(now) {
                op.status = OperationStatus::Processing;
                claimed.push(op.clone());
            } else {
                blocked.insert(op.entity_id().to_string());
            }
        }

        if !claimed.is_empty() {
            self.write_key(FALLBACK_QUEUE_KEY, &state.queue);
            debug!(claimed = claimed.len(), "claimed queued operations");
        }
        claimed
    }

    /// Remove finished operations
    pub fn complete_operations(&self, ids: &[String]) {
        if ids.is_empty() {
            return;
        }
        let mut state = self.state.lock();
        let before = state.queue.len();
        state.queue.retain(|op| !ids.contains(&op.id));
        if state.queue.len() != before {
            self.write_key(FALLBACK_QUEUE_KEY, &state.queue);
        }
    }

    /// Record a failed attempt and schedule the next one with backoff
    pub fn mark_operation_failed(&self, id: &str, error: &str) -> Option<QueuedOperation> {
        let now = self.clock.utc_now();
        let failed = {
            let mut state = self.state.lock();
            let op = state.queue.iter_mut().find(|op| op.id == id)?;
            op.status = OperationStatus::Failed;
            op.retry_count = op.retry_count.saturating_add(1);
            op.next_attempt_at = self.config.backoff.next_attempt_at(now, op.retry_count);
            op.last_error = Some(error.to_string());
            let snapshot = op.clone();
            self.write_key(FALLBACK_QUEUE_KEY, &state.queue);
            snapshot
        };

        warn!(
            operation_id = %failed.id,
            entity_id = failed.entity_id(),
            kind = %failed.kind(),
            retry_count = failed.retry_count,
            next_attempt_at = %failed.next_attempt_at,
            error,
            "queued operation failed"
        );
        if failed.retry_count == self.config.diagnostic_threshold {
            self.notifier.notify(
                NotificationSeverity::Error,
                &format!(
                    "A {} for reminder {} has failed {} times and will keep retrying: {error}",
                    failed.kind(),
                    failed.entity_id(),
                    failed.retry_count
                ),
            );
        }
        Some(failed)
    }

    /// Return claimed operations to pending without a retry penalty
    pub fn release_operations(&self, ids: &[String]) {
        if ids.is_empty() {
            return;
        }
        let mut state = self.state.lock();
        for op in state.queue.iter_mut().filter(|op| ids.contains(&op.id)) {
            if op.status == OperationStatus::Processing {
                op.status = OperationStatus::Pending;
            }
        }
        self.write_key(FALLBACK_QUEUE_KEY, &state.queue);
    }

    /// Ordered snapshot of the queue
    pub fn operation_queue(&self) -> Vec<QueuedOperation> {
        self.state.lock().queue.clone()
    }

    /// Operations in the queue, in any status
    pub fn queue_len(&self) -> usize {
        self.state.lock().queue.len()
    }

    /// Whether any operation for `entity_id` is still queued
    pub fn has_queued_operations(&self, entity_id: &str) -> bool {
        self.state.lock().has_queued(entity_id)
    }

    /// Cached copy of one reminder
    pub fn get_stored_entity(&self, id: &str) -> Option<Reminder> {
        self.state.lock().cache.get(id).cloned()
    }

    /// Last-write-wins cache write
    pub fn update_stored_entity(&self, entity: Reminder) {
        let mut state = self.state.lock();
        state.cache.insert(entity.id.clone(), entity);
        self.write_key(FALLBACK_CACHE_KEY, &state.cache);
    }

    /// Drop a reminder from the cache, returning the removed copy
    pub fn remove_stored_entity(&self, id: &str) -> Option<Reminder> {
        let mut state = self.state.lock();
        let removed = state.cache.remove(id);
        if removed.is_some() {
            self.write_key(FALLBACK_CACHE_KEY, &state.cache);
        }
        removed
    }

    /// Record the version the remote assigned, keeping local field values
    pub fn adopt_remote_version(&self, id: &str, version: u64) {
        let mut state = self.state.lock();
        if let Some(entity) = state.cache.get_mut(id) {
            entity.version = Some(version);
            self.write_key(FALLBACK_CACHE_KEY, &state.cache);
        }
    }

    /// Every cached reminder
    pub fn stored_entities(&self) -> Vec<Reminder> {
        self.state.lock().cache.values().cloned().collect()
    }

    /// Upsert remote copies, skipping entities that still have queued
    /// operations. Returns how many were written.
    pub fn refresh_stored_entities(&self, entities: Vec<Reminder>) -> usize {
        let mut state = self.state.lock();
        let mut written = 0;
        for entity in entities {
            if state.has_queued(&entity.id) {
                continue;
            }
            state.cache.insert(entity.id.clone(), entity);
            written += 1;
        }
        if written > 0 {
            self.write_key(FALLBACK_CACHE_KEY, &state.cache);
        }
        written
    }

    /// Replace the cache with a full remote listing, keeping local copies of
    /// entities that still have queued operations.
    pub fn replace_stored_entities(&self, entities: Vec<Reminder>) {
        let mut state = self.state.lock();
        let mut next: BTreeMap<String, Reminder> = entities
            .into_iter()
            .filter(|entity| !state.has_queued(&entity.id))
            .map(|entity| (entity.id.clone(), entity))
            .collect();
        for (id, entity) in &state.cache {
            if state.has_queued(id) {
                next.insert(id.clone(), entity.clone());
            }
        }
        state.cache = next;
        self.write_key(FALLBACK_CACHE_KEY, &state.cache);
    }

    /// Start time of the last successful pull
    pub fn last_sync_at(&self) -> Option<DateTime<Utc>> {
        self.state.lock().last_sync_at
    }

    /// Persist the start time of a successful pull
    pub fn record_sync_at(&self, at: DateTime<Utc>) {
        let mut state = self.state.lock();
        state.last_sync_at = Some(at);
        self.write_key(FALLBACK_LAST_SYNC_KEY, &at);
    }

    /// Mode and queue counters by status
    pub fn status(&self) -> FallbackStatus {
        let state = self.state.lock();
        FallbackStatus {
            mode: state.mode.clone(),
            queued: state.queue.len(),
            failed: state.queue.iter().filter(|op| op.status == OperationStatus::Failed).count(),
            cached: state.cache.len(),
            last_sync_at: state.last_sync_at,
        }
    }

    fn activate(&self, state: &mut FallbackState, reason: &str) {
        state.mode = FallbackMode {
            active: true,
            reason: Some(reason.to_string()),
            since: Some(self.clock.utc_now()),
        };
        self.write_key(FALLBACK_MODE_KEY, &state.mode);
    }

    fn push(&self, state: &mut FallbackState, payload: QueuedPayload) -> QueuedOperation {
        let op = QueuedOperation::new(payload, self.clock.utc_now());
        debug!(
            operation_id = %op.id,
            entity_id = op.entity_id(),
            kind = %op.kind(),
            "queued operation"
        );
        state.queue.push(op.clone());
        self.write_key(FALLBACK_QUEUE_KEY, &state.queue);
        op
    }

    fn read_key<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        match self.store.get(key) {
            Ok(Some(raw)) => match serde_json::from_str(&raw) {
                Ok(value) => Some(value),
                Err(err) => {
                    warn!(key, error = %err, "discarding unreadable fallback state");
                    None
                }
            },
            Ok(None) => None,
            Err(err) => {
                warn!(key, error = %err, "failed to read fallback state");
                None
            }
        }
    }

    fn write_key<T: Serialize + ?Sized>(&self, key: &str, value: &T) {
        let result = serde_json::to_string(value)
            .map_err(TetherError::from)
            .and_then(|raw| self.store.set(key, &raw));
        if let Err(err) = result {
            warn!(key, error = %err, "failed to persist fallback state; continuing in memory");
        }
    }
}
