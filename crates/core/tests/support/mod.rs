//! Shared test helpers for `tether-core` integration tests.
//!
//! In-memory stand-ins for every port plus a [`Harness`] that wires them into
//! a full preservation stack over a fixed mock clock.

#![allow(dead_code)]

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use parking_lot::Mutex;
use tether_common::testing::MockClock;
use tether_common::Clock;
use tether_core::preservation::ports::{
    HealthProbe, KeyValueStore, NotificationObserver, RemoteRepository,
};
use tether_core::preservation::{
    ConnectionMonitor, ConnectionMonitorConfig, DataPreservationLayer, FallbackStore,
    FallbackStoreConfig, SyncEngine, SyncEngineConfig,
};
use tether_domain::{
    NotificationSeverity, OrphanTask, Reminder, ReminderInput, Result, TetherError, VersionedWrite,
};

pub fn start_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 1, 9, 0, 0).unwrap()
}

pub fn due() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 6, 1).unwrap()
}

pub fn input(id: &str, title: &str) -> ReminderInput {
    ReminderInput::new(title, due()).with_id(id)
}

#[derive(Debug, Clone)]
struct Stored {
    reminder: Reminder,
    modified_at: DateTime<Utc>,
}

/// In-memory remote store with optimistic versioning.
///
/// Records the operation name of every call and can be switched into a
/// failing mode where each call returns a transport error.
pub struct MockRemoteRepository {
    clock: MockClock,
    rows: Mutex<BTreeMap<String, Stored>>,
    orphans: Mutex<Vec<OrphanTask>>,
    failing: AtomicBool,
    latency: Mutex<Option<Duration>>,
    calls: Mutex<Vec<String>>,
}

impl MockRemoteRepository {
    pub fn new(clock: MockClock) -> Self {
        Self {
            clock,
            rows: Mutex::new(BTreeMap::new()),
            orphans: Mutex::new(Vec::new()),
            failing: AtomicBool::new(false),
            latency: Mutex::new(None),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Insert a row directly, as another client would
    pub fn seed(&self, reminder: Reminder) {
        let modified_at = self.clock.utc_now();
        self.rows.lock().insert(reminder.id.clone(), Stored { reminder, modified_at });
    }

    pub fn add_orphan(&self, task_id: &str, reminder_id: &str) {
        let orphan =
            OrphanTask { task_id: task_id.to_string(), reminder_id: reminder_id.to_string() };
        self.orphans.lock().push(orphan);
    }

    pub fn row(&self, id: &str) -> Option<Reminder> {
        self.rows.lock().get(id).map(|stored| stored.reminder.clone())
    }

    /// Remove a row directly, as another client would
    pub fn delete_row(&self, id: &str) -> bool {
        self.rows.lock().remove(id).is_some()
    }

    pub fn len(&self) -> usize {
        self.rows.lock().len()
    }

    pub fn calls(&self, name: &str) -> usize {
        self.calls.lock().iter().filter(|call| call.as_str() == name).count()
    }

    /// Delay every call, so overlapping drains can be observed
    pub fn set_latency(&self, latency: Duration) {
        *self.latency.lock() = Some(latency);
    }

    async fn enter(&self, name: &str) -> Result<()> {
        self.calls.lock().push(name.to_string());
        let latency = *self.latency.lock();
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }
        if self.failing.load(Ordering::SeqCst) {
            return Err(TetherError::Transport(format!("{name}: connection refused")));
        }
        Ok(())
    }

    fn store(&self, reminder: Reminder) {
        let modified_at = self.clock.utc_now();
        self.rows.lock().insert(reminder.id.clone(), Stored { reminder, modified_at });
    }
}

#[async_trait]
impl RemoteRepository for MockRemoteRepository {
    async fn create(&self, reminder: &Reminder) -> Result<Reminder> {
        self.enter("create").await?;
        if self.rows.lock().contains_key(&reminder.id) {
            return Err(TetherError::Internal(format!("duplicate key {}", reminder.id)));
        }
        let created = Reminder { version: Some(1), ..reminder.clone() };
        self.store(created.clone());
        Ok(created)
    }

    async fn update_versioned(
        &self,
        reminder: &Reminder,
        expected_version: u64,
    ) -> Result<VersionedWrite> {
        self.enter("update_versioned").await?;
        let current = self.rows.lock().get(&reminder.id).and_then(|s| s.reminder.version);
        if current != Some(expected_version) {
            return Ok(VersionedWrite::stale());
        }
        let next = expected_version + 1;
        self.store(Reminder { version: Some(next), ..reminder.clone() });
        Ok(VersionedWrite::applied(next))
    }

    async fn update(&self, reminder: &Reminder) -> Result<Option<Reminder>> {
        self.enter("update").await?;
        let Some(current) = self.row(&reminder.id) else {
            return Ok(None);
        };
        let version = current.version.unwrap_or(0) + 1;
        let updated = Reminder { version: Some(version), ..reminder.clone() };
        self.store(updated.clone());
        Ok(Some(updated))
    }

    async fn delete(&self, id: &str) -> Result<bool> {
        self.enter("delete").await?;
        Ok(self.rows.lock().remove(id).is_some())
    }

    async fn get_all(&self) -> Result<Vec<Reminder>> {
        self.enter("get_all").await?;
        Ok(self.rows.lock().values().map(|s| s.reminder.clone()).collect())
    }

    async fn get(&self, id: &str) -> Result<Option<Reminder>> {
        self.enter("get").await?;
        Ok(self.row(id))
    }

    async fn query_updated_since(&self, since: DateTime<Utc>) -> Result<Vec<Reminder>> {
        self.enter("query_updated_since").await?;
        Ok(self
            .rows
            .lock()
            .values()
            .filter(|s| s.modified_at >= since)
            .map(|s| s.reminder.clone())
            .collect())
    }

    async fn find_orphan_tasks(&self) -> Result<Vec<OrphanTask>> {
        self.enter("find_orphan_tasks").await?;
        Ok(self.orphans.lock().clone())
    }
}

/// Health probe that answers according to a switch
#[derive(Default)]
pub struct MockHealthProbe {
    up: AtomicBool,
    calls: AtomicUsize,
}

impl MockHealthProbe {
    pub fn set_up(&self, up: bool) {
        self.up.store(up, Ordering::SeqCst);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl HealthProbe for MockHealthProbe {
    async fn health_check(&self) -> Result<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.up.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(TetherError::Transport("health check refused".into()))
        }
    }
}

/// Key-value store backed by a shared map, so a second stack can reopen it
#[derive(Default, Clone)]
pub struct MemoryKv(Arc<Mutex<HashMap<String, String>>>);

impl KeyValueStore for MemoryKv {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.0.lock().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.0.lock().insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.0.lock().remove(key);
        Ok(())
    }
}

/// Notification observer that keeps every message
#[derive(Default)]
pub struct RecordingNotifier {
    events: Mutex<Vec<(NotificationSeverity, String)>>,
}

impl RecordingNotifier {
    pub fn events(&self) -> Vec<(NotificationSeverity, String)> {
        self.events.lock().clone()
    }

    pub fn count(&self, severity: NotificationSeverity) -> usize {
        self.events.lock().iter().filter(|(s, _)| *s == severity).count()
    }
}

impl NotificationObserver for RecordingNotifier {
    fn notify(&self, severity: NotificationSeverity, message: &str) {
        self.events.lock().push((severity, message.to_string()));
    }
}

/// Fully wired preservation stack over in-memory ports
pub struct Harness {
    pub clock: MockClock,
    pub remote: Arc<MockRemoteRepository>,
    pub probe: Arc<MockHealthProbe>,
    pub kv: MemoryKv,
    pub notifier: Arc<RecordingNotifier>,
    pub fallback: Arc<FallbackStore>,
    pub monitor: Arc<ConnectionMonitor>,
    pub sync: Arc<SyncEngine>,
    pub layer: DataPreservationLayer,
}

impl Harness {
    pub fn new() -> Self {
        let clock = MockClock::at(start_time());
        let remote = Arc::new(MockRemoteRepository::new(clock.clone()));
        Self::with_parts(clock, remote, MemoryKv::default())
    }

    /// Build a stack over existing storage, as a restarted process would
    pub fn with_parts(clock: MockClock, remote: Arc<MockRemoteRepository>, kv: MemoryKv) -> Self {
        let probe = Arc::new(MockHealthProbe::default());
        let notifier = Arc::new(RecordingNotifier::default());
        let shared_clock: Arc<dyn Clock> = Arc::new(clock.clone());

        let fallback = Arc::new(FallbackStore::load(
            Arc::new(kv.clone()),
            Arc::clone(&shared_clock),
            notifier.clone(),
            FallbackStoreConfig::default(),
        ));
        let monitor = Arc::new(ConnectionMonitor::new(
            probe.clone(),
            Arc::clone(&fallback),
            Arc::clone(&shared_clock),
            ConnectionMonitorConfig {
                probe_timeout: Duration::from_secs(1),
                ..ConnectionMonitorConfig::default()
            },
        ));
        let sync = Arc::new(SyncEngine::new(
            remote.clone(),
            Arc::clone(&fallback),
            Arc::clone(&monitor),
            notifier.clone(),
            Arc::clone(&shared_clock),
            SyncEngineConfig::default(),
        ));
        let layer = DataPreservationLayer::new(
            remote.clone(),
            Arc::clone(&fallback),
            Arc::clone(&monitor),
            Arc::clone(&sync),
            notifier.clone(),
            shared_clock,
        )
        .expect("layer builds");

        Self { clock, remote, probe, kv, notifier, fallback, monitor, sync, layer }
    }

    pub async fn go_online(&self) {
        self.probe.set_up(true);
        self.remote.set_failing(false);
        assert!(self.monitor.force_reconnect().await);
    }

    pub async fn go_offline(&self) {
        self.probe.set_up(false);
        self.remote.set_failing(true);
        assert!(!self.monitor.force_reconnect().await);
    }
}
