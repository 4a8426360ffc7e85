//! Application context - dependency injection container

use std::path::PathBuf;
use std::sync::Arc;

use tether_common::{Clock, SystemClock};
use tether_core::{
    BackupExecutor, ConnectionMonitor, ConnectionMonitorConfig, DataPreservationLayer,
    FallbackStore, FallbackStoreConfig, KeyValueStore, NotificationObserver, SyncEngine,
    SyncEngineConfig,
};
use tether_domain::{Config, PreservationStatus, Result, StorageBackend};
use tether_infra::scheduling::SchedulerError;
use tether_infra::{
    DbManager, HttpRemoteRepository, JsonFileStore, MemoryStore, MonitorScheduler,
    SqliteBackupExecutor, SqliteKeyValueStore, SyncScheduler, SyncSchedulerConfig,
    TracingNotifier,
};
use tokio::sync::Mutex;
use tracing::{info, warn};

/// Application context - holds all services and dependencies
pub struct AppContext {
    /// Configuration the context was built from
    pub config: Config,
    /// Present only with the SQLite backend
    pub db: Option<Arc<DbManager>>,
    /// Offline queue and entity cache
    pub fallback: Arc<FallbackStore>,
    /// Remote reachability
    pub monitor: Arc<ConnectionMonitor>,
    /// Queue drain
    pub sync_engine: Arc<SyncEngine>,
    /// Entry point for reminder reads and writes
    pub preservation: Arc<DataPreservationLayer>,

    monitor_scheduler: Mutex<MonitorScheduler>,
    sync_scheduler: Mutex<Option<SyncScheduler>>,
}

struct Storage {
    db: Option<Arc<DbManager>>,
    kv: Arc<dyn KeyValueStore>,
}

fn open_storage(config: &Config) -> Result<Storage> {
    let storage = &config.storage;
    info!(backend = %storage.backend, path = %storage.path, "opening local storage");
    match storage.backend {
        StorageBackend::Sqlite => {
            let db = Arc::new(DbManager::new(&storage.path, storage.pool_size)?);
            let kv: Arc<dyn KeyValueStore> = Arc::new(SqliteKeyValueStore::new(Arc::clone(&db)));
            Ok(Storage { db: Some(db), kv })
        }
        StorageBackend::JsonFile => {
            Ok(Storage { db: None, kv: Arc::new(JsonFileStore::open(&storage.path)?) })
        }
        StorageBackend::Memory => Ok(Storage { db: None, kv: Arc::new(MemoryStore::new()) }),
    }
}

impl AppContext {
    /// Create a new application context from loaded configuration
    pub async fn new() -> Result<Self> {
        Self::new_with_config(tether_infra::config::load()?).await
    }

    /// Build every service from `config` and start the background schedulers
    pub async fn new_with_config(config: Config) -> Result<Self> {
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);
        let notifier: Arc<dyn NotificationObserver> = Arc::new(TracingNotifier);
        let Storage { db, kv } = open_storage(&config)?;

        let remote = Arc::new(HttpRemoteRepository::from_config(&config.remote)?);

        let fallback = Arc::new(FallbackStore::load(
            kv,
            Arc::clone(&clock),
            Arc::clone(&notifier),
            FallbackStoreConfig::from(&config.sync),
        ));
        let monitor = Arc::new(ConnectionMonitor::new(
            remote.clone(),
            Arc::clone(&fallback),
            Arc::clone(&clock),
            ConnectionMonitorConfig::from(&config.monitor),
        ));
        let sync_engine = Arc::new(SyncEngine::new(
            remote.clone(),
            Arc::clone(&fallback),
            Arc::clone(&monitor),
            Arc::clone(&notifier),
            Arc::clone(&clock),
            SyncEngineConfig::from(&config.sync),
        ));

        let mut preservation = DataPreservationLayer::new(
            remote,
            Arc::clone(&fallback),
            Arc::clone(&monitor),
            Arc::clone(&sync_engine),
            notifier,
            Arc::clone(&clock),
        )?;
        match (&db, config.backup.enabled) {
            (Some(db), true) => {
                let executor: Arc<dyn BackupExecutor> = Arc::new(SqliteBackupExecutor::new(
                    Arc::clone(db),
                    PathBuf::from(&config.backup.directory),
                    clock,
                ));
                preservation = preservation.with_backup_executor(executor);
            }
            (None, true) => {
                warn!(
                    backend = %config.storage.backend,
                    "backups require the sqlite backend; disabled"
                );
            }
            (_, false) => {}
        }

        let mut monitor_scheduler =
            MonitorScheduler::new(Arc::clone(&monitor), config.monitor.check_interval());
        monitor_scheduler.start().await.map_err(scheduler_error("MonitorScheduler"))?;

        let sync_scheduler = if config.sync.enabled {
            let mut scheduler = SyncScheduler::new(
                Arc::clone(&sync_engine),
                fallback.drain_signal(),
                SyncSchedulerConfig::from(&config.sync),
            );
            scheduler.start().await.map_err(scheduler_error("SyncScheduler"))?;
            Some(scheduler)
        } else {
            info!("scheduled sync disabled");
            None
        };

        info!("application context ready");
        Ok(Self {
            config,
            db,
            fallback,
            monitor,
            sync_engine,
            preservation: Arc::new(preservation),
            monitor_scheduler: Mutex::new(monitor_scheduler),
            sync_scheduler: Mutex::new(sync_scheduler),
        })
    }

    /// Snapshot of connection, fallback and queue state
    pub fn status(&self) -> PreservationStatus {
        self.preservation.status()
    }

    /// Whether every configured scheduler is running
    pub async fn schedulers_running(&self) -> bool {
        let monitor = self.monitor_scheduler.lock().await.is_running();
        let sync =
            self.sync_scheduler.lock().await.as_ref().map_or(true, SyncScheduler::is_running);
        monitor && sync
    }

    /// Stop the schedulers. Queued operations stay persisted for the next run.
    pub async fn shutdown(&self) -> Result<()> {
        info!("shutdown called on AppContext");

        if let Some(scheduler) = self.sync_scheduler.lock().await.as_mut() {
            stop_quietly("SyncScheduler", scheduler.stop().await)?;
        }
        stop_quietly("MonitorScheduler", self.monitor_scheduler.lock().await.stop().await)?;

        info!(queued = self.fallback.queue_len(), "shutdown complete");
        Ok(())
    }
}

fn scheduler_error(
    component: &'static str,
) -> impl Fn(SchedulerError) -> tether_domain::TetherError {
    move |err| {
        tracing::error!(component, error = %err, "failed to start scheduler");
        err.into()
    }
}

fn stop_quietly(component: &str, result: std::result::Result<(), SchedulerError>) -> Result<()> {
    match result {
        Ok(()) | Err(SchedulerError::NotRunning) => {
            info!(component, "scheduler stopped");
            Ok(())
        }
        Err(err) => {
            warn!(component, error = %err, "scheduler did not stop cleanly");
            Err(err.into())
        }
    }
}
