//! Offline-first data preservation
//!
//! - [`fallback_store`]: durable queue, mode flag and entity cache
//! - [`connection_monitor`]: reachability tracking and fallback transitions
//! - [`integrity`]: entity validation and dataset scans
//! - [`conflict`]: merge rules for version conflicts
//! - [`sync_engine`]: queue drain and remote pull
//! - [`service`]: the preservation layer callers use

pub mod conflict;
pub mod connection_monitor;
pub mod fallback_store;
pub mod integrity;
pub mod ports;
pub mod service;
pub mod sync_engine;

pub use connection_monitor::{ConnectionMonitor, ConnectionMonitorConfig};
pub use fallback_store::{FallbackStore, FallbackStoreConfig, QueueError};
pub use integrity::IntegrityValidator;
pub use ports::{BackupExecutor, HealthProbe, KeyValueStore, NotificationObserver, RemoteRepository};
pub use service::DataPreservationLayer;
pub use sync_engine::{SyncEngine, SyncEngineConfig, VersionedWriteOutcome};
