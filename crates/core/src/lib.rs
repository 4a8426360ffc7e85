//! # Tether Core
//!
//! Pure business logic layer - no infrastructure dependencies.
//!
//! This crate contains:
//! - Port interfaces for the remote store, health probe, key-value storage,
//!   backups and notifications
//! - The fallback store, connection monitor, integrity validator, sync engine
//!   and the data preservation layer built on them
//!
//! ## Architecture Principles
//! - Only depends on `tether-common` and `tether-domain`
//! - No database, HTTP, or platform code
//! - All external dependencies via traits

#![forbid(unsafe_code)]

pub mod preservation;

pub use preservation::ports::{
    BackupExecutor, HealthProbe, KeyValueStore, NotificationObserver, RemoteRepository,
};
pub use preservation::{
    ConnectionMonitor, ConnectionMonitorConfig, DataPreservationLayer, FallbackStore,
    FallbackStoreConfig, IntegrityValidator, SyncEngine, SyncEngineConfig,
};
