//! # Tether Infrastructure
//!
//! Infrastructure implementations of core ports.
//!
//! This crate contains:
//! - SQLite key-value storage and backups (r2d2 pool)
//! - JSON file and in-memory key-value stores
//! - The HTTP remote repository and health probe
//! - Background schedulers for connection checks and sync
//! - Configuration loading and logging setup
//!
//! ## Architecture
//! - Implements traits defined in `tether-core`
//! - Depends on `tether-common`, `tether-domain` and `tether-core`
//! - Contains all "impure" code (I/O, network, filesystem)

#![forbid(unsafe_code)]

pub mod config;
pub mod database;
pub mod errors;
pub mod http;
pub mod observability;
pub mod scheduling;
pub mod storage;
pub mod sync;

pub use database::{DbManager, SqliteBackupExecutor, SqliteKeyValueStore};
pub use errors::InfraError;
pub use http::{HttpClient, HttpClientBuilder};
pub use observability::{init_logging, TracingNotifier};
pub use scheduling::{MonitorScheduler, SyncScheduler, SyncSchedulerConfig};
pub use storage::{JsonFileStore, MemoryStore};
pub use sync::HttpRemoteRepository;
