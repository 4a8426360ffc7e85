//! Configuration management

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::constants::{DEFAULT_DIAGNOSTIC_RETRY_THRESHOLD, DEFAULT_SYNC_BATCH_SIZE};

/// Application configuration
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Local key-value storage
    pub storage: StorageConfig,
    /// Remote store endpoint
    pub remote: RemoteConfig,
    /// Connection probing
    pub monitor: MonitorConfig,
    /// Queue drain and retry policy
    pub sync: SyncConfig,
    /// Local backups
    pub backup: BackupConfig,
    /// Log filter and format
    pub logging: LoggingConfig,
}

/// Which key-value store backs the fallback state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StorageBackend {
    #[default]
    Sqlite,
    JsonFile,
    Memory,
}

crate::impl_domain_status_conversions!(StorageBackend {
    Sqlite => "sqlite",
    JsonFile => "json_file",
    Memory => "memory",
});

/// Local storage configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Store implementation
    pub backend: StorageBackend,
    /// Database or JSON file path; unused by the memory backend
    pub path: String,
    /// SQLite connection pool size
    pub pool_size: u32,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self { backend: StorageBackend::Sqlite, path: "tether.db".to_string(), pool_size: 4 }
    }
}

/// Remote store configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RemoteConfig {
    /// API root, e.g. `http://localhost:8787`
    pub base_url: String,
    /// Per-request timeout
    pub timeout_seconds: u64,
    /// Bearer token; never serialized back out
    #[serde(skip_serializing)]
    pub api_token: Option<String>,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self { base_url: "http://localhost:8787".to_string(), timeout_seconds: 10, api_token: None }
    }
}

impl RemoteConfig {
    /// Per-request timeout as a `Duration`
    pub const fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }
}

/// Connection monitor configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    /// Seconds between scheduled probes
    pub check_interval_seconds: u64,
    /// Probes within this window reuse the last result
    pub debounce_millis: u64,
    /// A probe slower than this reads as disconnected
    pub probe_timeout_seconds: u64,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self { check_interval_seconds: 30, debounce_millis: 2_000, probe_timeout_seconds: 5 }
    }
}

impl MonitorConfig {
    /// Probe interval as a `Duration`
    pub const fn check_interval(&self) -> Duration {
        Duration::from_secs(self.check_interval_seconds)
    }

    /// Debounce window as a `Duration`
    pub const fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_millis)
    }

    /// Probe timeout as a `Duration`
    pub const fn probe_timeout(&self) -> Duration {
        Duration::from_secs(self.probe_timeout_seconds)
    }
}

/// Sync configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Run the sync scheduler
    pub enabled: bool,
    /// Seconds between scheduled drains
    pub interval_seconds: u64,
    /// Operations claimed per drain
    pub batch_size: usize,
    /// Delay after the first failed attempt
    pub backoff_base_seconds: u64,
    /// Upper bound on the retry delay
    pub backoff_max_seconds: u64,
    /// Failed attempts before an error notification
    pub diagnostic_retry_threshold: u32,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_seconds: 60,
            batch_size: DEFAULT_SYNC_BATCH_SIZE,
            backoff_base_seconds: 2,
            backoff_max_seconds: 300,
            diagnostic_retry_threshold: DEFAULT_DIAGNOSTIC_RETRY_THRESHOLD,
        }
    }
}

impl SyncConfig {
    /// Drain interval as a `Duration`
    pub const fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_seconds)
    }
}

/// Backup configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackupConfig {
    /// Allow backups; only honoured by the SQLite backend
    pub enabled: bool,
    /// Directory backups are written to
    pub directory: String,
}

impl Default for BackupConfig {
    fn default() -> Self {
        Self { enabled: true, directory: "backups".to_string() }
    }
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// `EnvFilter` directive used when `RUST_LOG` is unset.
    pub filter: String,
    /// Emit JSON lines instead of human-readable output
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { filter: "info".to_string(), json: false }
    }
}
