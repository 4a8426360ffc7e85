//! Configuration loader
//!
//! Loads application configuration from environment variables or files.
//!
//! ## Loading Strategy
//! 1. First, attempts to load from environment variables
//! 2. If `TETHER_REMOTE_URL` is unset, falls back to loading from file
//! 3. Probes multiple paths for config files
//! 4. Supports JSON and TOML formats
//!
//! ## Environment Variables
//! - `TETHER_REMOTE_URL`: Remote store base URL (required)
//! - `TETHER_REMOTE_TOKEN`: Bearer token for the remote store
//! - `TETHER_REMOTE_TIMEOUT`: Request timeout in seconds
//! - `TETHER_STORAGE_BACKEND`: `sqlite`, `json_file` or `memory`
//! - `TETHER_STORAGE_PATH`: Database or JSON file path
//! - `TETHER_STORAGE_POOL_SIZE`: SQLite connection pool size
//! - `TETHER_MONITOR_INTERVAL`: Connection probe interval in seconds
//! - `TETHER_SYNC_INTERVAL`: Sync interval in seconds
//! - `TETHER_SYNC_ENABLED`: Whether scheduled sync runs (true/false)
//! - `TETHER_SYNC_BATCH_SIZE`: Operations claimed per drain
//! - `TETHER_BACKUP_DIR`: Backup directory
//! - `TETHER_LOG_FILTER`: Default log filter when `RUST_LOG` is unset
//! - `TETHER_LOG_JSON`: Emit JSON logs (true/false)
//!
//! Unset optional variables keep their defaults.
//!
//! ## File Locations
//! The loader probes the following paths (in order):
//! 1. `./tether.toml` or `./tether.json` (current working directory)
//! 2. `./config.toml` or `./config.json` (current working directory)
//! 3. `../config.toml` or `../config.json` (parent directory)
//! 4. Relative to executable location

use std::path::{Path, PathBuf};
use std::str::FromStr;

use tether_domain::{Config, Result, StorageBackend, TetherError};

/// Load configuration with automatic fallback strategy
///
/// # Errors
/// Returns `TetherError::Config` if neither source yields a valid
/// configuration.
pub fn load() -> Result<Config> {
    match load_from_env() {
        Ok(config) => {
            tracing::info!("Configuration loaded from environment variables");
            Ok(config)
        }
        Err(e) => {
            tracing::debug!(error = ?e, "Failed to load from environment, trying file");
            load_from_file(None)
        }
    }
}

/// Load configuration from environment variables
///
/// # Errors
/// Returns `TetherError::Config` if `TETHER_REMOTE_URL` is missing or a
/// variable has an invalid value.
pub fn load_from_env() -> Result<Config> {
    let mut config = Config::default();

    config.remote.base_url = env_var("TETHER_REMOTE_URL")?;
    config.remote.api_token = std::env::var("TETHER_REMOTE_TOKEN").ok().filter(|t| !t.is_empty());
    if let Some(timeout) = env_parse::<u64>("TETHER_REMOTE_TIMEOUT")? {
        config.remote.timeout_seconds = timeout;
    }

    if let Ok(backend) = std::env::var("TETHER_STORAGE_BACKEND") {
        config.storage.backend = StorageBackend::from_str(&backend).map_err(TetherError::Config)?;
    }
    if let Ok(path) = std::env::var("TETHER_STORAGE_PATH") {
        config.storage.path = path;
    }
    if let Some(pool_size) = env_parse::<u32>("TETHER_STORAGE_POOL_SIZE")? {
        config.storage.pool_size = pool_size;
    }

    if let Some(interval) = env_parse::<u64>("TETHER_MONITOR_INTERVAL")? {
        config.monitor.check_interval_seconds = interval;
    }

    if let Some(interval) = env_parse::<u64>("TETHER_SYNC_INTERVAL")? {
        config.sync.interval_seconds = interval;
    }
    config.sync.enabled = env_bool("TETHER_SYNC_ENABLED", config.sync.enabled);
    if let Some(batch_size) = env_parse::<usize>("TETHER_SYNC_BATCH_SIZE")? {
        config.sync.batch_size = batch_size;
    }

    if let Ok(directory) = std::env::var("TETHER_BACKUP_DIR") {
        config.backup.directory = directory;
    }

    if let Ok(filter) = std::env::var("TETHER_LOG_FILTER") {
        config.logging.filter = filter;
    }
    config.logging.json = env_bool("TETHER_LOG_JSON", config.logging.json);

    Ok(config)
}

/// Load configuration from a file
///
/// If `path` is `None`, probes the standard locations. Format is chosen by
/// file extension.
///
/// # Errors
/// Returns `TetherError::Config` if the file is missing, unreadable or
/// malformed.
pub fn load_from_file(path: Option<PathBuf>) -> Result<Config> {
    let config_path = match path {
        Some(p) => {
            if !p.exists() {
                return Err(TetherError::Config(format!(
                    "Config file not found: {}",
                    p.display()
                )));
            }
            p
        }
        None => probe_config_paths().ok_or_else(|| {
            TetherError::Config("No config file found in any of the standard locations".to_string())
        })?,
    };

    tracing::info!(path = %config_path.display(), "Loading configuration from file");

    let contents = std::fs::read_to_string(&config_path)
        .map_err(|e| TetherError::Config(format!("Failed to read config file: {}", e)))?;

    parse_config(&contents, &config_path)
}

fn parse_config(contents: &str, path: &Path) -> Result<Config> {
    let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("json");

    match extension {
        "toml" => toml::from_str(contents)
            .map_err(|e| TetherError::Config(format!("Invalid TOML format: {}", e))),
        "json" => serde_json::from_str(contents)
            .map_err(|e| TetherError::Config(format!("Invalid JSON format: {}", e))),
        _ => Err(TetherError::Config(format!("Unsupported config format: {}", extension))),
    }
}

/// Probe the standard locations for a configuration file
///
/// # Returns
/// The first config file found, or `None` if no file exists.
pub fn probe_config_paths() -> Option<PathBuf> {
    let mut candidates = Vec::new();

    if let Ok(cwd) = std::env::current_dir() {
        candidates.extend(candidate_files(&cwd));
        candidates.push(cwd.join("../config.toml"));
        candidates.push(cwd.join("../config.json"));
    }

    if let Ok(exe_path) = std::env::current_exe() {
        if let Some(exe_dir) = exe_path.parent() {
            candidates.extend(candidate_files(exe_dir));
        }
    }

    candidates.into_iter().find(|path| path.exists())
}

fn candidate_files(dir: &Path) -> [PathBuf; 4] {
    [
        dir.join("tether.toml"),
        dir.join("tether.json"),
        dir.join("config.toml"),
        dir.join("config.json"),
    ]
}

fn env_var(key: &str) -> Result<String> {
    std::env::var(key).map_err(|_| {
        TetherError::Config(format!("Missing required environment variable: {}", key))
    })
}

/// Parse an optional numeric variable; unset yields `None`.
fn env_parse<T>(key: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|e| TetherError::Config(format!("Invalid value for {}: {}", key, e))),
        Err(_) => Ok(None),
    }
}

/// Parse boolean from environment variable
///
/// Accepts: `1`/`0`, `true`/`false`, `yes`/`no`, `on`/`off` (case-insensitive)
fn env_bool(key: &str, default: bool) -> bool {
    std::env::var(key)
        .ok()
        .map(|s| matches!(s.to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on"))
        .unwrap_or(default)
}
