//! Sync scheduler for periodic and on-demand queue drains.
//!
//! Runs [`SyncEngine::sync`] every `interval` and immediately whenever the
//! fallback store requests a drain (the connection came back with work
//! queued).
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! use tether_infra::scheduling::{SyncScheduler, SyncSchedulerConfig};
//!
//! # use tether_infra::scheduling::SchedulerResult;
//! # async fn example(
//! #     engine: Arc<tether_core::SyncEngine>,
//! #     drain: Arc<tokio::sync::Notify>,
//! # ) -> SchedulerResult<()> {
//! let mut scheduler = SyncScheduler::new(
//!     engine,
//!     drain,
//!     SyncSchedulerConfig { interval: Duration::from_secs(60), ..SyncSchedulerConfig::default() },
//! );
//!
//! scheduler.start().await?;
//! // ... application runs ...
//! scheduler.stop().await?;
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;
use std::time::{Duration, Instant};

use tether_core::SyncEngine;
use tether_domain::{SyncConfig, SyncOutcome};
use tokio::sync::{Mutex, Notify};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use crate::scheduling::error::{SchedulerError, SchedulerResult};

/// Type alias for task handle to avoid complexity warnings
type TaskHandle = Arc<Mutex<Option<JoinHandle<()>>>>;

/// Configuration for sync scheduler
#[derive(Debug, Clone)]
pub struct SyncSchedulerConfig {
    /// Time between periodic drains
    pub interval: Duration,
    /// Upper bound for one drain before the scheduler stops waiting on it
    pub sync_timeout: Duration,
    /// Time allowed for the loop to exit on stop
    pub join_timeout: Duration,
}

impl Default for SyncSchedulerConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(60),
            sync_timeout: Duration::from_secs(300),
            join_timeout: Duration::from_secs(5),
        }
    }
}

impl From<&SyncConfig> for SyncSchedulerConfig {
    fn from(config: &SyncConfig) -> Self {
        Self { interval: config.interval(), ..Self::default() }
    }
}

/// Periodic and signal-driven sync runner
pub struct SyncScheduler {
    engine: Arc<SyncEngine>,
    drain_signal: Arc<Notify>,
    config: SyncSchedulerConfig,
    cancellation_token: CancellationToken,
    task_handle: TaskHandle,
}

impl SyncScheduler {
    /// Create a stopped scheduler; `drain_signal` wakes it between ticks
    pub fn new(
        engine: Arc<SyncEngine>,
        drain_signal: Arc<Notify>,
        config: SyncSchedulerConfig,
    ) -> Self {
        Self {
            engine,
            drain_signal,
            config,
            cancellation_token: CancellationToken::new(),
            task_handle: Arc::new(Mutex::new(None)),
        }
    }

    /// Start the scheduler
    ///
    /// # Errors
    ///
    /// Returns error if scheduler is already running
    #[instrument(skip(self))]
    pub async fn start(&mut self) -> SchedulerResult<()> {
        if self.is_running() {
            return Err(SchedulerError::AlreadyRunning);
        }

        info!("Starting sync scheduler");

        // Create a new cancellation token (supports restart after stop)
        self.cancellation_token = CancellationToken::new();

        let engine = Arc::clone(&self.engine);
        let drain_signal = Arc::clone(&self.drain_signal);
        let config = self.config.clone();
        let cancel = self.cancellation_token.clone();

        let handle = tokio::spawn(async move {
            Self::sync_loop(engine, drain_signal, config, cancel).await;
        });

        *self.task_handle.lock().await = Some(handle);
        info!(interval = ?self.config.interval, "Sync scheduler started");
        Ok(())
    }

    /// Stop the scheduler gracefully
    ///
    /// # Errors
    ///
    /// Returns error if scheduler is not running
    #[instrument(skip(self))]
    pub async fn stop(&mut self) -> SchedulerResult<()> {
        if !self.is_running() {
            return Err(SchedulerError::NotRunning);
        }

        info!("Stopping sync scheduler");
        self.cancellation_token.cancel();

        if let Some(handle) = self.task_handle.lock().await.take() {
            let join_timeout = self.config.join_timeout;
            tokio::time::timeout(join_timeout, handle)
                .await
                .map_err(|source| SchedulerError::Timeout { duration: join_timeout, source })??;
        }

        info!("Sync scheduler stopped");
        Ok(())
    }

    /// Check if scheduler is running
    pub fn is_running(&self) -> bool {
        self.task_handle
            .try_lock()
            .ok()
            .and_then(|guard| guard.as_ref().map(|h| !h.is_finished()))
            .unwrap_or(false)
    }

    async fn sync_loop(
        engine: Arc<SyncEngine>,
        drain_signal: Arc<Notify>,
        config: SyncSchedulerConfig,
        cancel: CancellationToken,
    ) {
        loop {
            let trigger = tokio::select! {
                _ = cancel.cancelled() => {
                    debug!("Sync loop cancelled");
                    break;
                }
                _ = drain_signal.notified() => "drain_requested",
                _ = tokio::time::sleep(config.interval) => "interval",
            };

            let started = Instant::now();
            tokio::select! {
                _ = cancel.cancelled() => {
                    debug!("Sync loop cancelled during drain");
                    break;
                }
                result = tokio::time::timeout(config.sync_timeout, engine.sync()) => match result {
                    Ok(SyncOutcome::Completed { report }) => {
                        debug!(
                            trigger,
                            elapsed = ?started.elapsed(),
                            remaining = report.remaining,
                            "scheduled sync finished"
                        );
                    }
                    Ok(outcome) => debug!(trigger, ?outcome, "scheduled sync skipped"),
                    Err(_) => {
                        warn!(trigger, timeout = ?config.sync_timeout, "scheduled sync timed out");
                    }
                },
            }
        }
    }
}
