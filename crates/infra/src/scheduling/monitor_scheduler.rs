//! Periodic connection probing.

use std::sync::Arc;
use std::time::Duration;

use tether_core::ConnectionMonitor;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument};

use crate::scheduling::error::{SchedulerError, SchedulerResult};

type TaskHandle = Arc<Mutex<Option<JoinHandle<()>>>>;

const JOIN_TIMEOUT: Duration = Duration::from_secs(5);

/// Calls [`ConnectionMonitor::check_connection`] on a fixed interval.
pub struct MonitorScheduler {
    monitor: Arc<ConnectionMonitor>,
    interval: Duration,
    cancellation_token: CancellationToken,
    task_handle: TaskHandle,
}

impl MonitorScheduler {
    /// Create a stopped scheduler that probes every `interval`
    pub fn new(monitor: Arc<ConnectionMonitor>, interval: Duration) -> Self {
        Self {
            monitor,
            interval,
            cancellation_token: CancellationToken::new(),
            task_handle: Arc::new(Mutex::new(None)),
        }
    }

    /// Spawn the probe loop. The first probe runs immediately.
    #[instrument(skip(self))]
    pub async fn start(&mut self) -> SchedulerResult<()> {
        if self.is_running() {
            return Err(SchedulerError::AlreadyRunning);
        }

        self.cancellation_token = CancellationToken::new();
        let monitor = Arc::clone(&self.monitor);
        let interval = self.interval;
        let cancel = self.cancellation_token.clone();

        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => {
                        debug!("Monitor loop cancelled");
                        break;
                    }
                    _ = ticker.tick() => {
                        let connected = monitor.check_connection().await;
                        debug!(connected, "scheduled connection check");
                    }
                }
            }
        });

        *self.task_handle.lock().await = Some(handle);
        info!(interval = ?self.interval, "Monitor scheduler started");
        Ok(())
    }

    /// Cancel the loop and wait for it to finish.
    #[instrument(skip(self))]
    pub async fn stop(&mut self) -> SchedulerResult<()> {
        if !self.is_running() {
            return Err(SchedulerError::NotRunning);
        }

        self.cancellation_token.cancel();
        if let Some(handle) = self.task_handle.lock().await.take() {
            tokio::time::timeout(JOIN_TIMEOUT, handle)
                .await
                .map_err(|source| SchedulerError::Timeout { duration: JOIN_TIMEOUT, source })??;
        }

        info!("Monitor scheduler stopped");
        Ok(())
    }

    /// Whether the probe loop is active
    pub fn is_running(&self) -> bool {
        self.task_handle
            .try_lock()
            .ok()
            .and_then(|guard| guard.as_ref().map(|h| !h.is_finished()))
            .unwrap_or(false)
    }
}
