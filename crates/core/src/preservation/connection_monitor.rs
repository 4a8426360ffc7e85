//! Remote reachability tracking and fallback transitions

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use tether_common::Clock;
use tether_domain::constants::{REASON_CONNECTION_LOST, REASON_NETWORK_OFFLINE};
use tether_domain::{ConnectionStatus, MonitorConfig};
use tracing::{debug, info, instrument, warn};

use super::fallback_store::FallbackStore;
use super::ports::HealthProbe;

/// Probe cadence and limits
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectionMonitorConfig {
    /// Time between scheduled probes
    pub check_interval: Duration,
    /// Probes within this window reuse the last result
    pub debounce: Duration,
    /// A probe slower than this reads as disconnected
    pub probe_timeout: Duration,
}

impl Default for ConnectionMonitorConfig {
    fn default() -> Self {
        Self::from(&MonitorConfig::default())
    }
}

impl From<&MonitorConfig> for ConnectionMonitorConfig {
    fn from(config: &MonitorConfig) -> Self {
        Self {
            check_interval: config.check_interval(),
            debounce: config.debounce(),
            probe_timeout: config.probe_timeout(),
        }
    }
}

#[derive(Debug, Default)]
struct MonitorState {
    connected: bool,
    checked: bool,
    last_check: Option<Instant>,
    last_check_time: Option<DateTime<Utc>>,
    retry_attempts: u32,
}

/// Tracks whether the remote store is reachable.
///
/// Owns the connected/fallback transition: losing the remote enters fallback
/// mode, regaining it asks the fallback store to leave it (which requests a
/// queue drain).
pub struct ConnectionMonitor {
    probe: Arc<dyn HealthProbe>,
    fallback: Arc<FallbackStore>,
    clock: Arc<dyn Clock>,
    config: ConnectionMonitorConfig,
    state: Mutex<MonitorState>,
    probe_gate: tokio::sync::Mutex<()>,
}

impl ConnectionMonitor {
    /// Build a monitor that starts disconnected until the first probe
    pub fn new(
        probe: Arc<dyn HealthProbe>,
        fallback: Arc<FallbackStore>,
        clock: Arc<dyn Clock>,
        config: ConnectionMonitorConfig,
    ) -> Self {
        Self {
            probe,
            fallback,
            clock,
            config,
            state: Mutex::new(MonitorState::default()),
            probe_gate: tokio::sync::Mutex::new(()),
        }
    }

    /// Probe settings
    pub const fn config(&self) -> &ConnectionMonitorConfig {
        &self.config
    }

    /// Probe the remote unless a probe ran within the debounce window.
    /// Never fails: errors and timeouts read as disconnected.
    #[instrument(skip(self))]
    pub async fn check_connection(&self) -> bool {
        let _gate = self.probe_gate.lock().await;
        {
            let state = self.state.lock();
            if let Some(last) = state.last_check {
                if state.checked && self.clock.now().duration_since(last) < self.config.debounce {
                    debug!(connected = state.connected, "probe debounced");
                    return state.connected;
                }
            }
        }
        self.probe_and_apply().await
    }

    /// Probe immediately, ignoring the debounce window
    #[instrument(skip(self))]
    pub async fn force_reconnect(&self) -> bool {
        let _gate = self.probe_gate.lock().await;
        self.probe_and_apply().await
    }

    /// React to an OS network change signal
    pub async fn handle_network_change(&self, online: bool) -> bool {
        if online {
            info!("network reported online; probing remote");
            self.force_reconnect().await
        } else {
            self.apply(false, REASON_NETWORK_OFFLINE);
            false
        }
    }

    /// Result of the most recent probe
    pub fn is_connected(&self) -> bool {
        self.state.lock().connected
    }

    /// Connection snapshot for status reporting
    pub fn status(&self) -> ConnectionStatus {
        let state = self.state.lock();
        ConnectionStatus {
            connected: state.connected,
            fallback_mode: self.fallback.is_fallback_mode(),
            last_check_time: state.last_check_time,
            retry_attempts: state.retry_attempts,
        }
    }

    async fn probe_and_apply(&self) -> bool {
        let probe = tokio::time::timeout(self.config.probe_timeout, self.probe.health_check());
        let connected = match probe.await {
            Ok(Ok(())) => true,
            Ok(Err(err)) => {
                debug!(error = %err, "health probe failed");
                false
            }
            Err(_) => {
                debug!(timeout = ?self.config.probe_timeout, "health probe timed out");
                false
            }
        };
        self.apply(connected, REASON_CONNECTION_LOST);
        connected
    }

    fn apply(&self, connected: bool, reason: &str) {
        let (was_checked, was_connected, attempts) = {
            let mut state = self.state.lock();
            let previous = (state.checked, state.connected);
            state.connected = connected;
            state.checked = true;
            state.last_check = Some(self.clock.now());
            state.last_check_time = Some(self.clock.utc_now());
            state.retry_attempts =
                if connected { 0 } else { state.retry_attempts.saturating_add(1) };
            (previous.0, previous.1, state.retry_attempts)
        };

        if connected && (!was_checked || !was_connected) {
            if was_checked {
                info!("remote connection restored");
            }
            self.fallback.disable_fallback_mode();
        } else if !connected && (!was_checked || was_connected) {
            warn!(reason, "remote connection lost");
            self.fallback.enable_fallback_mode(reason);
        } else if !connected {
            debug!(attempts, "remote still unreachable");
        }
    }
}
