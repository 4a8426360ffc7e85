//! Status snapshots and mutation outcomes reported by the preservation layer

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::impl_domain_status_conversions;

/// Severity attached to user-facing notifications.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationSeverity {
    Info,
    Success,
    Warning,
    Error,
}

impl_domain_status_conversions!(NotificationSeverity {
    Info => "info",
    Success => "success",
    Warning => "warning",
    Error => "error",
});

/// Where a mutation ended up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MutationOutcome {
    /// Written to the remote store.
    Committed,
    /// Queued because the layer was already in fallback mode.
    Queued,
    /// The remote write failed; fallback was entered and the mutation queued.
    Degraded,
}

impl_domain_status_conversions!(MutationOutcome {
    Committed => "committed",
    Queued => "queued",
    Degraded => "degraded",
});

/// Value returned by a mutation together with its outcome.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MutationResult<T> {
    /// Value the mutation produced
    pub value: T,
    /// Where the mutation ended up
    pub outcome: MutationOutcome,
}

impl<T> MutationResult<T> {
    /// Pair a value with its outcome
    pub const fn new(value: T, outcome: MutationOutcome) -> Self {
        Self { value, outcome }
    }

    /// Value written to the remote store
    pub const fn committed(value: T) -> Self {
        Self::new(value, MutationOutcome::Committed)
    }

    /// Whether the change reached the remote store
    pub fn is_committed(&self) -> bool {
        self.outcome == MutationOutcome::Committed
    }
}

/// Connection monitor snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ConnectionStatus {
    /// Result of the most recent probe
    pub connected: bool,
    /// Whether writes go to the queue
    pub fallback_mode: bool,
    /// When the last probe ran
    pub last_check_time: Option<DateTime<Utc>>,
    /// Consecutive failed probes
    pub retry_attempts: u32,
}

/// Persisted fallback mode flag.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FallbackMode {
    /// Writes are routed to the queue
    pub active: bool,
    /// Why fallback mode was entered
    #[serde(default)]
    pub reason: Option<String>,
    /// When fallback mode was entered
    #[serde(default)]
    pub since: Option<DateTime<Utc>>,
}

/// Fallback store snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FallbackStatus {
    /// Mode flag
    pub mode: FallbackMode,
    /// Operations in the queue
    pub queued: usize,
    /// Queued operations waiting out a retry delay
    pub failed: usize,
    /// Reminders in the local cache
    pub cached: usize,
    /// Start time of the last successful pull
    pub last_sync_at: Option<DateTime<Utc>>,
}

/// Aggregate status exposed by the preservation layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreservationStatus {
    /// Connection monitor state
    pub connection: ConnectionStatus,
    /// Fallback store state
    pub fallback: FallbackStatus,
    /// Connected and not in fallback mode
    pub can_use_remote: bool,
}
