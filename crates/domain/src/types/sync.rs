//! Sync drain results

use serde::{Deserialize, Serialize};

/// Counters for one queue drain.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SyncReport {
    /// Operations claimed from the queue
    pub claimed: usize,
    /// Operations applied remotely
    pub succeeded: usize,
    /// Operations that failed and were rescheduled
    pub failed: usize,
    /// Claimed but returned to pending behind a failed operation on the same
    /// entity.
    pub released: usize,
    /// Updates dropped because the entity no longer exists remotely.
    pub dropped: usize,
    /// Updates written after a merge
    pub conflicts_resolved: usize,
    /// Remote reminders written into the cache
    pub pulled: usize,
    /// Queue length after the drain
    pub remaining: usize,
    /// Whether the drain left fallback mode
    pub fallback_cleared: bool,
    /// Why the remote pull failed, if it did
    pub pull_error: Option<String>,
}

/// Why a drain did not run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncSkipReason {
    Disconnected,
    NotInFallback,
}

/// Result of `SyncEngine::sync`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum SyncOutcome {
    Completed { report: SyncReport },
    AlreadyInProgress,
    Skipped { reason: SyncSkipReason },
}

impl SyncOutcome {
    /// Counters of a drain that ran
    pub const fn report(&self) -> Option<&SyncReport> {
        match self {
            Self::Completed { report } => Some(report),
            Self::AlreadyInProgress | Self::Skipped { .. } => None,
        }
    }
}
