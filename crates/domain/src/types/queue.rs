//! Queued operation types for the offline fallback queue

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::reminder::Reminder;
use crate::impl_domain_status_conversions;

/// Mutation kind carried by a queued operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperationKind {
    Create,
    Update,
    Delete,
}

impl_domain_status_conversions!(OperationKind {
    Create => "create",
    Update => "update",
    Delete => "delete",
});

/// Entity type targeted by a queued operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityType {
    Reminder,
}

impl_domain_status_conversions!(EntityType {
    Reminder => "reminder",
});

/// Lifecycle of a queued operation.
///
/// `pending -> processing -> (removed)` on success,
/// `processing -> failed -> processing` once backoff has elapsed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperationStatus {
    #[default]
    Pending,
    Processing,
    Failed,
}

impl_domain_status_conversions!(OperationStatus {
    Pending => "pending",
    Processing => "processing",
    Failed => "failed",
});

/// Typed payload of a queued mutation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum QueuedPayload {
    CreateReminder {
        reminder: Reminder,
    },
    UpdateReminder {
        reminder: Reminder,
        #[serde(default)]
        expected_version: Option<u64>,
    },
    DeleteReminder {
        id: String,
    },
}

impl QueuedPayload {
    /// Mutation kind of the payload
    pub const fn kind(&self) -> OperationKind {
        match self {
            Self::CreateReminder { .. } => OperationKind::Create,
            Self::UpdateReminder { .. } => OperationKind::Update,
            Self::DeleteReminder { .. } => OperationKind::Delete,
        }
    }

    /// Entity type the payload targets
    pub const fn entity_type(&self) -> EntityType {
        EntityType::Reminder
    }

    /// Reminder the payload targets
    pub fn entity_id(&self) -> &str {
        match self {
            Self::CreateReminder { reminder } | Self::UpdateReminder { reminder, .. } => {
                &reminder.id
            }
            Self::DeleteReminder { id } => id,
        }
    }
}

/// A mutation waiting to be replayed against the remote store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueuedOperation {
    /// Operation id, unique within the queue
    pub id: String,
    /// Mutation to replay
    pub payload: QueuedPayload,
    /// When the operation was queued
    pub enqueued_at: DateTime<Utc>,
    /// Claim state
    #[serde(default)]
    pub status: OperationStatus,
    /// Failed attempts so far
    #[serde(default)]
    pub retry_count: u32,
    /// Earliest time a drain may claim the operation
    pub next_attempt_at: DateTime<Utc>,
    /// Error from the most recent failed attempt
    #[serde(default)]
    pub last_error: Option<String>,
}

impl QueuedOperation {
    /// New pending operation with no attempts
    pub fn new(payload: QueuedPayload, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            payload,
            enqueued_at: now,
            status: OperationStatus::Pending,
            retry_count: 0,
            next_attempt_at: now,
            last_error: None,
        }
    }

    /// Mutation kind of the payload
    pub const fn kind(&self) -> OperationKind {
        self.payload.kind()
    }

    /// Reminder the operation targets
    pub fn entity_id(&self) -> &str {
        self.payload.entity_id()
    }

    /// Claimable by a drain: not already claimed and past its backoff.
    pub fn is_ready(&self, now: DateTime<Utc>) -> bool {
        self.status != OperationStatus::Processing && self.next_attempt_at <= now
    }
}
