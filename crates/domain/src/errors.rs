//! Error types used throughout the application

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tether_common::{ErrorClassification, ErrorSeverity, ValidationError};
use thiserror::Error;

/// Main error type for Tether
///
/// Only `Validation`, `NotFound` and `Config` are expected to reach callers of
/// the preservation layer; the remaining variants are absorbed by fallback
/// handling and surface through logs and notifications.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "message")]
pub enum TetherError {
    #[error("{0}")]
    Validation(ValidationError),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Version conflict on {entity_id}: expected {expected:?}, remote has {actual:?}")]
    VersionConflict { entity_id: String, expected: Option<u64>, actual: Option<u64> },

    #[error("Integrity error: {0}")]
    Integrity(String),

    #[error("Persistence error: {0}")]
    Persistence(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl TetherError {
    /// True for failures that mean "the remote could not be reached".
    pub const fn is_transport(&self) -> bool {
        matches!(self, Self::Transport(_))
    }
}

impl From<ValidationError> for TetherError {
    fn from(value: ValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<serde_json::Error> for TetherError {
    fn from(value: serde_json::Error) -> Self {
        Self::Persistence(format!("serialization failed: {value}"))
    }
}

impl ErrorClassification for TetherError {
    fn is_retryable(&self) -> bool {
        matches!(self, Self::Transport(_) | Self::VersionConflict { .. } | Self::Persistence(_))
    }

    fn severity(&self) -> ErrorSeverity {
        match self {
            Self::NotFound(_) => ErrorSeverity::Info,
            Self::Transport(_) | Self::VersionConflict { .. } | Self::Integrity(_) => {
                ErrorSeverity::Warning
            }
            Self::Validation(_) | Self::Persistence(_) | Self::Config(_) => ErrorSeverity::Error,
            Self::Internal(_) => ErrorSeverity::Critical,
        }
    }

    fn retry_after(&self) -> Option<Duration> {
        None
    }
}

/// Result type alias for Tether operations
pub type Result<T> = std::result::Result<T, TetherError>;
