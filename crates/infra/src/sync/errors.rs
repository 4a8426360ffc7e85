//! Remote store error types
//!
//! Classifies non-success HTTP responses from the remote reminder store and
//! maps them onto the domain taxonomy.

use reqwest::StatusCode;
use tether_common::{ErrorClassification, ErrorSeverity, ValidationError};
use tether_domain::TetherError;
use thiserror::Error;

/// Categories of remote errors for retry logic
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoteErrorCategory {
    /// 401, 403 - fix credentials before retrying
    Authentication,
    /// 429 - retry with backoff
    RateLimit,
    /// 5xx - retryable
    Server,
    /// 400, 422 - the payload was rejected
    Validation,
    /// 404
    NotFound,
    /// Other 4xx - non-retryable
    Client,
}

/// Remote store errors
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RemoteError {
    #[error("Authentication failed: {0}")]
    Auth(String),

    #[error("Rate limit exceeded: {0}")]
    RateLimit(String),

    #[error("Server error: {0}")]
    Server(String),

    #[error("Rejected payload: {0}")]
    Validation(ValidationError),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Client error: {0}")]
    Client(String),
}

impl RemoteError {
    /// Classify a non-success response. `body` is the raw response text.
    pub fn from_response(status: StatusCode, body: &str) -> Self {
        let message = if body.trim().is_empty() {
            format!("HTTP {}", status.as_u16())
        } else {
            format!("HTTP {}: {}", status.as_u16(), body.trim())
        };

        match status.as_u16() {
            401 | 403 => Self::Auth(message),
            404 => Self::NotFound(message),
            429 => Self::RateLimit(message),
            400 | 422 => Self::Validation(
                serde_json::from_str::<ValidationError>(body)
                    .ok()
                    .filter(|errors| !errors.is_empty())
                    .unwrap_or_else(|| ValidationError::field("remote", message)),
            ),
            500..=599 => Self::Server(message),
            _ => Self::Client(message),
        }
    }

    /// Get the error category for this error
    pub const fn category(&self) -> RemoteErrorCategory {
        match self {
            Self::Auth(_) => RemoteErrorCategory::Authentication,
            Self::RateLimit(_) => RemoteErrorCategory::RateLimit,
            Self::Server(_) => RemoteErrorCategory::Server,
            Self::Validation(_) => RemoteErrorCategory::Validation,
            Self::NotFound(_) => RemoteErrorCategory::NotFound,
            Self::Client(_) => RemoteErrorCategory::Client,
        }
    }
}

impl ErrorClassification for RemoteError {
    fn is_retryable(&self) -> bool {
        matches!(self.category(), RemoteErrorCategory::RateLimit | RemoteErrorCategory::Server)
    }

    fn severity(&self) -> ErrorSeverity {
        match self.category() {
            RemoteErrorCategory::NotFound => ErrorSeverity::Info,
            RemoteErrorCategory::RateLimit | RemoteErrorCategory::Server => ErrorSeverity::Warning,
            RemoteErrorCategory::Validation | RemoteErrorCategory::Client => ErrorSeverity::Error,
            RemoteErrorCategory::Authentication => ErrorSeverity::Critical,
        }
    }
}

/// Retryable failures count as transport problems so the caller falls back
/// to the offline queue.
impl From<RemoteError> for TetherError {
    fn from(err: RemoteError) -> Self {
        match err {
            RemoteError::Validation(errors) => Self::Validation(errors),
            RemoteError::NotFound(message) => Self::NotFound(message),
            RemoteError::Auth(message) => {
                Self::Config(format!("remote rejected credentials: {message}"))
            }
            RemoteError::RateLimit(message) | RemoteError::Server(message) => {
                Self::Transport(message)
            }
            RemoteError::Client(message) => Self::Internal(message),
        }
    }
}
