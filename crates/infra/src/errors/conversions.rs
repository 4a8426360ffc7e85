//! Conversions from external infrastructure errors into domain errors.

use std::io::Error as IoError;

use reqwest::Error as HttpError;
use rusqlite::Error as SqlError;
use tether_domain::TetherError;

/// Error newtype that keeps conversions on the infrastructure side and can be
/// converted back into the domain error.
#[derive(Debug)]
pub struct InfraError(pub TetherError);

impl From<InfraError> for TetherError {
    fn from(value: InfraError) -> Self {
        value.0
    }
}

impl From<TetherError> for InfraError {
    fn from(value: TetherError) -> Self {
        InfraError(value)
    }
}

trait IntoTetherError {
    fn into_tether(self) -> TetherError;
}

/* -------------------------------------------------------------------------- */
/* rusqlite::Error → TetherError */
/* -------------------------------------------------------------------------- */

impl IntoTetherError for SqlError {
    fn into_tether(self) -> TetherError {
        use rusqlite::ffi::ErrorCode;
        use rusqlite::Error as RE;

        match self {
            RE::SqliteFailure(err, maybe_message) => {
                let message = maybe_message.unwrap_or_default();
                match (err.code, err.extended_code) {
                    (ErrorCode::DatabaseBusy, _) => {
                        TetherError::Persistence("database is busy".into())
                    }
                    (ErrorCode::DatabaseLocked, _) => {
                        TetherError::Persistence("database is locked".into())
                    }
                    (ErrorCode::DatabaseCorrupt | ErrorCode::NotADatabase, _) => {
                        TetherError::Integrity(format!("database file is damaged: {message}"))
                    }
                    (ErrorCode::DiskFull, _) => TetherError::Persistence("disk is full".into()),
                    _ => TetherError::Persistence(format!(
                        "sqlite failure {:?} (code {}): {}",
                        err.code, err.extended_code, message
                    )),
                }
            }
            RE::QueryReturnedNoRows => TetherError::NotFound("no rows returned by query".into()),
            RE::FromSqlConversionFailure(_, _, cause) => {
                TetherError::Persistence(format!("failed to convert sqlite value: {cause}"))
            }
            RE::InvalidPath(path) => TetherError::Config(format!(
                "invalid database path: {}",
                path.to_string_lossy()
            )),
            other => TetherError::Persistence(other.to_string()),
        }
    }
}

impl From<SqlError> for InfraError {
    fn from(value: SqlError) -> Self {
        InfraError(value.into_tether())
    }
}

/* -------------------------------------------------------------------------- */
/* r2d2::Error → TetherError */
/* -------------------------------------------------------------------------- */

impl From<r2d2::Error> for InfraError {
    fn from(value: r2d2::Error) -> Self {
        InfraError(TetherError::Persistence(format!("connection pool: {value}")))
    }
}

/* -------------------------------------------------------------------------- */
/* reqwest::Error → TetherError */
/* -------------------------------------------------------------------------- */

impl IntoTetherError for HttpError {
    fn into_tether(self) -> TetherError {
        if self.is_timeout() {
            return TetherError::Transport("HTTP request timed out".into());
        }

        if self.is_connect() {
            return TetherError::Transport("HTTP connection failure".into());
        }

        if self.is_decode() {
            return TetherError::Transport(format!("malformed response body: {self}"));
        }

        if let Some(status) = self.status() {
            let code = status.as_u16();
            let message =
                format!("HTTP {} {}", code, status.canonical_reason().unwrap_or("unknown status"));

            return match code {
                404 => TetherError::NotFound(message),
                401 | 403 => TetherError::Config(format!("remote rejected credentials: {message}")),
                _ => TetherError::Transport(message),
            };
        }

        TetherError::Transport(self.to_string())
    }
}

impl From<HttpError> for InfraError {
    fn from(value: HttpError) -> Self {
        InfraError(value.into_tether())
    }
}

/* -------------------------------------------------------------------------- */
/* io / serde errors → TetherError */
/* -------------------------------------------------------------------------- */

impl From<IoError> for InfraError {
    fn from(value: IoError) -> Self {
        InfraError(TetherError::Persistence(format!("I/O error: {value}")))
    }
}

impl From<serde_json::Error> for InfraError {
    fn from(value: serde_json::Error) -> Self {
        InfraError(TetherError::Persistence(format!("invalid JSON: {value}")))
    }
}

impl From<toml::de::Error> for InfraError {
    fn from(value: toml::de::Error) -> Self {
        InfraError(TetherError::Config(format!("invalid TOML: {value}")))
    }
}

/* -------------------------------------------------------------------------- */
/* Tests */
/* -------------------------------------------------------------------------- */
