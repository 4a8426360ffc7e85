//! Validation and integrity reports

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tether_common::{FieldError, ValidationError};

/// Outcome of validating a single entity.
///
/// Errors block a mutation; warnings are advisory.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ValidationReport {
    /// No blocking errors
    pub is_valid: bool,
    /// Problems that block the mutation
    pub errors: Vec<FieldError>,
    /// Advisory findings
    pub warnings: Vec<FieldError>,
}

impl ValidationReport {
    /// Report from collected field errors and warnings
    pub fn new(errors: Vec<FieldError>, warnings: Vec<FieldError>) -> Self {
        Self { is_valid: errors.is_empty(), errors, warnings }
    }

    /// Convert blocking errors into a `ValidationError`.
    pub fn into_result(self) -> Result<Vec<FieldError>, ValidationError> {
        if self.is_valid {
            Ok(self.warnings)
        } else {
            Err(ValidationError { errors: self.errors })
        }
    }
}

/// A structural problem found by a dataset-wide scan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum IntegrityIssue {
    DanglingParent { reminder_id: String, parent_id: String },
    SelfParent { reminder_id: String },
    DuplicateTaskId { task_id: String, reminder_ids: Vec<String> },
    OrphanTask { task_id: String, reminder_id: String },
}

/// Result of `validate_referential_integrity`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntegrityReport {
    /// When the scan ran
    pub checked_at: DateTime<Utc>,
    /// Reminders scanned
    pub entities_checked: usize,
    /// Problems found
    pub issues: Vec<IntegrityIssue>,
}

impl IntegrityReport {
    /// Whether the scan found no issues
    pub fn is_clean(&self) -> bool {
        self.issues.is_empty()
    }
}
