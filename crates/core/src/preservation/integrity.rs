//! Structural and referential checks for reminders

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;

use chrono::Datelike;
use tether_common::{
    Clock, CollectionValidator, FieldError, RangeValidator, StringValidator,
    ValidationError,
};
use tether_domain::constants::{
    MAX_DUE_YEAR, MAX_ID_LENGTH, MAX_TASKS_PER_REMINDER, MAX_TASK_TEXT_LENGTH, MAX_TITLE_LENGTH,
    MIN_DUE_YEAR,
};
use tether_domain::{
    IntegrityIssue, IntegrityReport, OrphanTask, Reminder, Result, TetherError, ValidationReport,
};
use tracing::{debug, instrument};

use super::ports::RemoteRepository;

const ID_PATTERN: &str = r"^[A-Za-z0-9._:-]+$";

/// Entity validation and dataset integrity scans
pub struct IntegrityValidator {
    remote: Arc<dyn RemoteRepository>,
    clock: Arc<dyn Clock>,
    id_rule: StringValidator,
    title_rule: StringValidator,
    task_text_rule: StringValidator,
}

impl IntegrityValidator {
    /// Build the validator and its field rules
    pub fn new(remote: Arc<dyn RemoteRepository>, clock: Arc<dyn Clock>) -> Result<Self> {
        let id_rule = StringValidator::new()
            .not_empty()
            .max_length(MAX_ID_LENGTH)
            .pattern(ID_PATTERN)
            .map_err(|err| TetherError::Internal(format!("invalid id pattern: {err}")))?;
        Ok(Self {
            remote,
            clock,
            id_rule,
            title_rule: StringValidator::new().not_empty().max_length(MAX_TITLE_LENGTH),
            task_text_rule: StringValidator::new().not_empty().max_length(MAX_TASK_TEXT_LENGTH),
        })
    }

    /// Check one reminder. Errors block a mutation, warnings do not.
    pub fn validate_entity(&self, reminder: &Reminder) -> ValidationReport {
        let mut errors = ValidationError::new();
        let mut warnings = Vec::new();

        errors.check("id", &self.id_rule, reminder.id.as_str());
        errors.check("title", &self.title_rule, reminder.title.as_str());
        let task_limit = CollectionValidator::new().max_size(MAX_TASKS_PER_REMINDER);
        errors.check("tasks", &task_limit, reminder.tasks.as_slice());

        let task_ids: Vec<&str> = reminder.tasks.iter().map(|task| task.id.as_str()).collect();
        errors.check("tasks", &CollectionValidator::new().unique_items(), task_ids.as_slice());
        for (index, task) in reminder.tasks.iter().enumerate() {
            errors.check(&format!("tasks[{index}].id"), &self.id_rule, task.id.as_str());
            errors.check(&format!("tasks[{index}].text"), &self.task_text_rule, task.text.as_str());
        }

        let year_rule = RangeValidator::new(MIN_DUE_YEAR, MAX_DUE_YEAR);
        errors.check("due_date", &year_rule, &reminder.due_date.year());

        if let Some(end_date) = reminder.end_date {
            errors.check("end_date", &year_rule, &end_date.year());
            if end_date < reminder.due_date {
                errors.add_error_with_code(
                    "end_date",
                    "End date cannot be before due date",
                    "date_order",
                );
            }
            if !reminder.recurrence.is_recurring() {
                warnings.push(FieldError::new(
                    "end_date",
                    "End date has no effect on a non-recurring reminder",
                ));
            }
        }

        if let Some(parent_id) = &reminder.parent_id {
            errors.check("parent_id", &self.id_rule, parent_id.as_str());
            if parent_id == &reminder.id {
                errors.add_error_with_code(
                    "parent_id",
                    "Reminder cannot be its own parent",
                    "self_parent",
                );
            }
        }

        if !reminder.completed && reminder.due_date < self.clock.utc_now().date_naive() {
            warnings.push(FieldError::new("due_date", "Due date is in the past"));
        }

        ValidationReport::new(errors.errors, warnings)
    }

    /// Advisory check that the parent of a reminder exists remotely
    pub async fn check_references(&self, reminder: &Reminder) -> Result<()> {
        let Some(parent_id) = &reminder.parent_id else {
            return Ok(());
        };
        match self.remote.get(parent_id).await? {
            Some(_) => Ok(()),
            None => Err(TetherError::Integrity(format!(
                "reminder {} references missing parent {parent_id}",
                reminder.id
            ))),
        }
    }

    /// Full scan of the remote dataset
    #[instrument(skip(self))]
    pub async fn validate_referential_integrity(&self) -> Result<IntegrityReport> {
        let reminders = self.remote.get_all().await?;
        let orphans = self.remote.find_orphan_tasks().await?;
        let report = self.scan(&reminders, &orphans);
        debug!(
            checked = report.entities_checked,
            issues = report.issues.len(),
            "integrity scan finished"
        );
        Ok(report)
    }

    /// Scan an in-memory set of reminders
    pub fn scan(&self, reminders: &[Reminder], orphans: &[OrphanTask]) -> IntegrityReport {
        let ids: HashSet<&str> = reminders.iter().map(|r| r.id.as_str()).collect();
        let mut issues = Vec::new();

        for reminder in reminders {
            match &reminder.parent_id {
                Some(parent) if parent == &reminder.id => {
                    issues.push(IntegrityIssue::SelfParent { reminder_id: reminder.id.clone() });
                }
                Some(parent) if !ids.contains(parent.as_str()) => {
                    issues.push(IntegrityIssue::DanglingParent {
                        reminder_id: reminder.id.clone(),
                        parent_id: parent.clone(),
                    });
                }
                _ => {}
            }
        }

        let mut owners: BTreeMap<&str, Vec<String>> = BTreeMap::new();
        for reminder in reminders {
            for task in &reminder.tasks {
                owners.entry(task.id.as_str()).or_default().push(reminder.id.clone());
            }
        }
        issues.extend(owners.into_iter().filter(|(_, owners)| owners.len() > 1).map(
            |(task_id, reminder_ids)| IntegrityIssue::DuplicateTaskId {
                task_id: task_id.to_string(),
                reminder_ids,
            },
        ));

        let mut seen_orphans: HashMap<&str, &str> = HashMap::new();
        for orphan in orphans {
            if seen_orphans.insert(orphan.task_id.as_str(), orphan.reminder_id.as_str()).is_none() {
                issues.push(IntegrityIssue::OrphanTask {
                    task_id: orphan.task_id.clone(),
                    reminder_id: orphan.reminder_id.clone(),
                });
            }
        }

        IntegrityReport {
            checked_at: self.clock.utc_now(),
            entities_checked: reminders.len(),
            issues,
        }
    }
}
