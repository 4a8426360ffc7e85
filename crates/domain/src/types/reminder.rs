//! Reminder and task entities

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::impl_domain_status_conversions;

/// How a reminder repeats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Recurrence {
    #[default]
    None,
    Daily,
    Weekly,
    Monthly,
}

impl_domain_status_conversions!(Recurrence {
    None => "none",
    Daily => "daily",
    Weekly => "weekly",
    Monthly => "monthly",
});

impl Recurrence {
    /// Anything other than `None`
    pub const fn is_recurring(self) -> bool {
        !matches!(self, Self::None)
    }
}

/// A checklist item owned by exactly one reminder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    /// Task id, unique across the dataset
    pub id: String,
    /// Checklist text
    pub text: String,
    /// Checked off
    #[serde(default)]
    pub completed: bool,
}

impl Task {
    /// Unchecked task
    pub fn new(text: impl Into<String>) -> Self {
        Self { id: Uuid::new_v4().to_string(), text: text.into(), completed: false }
    }
}

/// A reminder with its ordered task list.
///
/// `version` is `None` for a provisional record created while offline and
/// only advances through a successful remote write.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reminder {
    /// Reminder id
    pub id: String,
    /// Non-empty title
    pub title: String,
    /// Day the reminder is due
    pub due_date: NaiveDate,
    /// Time of day, if any
    #[serde(default)]
    pub due_time: Option<NaiveTime>,
    /// Marked done
    #[serde(default)]
    pub completed: bool,
    /// Repeat rule
    #[serde(default)]
    pub recurrence: Recurrence,
    /// Last occurrence of a recurring reminder
    #[serde(default)]
    pub end_date: Option<NaiveDate>,
    /// Reminder this one was spawned from
    #[serde(default)]
    pub parent_id: Option<String>,
    /// Remote version; `None` until the first remote write
    #[serde(default)]
    pub version: Option<u64>,
    /// Ordered checklist
    #[serde(default)]
    pub tasks: Vec<Task>,
    /// Creation time
    pub created_at: DateTime<Utc>,
    /// Last local modification
    pub updated_at: DateTime<Utc>,
}

impl Reminder {
    /// Build an entity from caller input, generating an id when none was
    /// supplied.
    pub fn from_input(input: ReminderInput, now: DateTime<Utc>) -> Self {
        Self {
            id: input.id.unwrap_or_else(|| Uuid::new_v4().to_string()),
            title: input.title,
            due_date: input.due_date,
            due_time: input.due_time,
            completed: input.completed,
            recurrence: input.recurrence,
            end_date: input.end_date,
            parent_id: input.parent_id,
            version: None,
            tasks: input.tasks,
            created_at: now,
            updated_at: now,
        }
    }

    /// True once the remote store has acknowledged at least one write.
    pub const fn is_committed(&self) -> bool {
        self.version.is_some()
    }
}

/// Caller-supplied fields for a new reminder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReminderInput {
    /// Caller-chosen id; generated when absent
    #[serde(default)]
    pub id: Option<String>,
    /// Non-empty title
    pub title: String,
    /// Day the reminder is due
    pub due_date: NaiveDate,
    /// Time of day, if any
    #[serde(default)]
    pub due_time: Option<NaiveTime>,
    /// Marked done
    #[serde(default)]
    pub completed: bool,
    /// Repeat rule
    #[serde(default)]
    pub recurrence: Recurrence,
    /// Last occurrence of a recurring reminder
    #[serde(default)]
    pub end_date: Option<NaiveDate>,
    /// Reminder this one was spawned from
    #[serde(default)]
    pub parent_id: Option<String>,
    /// Ordered checklist
    #[serde(default)]
    pub tasks: Vec<Task>,
}

impl ReminderInput {
    /// Input with a title and due date; the id is generated on create
    pub fn new(title: impl Into<String>, due_date: NaiveDate) -> Self {
        Self {
            id: None,
            title: title.into(),
            due_date,
            due_time: None,
            completed: false,
            recurrence: Recurrence::None,
            end_date: None,
            parent_id: None,
            tasks: Vec::new(),
        }
    }

    /// Use a caller-supplied id
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Append an unchecked task
    pub fn with_task(mut self, text: impl Into<String>) -> Self {
        self.tasks.push(Task::new(text));
        self
    }
}
