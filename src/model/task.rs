//! Task domain model.
//!
//! # Responsibility
//! - Define the canonical task record mutated by editors.
//! - Provide lifecycle helpers for soft-delete semantics.
//! - Define field-edit payloads (`TaskField`) and the change events
//!   (`TaskChange`) emitted by successful mutations.
//!
//! # Invariants
//! - `id` is stable and never reused for another task.
//! - `is_deleted` is the source of truth for tombstone state; a deleted
//!   task is read-only to every editor.
//! - `reminder_time` is acted upon only while `reminder_enabled` is true.
//!   The value itself is always carried so re-enabling the flag restores
//!   the previously chosen time.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stable identifier for a task.
///
/// Kept as a type alias to make semantic intent explicit in signatures.
pub type TaskId = Uuid;

/// Task lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    /// Created but not started.
    NotStarted,
    /// Work is in progress.
    InProgress,
    /// Completed successfully.
    Done,
}

/// Canonical task record.
///
/// Tags are non-owning associations: the task carries normalized tag
/// names while tag entities live in their own storage tables.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    /// Stable global ID used for persistence and reminder registry keys.
    pub id: TaskId,
    /// Short display title. May be empty.
    pub title: String,
    /// Free-text description. May be empty.
    pub content: String,
    /// Due instant in Unix epoch milliseconds.
    pub assigned_date: i64,
    /// Lifecycle state label.
    pub status: TaskStatus,
    /// Whether a local reminder notification is desired.
    pub reminder_enabled: bool,
    /// Reminder fire instant in Unix epoch milliseconds. Meaningful only
    /// while `reminder_enabled` is true.
    pub reminder_time: i64,
    /// Normalized lowercase tag names associated with this task.
    pub tags: Vec<String>,
    /// Soft delete tombstone guarding against further edits.
    pub is_deleted: bool,
}

impl Task {
    /// Creates a new task with a generated stable ID.
    ///
    /// The reminder starts disabled with its time seeded from the due
    /// instant, so enabling the flag has a sensible default.
    pub fn new(title: impl Into<String>, assigned_date: i64) -> Self {
        Self::with_id(Uuid::new_v4(), title, assigned_date)
    }

    /// Creates a new task with a caller-provided stable ID.
    ///
    /// Used by load/import paths where identity already exists externally.
    pub fn with_id(id: TaskId, title: impl Into<String>, assigned_date: i64) -> Self {
        Self {
            id,
            title: title.into(),
            content: String::new(),
            assigned_date,
            status: TaskStatus::NotStarted,
            reminder_enabled: false,
            reminder_time: assigned_date,
            tags: Vec::new(),
            is_deleted: false,
        }
    }

    /// Marks this task as softly deleted (tombstoned).
    pub fn soft_delete(&mut self) {
        self.is_deleted = true;
    }

    /// Clears the soft delete flag.
    pub fn restore(&mut self) {
        self.is_deleted = false;
    }

    /// Returns whether this task should be considered visible/active.
    pub fn is_active(&self) -> bool {
        !self.is_deleted
    }
}

/// Field-edit payload accepted by the task store.
///
/// Tag replacement is a separate association operation and intentionally
/// not a `TaskField`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskField {
    Title(String),
    Content(String),
    AssignedDate(i64),
    Status(TaskStatus),
    ReminderEnabled(bool),
    ReminderTime(i64),
}

impl TaskField {
    /// Returns the discriminant describing which field this edit touches.
    pub fn changed(&self) -> ChangedField {
        match self {
            Self::Title(_) => ChangedField::Title,
            Self::Content(_) => ChangedField::Content,
            Self::AssignedDate(_) => ChangedField::AssignedDate,
            Self::Status(_) => ChangedField::Status,
            Self::ReminderEnabled(_) => ChangedField::ReminderEnabled,
            Self::ReminderTime(_) => ChangedField::ReminderTime,
        }
    }
}

/// Discriminant naming the field a change event touched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangedField {
    Title,
    Content,
    AssignedDate,
    Status,
    ReminderEnabled,
    ReminderTime,
    Tags,
}

impl ChangedField {
    /// Returns whether a change to this field must resynchronize the
    /// scheduled reminder.
    pub fn affects_reminder(self) -> bool {
        matches!(self, Self::ReminderEnabled | Self::ReminderTime)
    }
}

/// Change event emitted by every successful store mutation.
///
/// Coordinators subscribe to these explicitly instead of observing the
/// task record reactively.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TaskChange {
    /// The mutated task.
    pub task_id: TaskId,
    /// Which field changed.
    pub field: ChangedField,
}
