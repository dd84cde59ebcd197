//! Task store: authoritative in-memory task state for an editing session.
//!
//! # Responsibility
//! - Hold the canonical task records while they are being edited.
//! - Apply field-level mutation behind the soft-delete guard.
//! - Emit an explicit [`TaskChange`] event for every successful mutation
//!   so coordinators react to calls, not to implicit observation.
//!
//! # Invariants
//! - A task with `is_deleted == true` rejects every mutation and keeps
//!   all fields unchanged.
//! - The store never persists or schedules anything itself; it only
//!   reports what changed.

use crate::model::task::{ChangedField, Task, TaskChange, TaskField, TaskId};
use std::collections::{BTreeMap, BTreeSet};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Mutation error reported by the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreError {
    /// Mutation attempted on a soft-deleted task.
    TaskDeleted(TaskId),
    /// The id is not tracked by this store.
    TaskNotFound(TaskId),
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::TaskDeleted(id) => write!(f, "task is deleted and read-only: {id}"),
            Self::TaskNotFound(id) => write!(f, "task not tracked by store: {id}"),
        }
    }
}

impl Error for StoreError {}

/// In-memory task store.
///
/// Population is done by external creation/loading collaborators; the
/// store never creates or destroys tasks on its own initiative.
#[derive(Default)]
pub struct TaskStore {
    tasks: BTreeMap<TaskId, Task>,
}

impl TaskStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Begins tracking a task, replacing any record with the same id.
    pub fn insert(&mut self, task: Task) {
        self.tasks.insert(task.id, task);
    }

    /// Stops tracking a task and returns it, if present.
    pub fn remove(&mut self, id: TaskId) -> Option<Task> {
        self.tasks.remove(&id)
    }

    pub fn get(&self, id: TaskId) -> Option<&Task> {
        self.tasks.get(&id)
    }

    pub fn contains(&self, id: TaskId) -> bool {
        self.tasks.contains_key(&id)
    }

    /// Applies one field edit behind the deletion guard.
    ///
    /// No content validation happens here; policy concerns like
    /// non-empty titles belong to the calling layer.
    pub fn set_field(&mut self, id: TaskId, field: TaskField) -> Result<TaskChange, StoreError> {
        let changed = field.changed();
        let task = self.writable(id)?;

        match field {
            TaskField::Title(value) => task.title = value,
            TaskField::Content(value) => task.content = value,
            TaskField::AssignedDate(value) => task.assigned_date = value,
            TaskField::Status(value) => task.status = value,
            TaskField::ReminderEnabled(value) => task.reminder_enabled = value,
            TaskField::ReminderTime(value) => task.reminder_time = value,
        }

        Ok(TaskChange {
            task_id: id,
            field: changed,
        })
    }

    /// Replaces the full tag set behind the deletion guard.
    ///
    /// Tags are normalized (trimmed, lowercased, deduplicated) before
    /// being applied.
    pub fn set_tags(&mut self, id: TaskId, tags: &[String]) -> Result<TaskChange, StoreError> {
        let normalized = normalize_tags(tags);
        let task = self.writable(id)?;
        task.tags = normalized;

        Ok(TaskChange {
            task_id: id,
            field: ChangedField::Tags,
        })
    }

    /// Sets the soft-delete tombstone; subsequent mutations are rejected.
    ///
    /// Idempotent: tombstoning an already-deleted task succeeds.
    pub fn mark_deleted(&mut self, id: TaskId) -> Result<(), StoreError> {
        let task = self.tasks.get_mut(&id).ok_or(StoreError::TaskNotFound(id))?;
        task.soft_delete();
        Ok(())
    }

    fn writable(&mut self, id: TaskId) -> Result<&mut Task, StoreError> {
        let task = self.tasks.get_mut(&id).ok_or(StoreError::TaskNotFound(id))?;
        if task.is_deleted {
            return Err(StoreError::TaskDeleted(id));
        }
        Ok(task)
    }
}

/// Normalizes one tag value: trimmed, lowercased, empty rejected.
pub fn normalize_tag(tag: &str) -> Option<String> {
    let trimmed = tag.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_lowercase())
    }
}

/// Normalizes and deduplicates tag values, preserving sorted order.
pub fn normalize_tags(tags: &[String]) -> Vec<String> {
    let mut unique = BTreeSet::new();
    for tag in tags {
        if let Some(value) = normalize_tag(tag) {
            unique.insert(value);
        }
    }
    unique.into_iter().collect()
}

#[cfg(test)]
mod tests {
    use super::{normalize_tags, StoreError, TaskStore};
    use crate::model::task::{ChangedField, Task, TaskField, TaskStatus};

    #[test]
    fn set_field_emits_change_event() {
        let mut store = TaskStore::new();
        let task = Task::new("draft", 1_000);
        let id = task.id;
        store.insert(task);

        let change = store
            .set_field(id, TaskField::Status(TaskStatus::InProgress))
            .unwrap();
        assert_eq!(change.task_id, id);
        assert_eq!(change.field, ChangedField::Status);
        assert_eq!(store.get(id).unwrap().status, TaskStatus::InProgress);
    }

    #[test]
    fn deleted_task_rejects_every_mutation_and_keeps_fields() {
        let mut store = TaskStore::new();
        let task = Task::new("keep me", 1_000);
        let id = task.id;
        store.insert(task);
        store.mark_deleted(id).unwrap();

        let before = store.get(id).unwrap().clone();
        let err = store
            .set_field(id, TaskField::Title("changed".to_string()))
            .unwrap_err();
        assert_eq!(err, StoreError::TaskDeleted(id));
        let tags_err = store.set_tags(id, &["x".to_string()]).unwrap_err();
        assert_eq!(tags_err, StoreError::TaskDeleted(id));
        assert_eq!(store.get(id).unwrap(), &before);
    }

    #[test]
    fn unknown_id_reports_not_found() {
        let mut store = TaskStore::new();
        let id = uuid::Uuid::new_v4();
        let err = store
            .set_field(id, TaskField::Content("x".to_string()))
            .unwrap_err();
        assert_eq!(err, StoreError::TaskNotFound(id));
    }

    #[test]
    fn contains_tracks_membership_across_insert_and_remove() {
        let mut store = TaskStore::new();
        let task = Task::new("tracked", 1_000);
        let id = task.id;

        assert!(!store.contains(id));
        store.insert(task);
        assert!(store.contains(id));

        let removed = store.remove(id).unwrap();
        assert_eq!(removed.id, id);
        assert!(!store.contains(id));
    }

    #[test]
    fn tags_are_normalized_and_deduplicated() {
        let tags = vec![
            " Work ".to_string(),
            "IMPORTANT".to_string(),
            "work".to_string(),
            "  ".to_string(),
        ];
        assert_eq!(
            normalize_tags(&tags),
            vec!["important".to_string(), "work".to_string()]
        );
    }
}
