//! Task edit session: wires field edits to persistence and reminders.
//!
//! # Responsibility
//! - Apply field edits through the task store and queue every successful
//!   mutation for debounced persistence.
//! - Resynchronize the reminder scheduler when the reminder flag or time
//!   changes: cancel first, then schedule while enabled.
//! - Own the failure policy: when scheduling fails, revert
//!   `reminder_enabled` to false so the task state matches what the
//!   platform actually registered, and report the failure for the
//!   presentation layer to surface.
//!
//! # Invariants
//! - Deleting a task cancels its reminder and persists the tombstone.
//! - Reminder failures are outcomes, never fatal errors.
//!
//! The session is constructed explicitly with its repository and gateway
//! and injected into the layers that need it; nothing here reaches for
//! ambient global state.

use crate::model::task::{Task, TaskChange, TaskField, TaskId};
use crate::notify::{NotificationContent, NotificationGateway};
use crate::repo::task_repo::{RepoError, TaskRepository};
use crate::service::reminder::{ReminderError, ReminderScheduler};
use crate::service::save::{FlushReport, PersistenceError, SaveCoordinator};
use crate::service::store::{StoreError, TaskStore};
use log::warn;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::time::{Duration, Instant};

/// Session-level failure for store or association operations.
#[derive(Debug)]
pub enum SessionError {
    /// Mutation rejected by the task store.
    Store(StoreError),
    /// Repository failure during a non-debounced write.
    Persistence(RepoError),
}

impl Display for SessionError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Store(err) => write!(f, "{err}"),
            Self::Persistence(err) => write!(f, "{err}"),
        }
    }
}

impl Error for SessionError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Store(err) => Some(err),
            Self::Persistence(err) => Some(err),
        }
    }
}

impl From<StoreError> for SessionError {
    fn from(value: StoreError) -> Self {
        Self::Store(value)
    }
}

impl From<RepoError> for SessionError {
    fn from(value: RepoError) -> Self {
        Self::Persistence(value)
    }
}

/// What the reminder scheduler did in response to one edit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReminderSync {
    /// The edited field does not affect reminders.
    Untouched,
    /// The reminder was (re)registered at the task's reminder time.
    Scheduled,
    /// Any existing reminder was cancelled and none was registered.
    Cancelled,
    /// Scheduling failed; `reminder_enabled` was reverted to false. The
    /// presentation layer should surface a notice (the denied case points
    /// the user at notification settings).
    Failed(ReminderError),
}

/// Outcome of one field edit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditOutcome {
    /// The change event emitted by the store.
    pub change: TaskChange,
    /// Reminder side effect of the change.
    pub reminder: ReminderSync,
}

/// Editing facade over store, save coordinator and reminder scheduler.
pub struct TaskEditSession<R: TaskRepository, G: NotificationGateway> {
    store: TaskStore,
    saves: SaveCoordinator,
    reminders: ReminderScheduler<G>,
    repo: R,
}

impl<R: TaskRepository, G: NotificationGateway> TaskEditSession<R, G> {
    /// Creates a session with the default debounce window.
    pub fn new(repo: R, gateway: G) -> Self {
        Self::with_debounce_window(repo, gateway, crate::service::save::DEFAULT_DEBOUNCE_WINDOW)
    }

    /// Creates a session with a caller-chosen debounce window.
    pub fn with_debounce_window(repo: R, gateway: G, window: Duration) -> Self {
        Self {
            store: TaskStore::new(),
            saves: SaveCoordinator::new(window),
            reminders: ReminderScheduler::new(gateway),
            repo,
        }
    }

    /// Begins editing a task created by an external collaborator.
    pub fn insert_task(&mut self, task: Task) {
        self.store.insert(task);
    }

    /// Pulls a task (tombstoned or not) from storage into the session.
    ///
    /// Returns whether the task exists.
    pub fn load_task(&mut self, id: TaskId) -> Result<bool, RepoError> {
        match self.repo.get_task(id, true)? {
            Some(task) => {
                self.store.insert(task);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Read access to the session's view of a task.
    pub fn task(&self, id: TaskId) -> Option<&Task> {
        self.store.get(id)
    }

    /// Applies one field edit.
    ///
    /// Every successful mutation queues a debounced save. Edits to the
    /// reminder flag or time additionally resynchronize the scheduler;
    /// the outcome reports what the scheduler did.
    pub fn edit(&mut self, id: TaskId, field: TaskField) -> Result<EditOutcome, SessionError> {
        let change = self.store.set_field(id, field)?;
        self.saves.queue_save(id);

        let reminder = if change.field.affects_reminder() {
            self.sync_reminder(id)
        } else {
            ReminderSync::Untouched
        };

        Ok(EditOutcome { change, reminder })
    }

    /// Replaces the task's tag set.
    ///
    /// Tag association is persisted immediately in one transaction; it
    /// does not ride the debounced save path.
    pub fn replace_tags(&mut self, id: TaskId, tags: &[String]) -> Result<TaskChange, SessionError> {
        let change = self.store.set_tags(id, tags)?;
        let normalized = self
            .store
            .get(id)
            .map(|task| task.tags.clone())
            .unwrap_or_default();
        self.repo.set_task_tags(id, &normalized)?;
        Ok(change)
    }

    /// Soft-deletes the task: tombstone set, reminder cancelled, tombstone
    /// queued for persistence. Further edits are rejected.
    pub fn delete_task(&mut self, id: TaskId) -> Result<(), SessionError> {
        self.store.mark_deleted(id)?;
        self.reminders.cancel_reminder(id);
        self.saves.queue_save(id);
        Ok(())
    }

    /// Persists all pending tasks now, regardless of the debounce window.
    pub fn flush(&mut self) -> Result<FlushReport, PersistenceError> {
        self.saves.flush(&self.store, &self.repo)
    }

    /// Persists pending tasks when the debounce window has elapsed.
    pub fn flush_if_due(&mut self) -> Result<Option<FlushReport>, PersistenceError> {
        if self.saves.flush_due(Instant::now()) {
            return self.flush().map(Some);
        }
        Ok(None)
    }

    /// Ids currently awaiting persistence.
    pub fn pending_saves(&self) -> Vec<TaskId> {
        self.saves.pending()
    }

    /// Registry introspection for the task's reminder.
    pub fn scheduled_reminder(&self, id: TaskId) -> Option<i64> {
        self.reminders.scheduled_time(id)
    }

    /// Deep link into system notification settings, when available.
    pub fn notification_settings_url(&self) -> Option<String> {
        self.reminders.gateway().settings_url()
    }

    /// Brings the scheduler in line with the task's current desired
    /// state: cancel first, then schedule while enabled.
    fn sync_reminder(&mut self, id: TaskId) -> ReminderSync {
        let Some(task) = self.store.get(id) else {
            return ReminderSync::Untouched;
        };
        let enabled = task.reminder_enabled;
        let fire_at_ms = task.reminder_time;
        let content = notification_content(task);

        if !enabled {
            self.reminders.cancel_reminder(id);
            return ReminderSync::Cancelled;
        }

        // schedule_reminder sequences its own cancel before registering,
        // so an enabled task sees exactly one cancel then one schedule.
        match self.reminders.schedule_reminder(id, fire_at_ms, &content) {
            Ok(true) => ReminderSync::Scheduled,
            Ok(false) => ReminderSync::Cancelled,
            Err(err) => {
                warn!(
                    "event=reminder_sync module=session status=reverted task_id={id} error={err}"
                );
                // Keep the record consistent with what the platform holds.
                if self
                    .store
                    .set_field(id, TaskField::ReminderEnabled(false))
                    .is_ok()
                {
                    self.saves.queue_save(id);
                }
                ReminderSync::Failed(err)
            }
        }
    }
}

fn notification_content(task: &Task) -> NotificationContent {
    let title = if task.title.is_empty() {
        "Task reminder".to_string()
    } else {
        task.title.clone()
    };
    let body = if task.content.is_empty() {
        "This task is due soon.".to_string()
    } else {
        task.content.clone()
    };
    NotificationContent { title, body }
}
