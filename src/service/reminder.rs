//! Reminder scheduler: keeps at most one platform notification per task.
//!
//! # Responsibility
//! - Translate a task's desired reminder state into platform registry
//!   entries through the notification gateway.
//! - Sequence cancel-then-schedule so a stale reminder never survives a
//!   time change.
//! - Discard schedule completions that a cancel or disable overtook.
//!
//! # Invariants
//! - Per task the local state is `NoReminder` or `Scheduled`; never two
//!   simultaneous entries for one id.
//! - `cancel_reminder` is safe to call when nothing is scheduled.
//! - The scheduler never mutates the task record; reverting
//!   `reminder_enabled` after a failure is the calling layer's policy.
//!
//! Every (re)schedule bumps a per-task generation counter. The counter is
//! the cancellation token: a completion only takes effect when the
//! generation it captured is still current, so an embedding runtime may
//! run the platform calls on a background thread via
//! [`ReminderScheduler::begin_schedule`] / [`ReminderScheduler::commit_schedule`]
//! without risking a state flip on a task that moved on.

use crate::model::task::TaskId;
use crate::notify::{NotificationContent, NotificationGateway, NotifyError};
use log::{debug, info, warn};
use std::collections::HashMap;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::Mutex;

/// Reminder scheduling failure.
///
/// Authorization denial and platform scheduling trouble are kept as two
/// kinds; the revert policy treats them identically but the presentation
/// layer words them differently (the denied case points at settings).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReminderError {
    /// The user declined notification authorization.
    AuthorizationDenied,
    /// The platform failed to answer authorization or register the entry.
    SchedulingFailed(NotifyError),
}

impl Display for ReminderError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::AuthorizationDenied => write!(f, "notification authorization denied"),
            Self::SchedulingFailed(err) => write!(f, "reminder scheduling failed: {err}"),
        }
    }
}

impl Error for ReminderError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::AuthorizationDenied => None,
            Self::SchedulingFailed(err) => Some(err),
        }
    }
}

/// Cancellation token for one in-flight schedule operation.
#[derive(Debug, Clone, Copy)]
pub struct ScheduleTicket {
    task_id: TaskId,
    generation: u64,
    fire_at_ms: i64,
}

#[derive(Default)]
struct ReminderEntry {
    generation: u64,
    scheduled_at: Option<i64>,
}

/// Per-task reminder state over a notification gateway.
pub struct ReminderScheduler<G: NotificationGateway> {
    gateway: G,
    entries: Mutex<HashMap<TaskId, ReminderEntry>>,
}

impl<G: NotificationGateway> ReminderScheduler<G> {
    pub fn new(gateway: G) -> Self {
        Self {
            gateway,
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Shared access to the underlying platform gateway.
    pub fn gateway(&self) -> &G {
        &self.gateway
    }

    /// Removes any scheduled entry for the task.
    ///
    /// Always safe: with nothing scheduled this is a no-op apart from
    /// invalidating in-flight schedule completions for the id.
    pub fn cancel_reminder(&self, task_id: TaskId) {
        {
            let mut entries = self.entries.lock().expect("reminder entries lock poisoned");
            let entry = entries.entry(task_id).or_default();
            entry.generation += 1;
            entry.scheduled_at = None;
        }
        self.gateway.cancel(task_id);
        debug!("event=reminder_cancel module=reminder status=ok task_id={task_id}");
    }

    /// Requests authorization if needed and registers the reminder.
    ///
    /// Sequences cancel-then-schedule for the id. Returns `Ok(true)` when
    /// the entry is registered and recorded, `Ok(false)` when a concurrent
    /// cancel/disable overtook the operation and the completion was
    /// discarded.
    pub fn schedule_reminder(
        &self,
        task_id: TaskId,
        fire_at_ms: i64,
        content: &NotificationContent,
    ) -> Result<bool, ReminderError> {
        let ticket = self.begin_schedule(task_id, fire_at_ms);

        let granted = self
            .gateway
            .request_authorization()
            .map_err(ReminderError::SchedulingFailed)?;
        if !granted {
            warn!("event=reminder_schedule module=reminder status=denied task_id={task_id}");
            return Err(ReminderError::AuthorizationDenied);
        }

        self.gateway
            .schedule(task_id, fire_at_ms, content)
            .map_err(ReminderError::SchedulingFailed)?;

        Ok(self.commit_schedule(&ticket))
    }

    /// First half of a schedule: invalidates previous state and removes
    /// the existing platform entry for the id.
    ///
    /// The returned ticket must be passed to [`Self::commit_schedule`]
    /// after the platform registration succeeds.
    pub fn begin_schedule(&self, task_id: TaskId, fire_at_ms: i64) -> ScheduleTicket {
        let generation = {
            let mut entries = self.entries.lock().expect("reminder entries lock poisoned");
            let entry = entries.entry(task_id).or_default();
            entry.generation += 1;
            entry.scheduled_at = None;
            entry.generation
        };
        self.gateway.cancel(task_id);

        ScheduleTicket {
            task_id,
            generation,
            fire_at_ms,
        }
    }

    /// Second half of a schedule: records `Scheduled` state when the
    /// ticket is still current.
    ///
    /// A stale ticket means the task was cancelled, disabled or
    /// rescheduled while the platform call was in flight; the registered
    /// entry is removed again and `false` is returned.
    pub fn commit_schedule(&self, ticket: &ScheduleTicket) -> bool {
        let fresh = {
            let mut entries = self.entries.lock().expect("reminder entries lock poisoned");
            let entry = entries.entry(ticket.task_id).or_default();
            if entry.generation == ticket.generation {
                entry.scheduled_at = Some(ticket.fire_at_ms);
                true
            } else {
                false
            }
        };

        if fresh {
            info!(
                "event=reminder_schedule module=reminder status=ok task_id={} fire_at_ms={}",
                ticket.task_id, ticket.fire_at_ms
            );
        } else {
            self.gateway.cancel(ticket.task_id);
            debug!(
                "event=reminder_schedule module=reminder status=superseded task_id={}",
                ticket.task_id
            );
        }
        fresh
    }

    /// Returns the locally recorded fire instant for the task.
    pub fn scheduled_time(&self, task_id: TaskId) -> Option<i64> {
        let entries = self.entries.lock().expect("reminder entries lock poisoned");
        entries.get(&task_id).and_then(|entry| entry.scheduled_at)
    }

    pub fn is_scheduled(&self, task_id: TaskId) -> bool {
        self.scheduled_time(task_id).is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::{ReminderError, ReminderScheduler};
    use crate::notify::{
        AuthorizationPolicy, InMemoryNotificationCenter, NotificationContent, NotificationGateway,
        NotifyError,
    };
    use uuid::Uuid;

    fn content() -> NotificationContent {
        NotificationContent {
            title: "task".to_string(),
            body: "due soon".to_string(),
        }
    }

    struct BrokenGateway;

    impl NotificationGateway for BrokenGateway {
        fn request_authorization(&self) -> Result<bool, NotifyError> {
            Ok(true)
        }

        fn schedule(
            &self,
            _task_id: Uuid,
            _fire_at_ms: i64,
            _content: &NotificationContent,
        ) -> Result<(), NotifyError> {
            Err(NotifyError::Platform("registry unavailable".to_string()))
        }

        fn cancel(&self, _task_id: Uuid) {}
    }

    #[test]
    fn schedule_records_single_entry() {
        let scheduler =
            ReminderScheduler::new(InMemoryNotificationCenter::new(AuthorizationPolicy::GrantOnRequest));
        let id = Uuid::new_v4();

        assert_eq!(scheduler.schedule_reminder(id, 9_000, &content()), Ok(true));
        assert_eq!(scheduler.scheduled_time(id), Some(9_000));
        assert_eq!(scheduler.gateway().scheduled_time(id), Some(9_000));
        assert_eq!(scheduler.gateway().scheduled_count(), 1);
    }

    #[test]
    fn denied_authorization_leaves_registry_empty() {
        let scheduler =
            ReminderScheduler::new(InMemoryNotificationCenter::new(AuthorizationPolicy::DenyOnRequest));
        let id = Uuid::new_v4();

        let err = scheduler.schedule_reminder(id, 9_000, &content()).unwrap_err();
        assert_eq!(err, ReminderError::AuthorizationDenied);
        assert!(!scheduler.is_scheduled(id));
        assert_eq!(scheduler.gateway().scheduled_count(), 0);
    }

    #[test]
    fn platform_failure_is_reported_and_nothing_is_recorded() {
        let scheduler = ReminderScheduler::new(BrokenGateway);
        let id = Uuid::new_v4();

        let err = scheduler.schedule_reminder(id, 9_000, &content()).unwrap_err();
        assert!(matches!(err, ReminderError::SchedulingFailed(_)));
        assert!(!scheduler.is_scheduled(id));
    }

    #[test]
    fn cancel_without_schedule_is_a_noop() {
        let scheduler =
            ReminderScheduler::new(InMemoryNotificationCenter::new(AuthorizationPolicy::AlreadyGranted));
        let id = Uuid::new_v4();
        scheduler.cancel_reminder(id);
        assert!(!scheduler.is_scheduled(id));
    }

    #[test]
    fn stale_completion_is_discarded_and_unregisters_entry() {
        let scheduler =
            ReminderScheduler::new(InMemoryNotificationCenter::new(AuthorizationPolicy::AlreadyGranted));
        let id = Uuid::new_v4();

        let ticket = scheduler.begin_schedule(id, 9_000);
        scheduler.gateway().schedule(id, 9_000, &content()).unwrap();
        // The reminder is disabled while the platform call is in flight.
        scheduler.cancel_reminder(id);

        assert!(!scheduler.commit_schedule(&ticket));
        assert!(!scheduler.is_scheduled(id));
        assert_eq!(scheduler.gateway().scheduled_count(), 0);
    }

    #[test]
    fn reschedule_replaces_previous_time() {
        let scheduler =
            ReminderScheduler::new(InMemoryNotificationCenter::new(AuthorizationPolicy::AlreadyGranted));
        let id = Uuid::new_v4();

        scheduler.schedule_reminder(id, 10_000, &content()).unwrap();
        scheduler.schedule_reminder(id, 11_000, &content()).unwrap();

        assert_eq!(scheduler.scheduled_time(id), Some(11_000));
        assert_eq!(scheduler.gateway().scheduled_time(id), Some(11_000));
        assert_eq!(scheduler.gateway().scheduled_count(), 1);
    }
}
