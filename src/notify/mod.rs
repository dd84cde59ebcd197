//! Notification platform gateway.
//!
//! # Responsibility
//! - Define the contract the reminder scheduler uses to talk to the
//!   platform notification service (authorization, registration,
//!   cancellation, settings deep link).
//! - Provide an in-memory notification center usable as the reference
//!   registry and as the test double.
//!
//! # Invariants
//! - The registry holds at most one entry per task id.
//! - Gateway failures are returned as values; nothing here panics or
//!   terminates the process.
//!
//! The real platform bridge (e.g. a mobile shell's notification API) is
//! registered by the embedding application behind [`NotificationGateway`].

use crate::model::task::TaskId;
use std::collections::HashMap;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::Mutex;

/// User-visible payload for a scheduled reminder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationContent {
    /// Notification title, usually the task title.
    pub title: String,
    /// Notification body, usually the task description or a fixed prompt.
    pub body: String,
}

/// Gateway failure reported by platform calls.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotifyError {
    /// The platform could not answer the authorization request at all.
    AuthorizationUnavailable(String),
    /// Registration or cancellation failed inside the platform service.
    Platform(String),
}

impl Display for NotifyError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::AuthorizationUnavailable(message) => {
                write!(f, "notification authorization unavailable: {message}")
            }
            Self::Platform(message) => write!(f, "notification platform error: {message}"),
        }
    }
}

impl Error for NotifyError {}

/// Contract to the process-wide notification service.
pub trait NotificationGateway {
    /// Requests permission to post notifications.
    ///
    /// Returns `Ok(true)` when granted, `Ok(false)` when the user denied
    /// the request, and an error when the platform could not answer.
    /// Implementations must treat repeated calls as idempotent once a
    /// decision exists.
    fn request_authorization(&self) -> Result<bool, NotifyError>;

    /// Registers a notification for the task at the given instant,
    /// replacing any previous entry for the same id.
    fn schedule(
        &self,
        task_id: TaskId,
        fire_at_ms: i64,
        content: &NotificationContent,
    ) -> Result<(), NotifyError>;

    /// Removes any registered entry for the task. Safe to call when no
    /// entry exists.
    fn cancel(&self, task_id: TaskId);

    /// Deep link into the system notification settings, when the
    /// platform exposes one.
    fn settings_url(&self) -> Option<String> {
        None
    }
}

impl<G: NotificationGateway + ?Sized> NotificationGateway for &G {
    fn request_authorization(&self) -> Result<bool, NotifyError> {
        (**self).request_authorization()
    }

    fn schedule(
        &self,
        task_id: TaskId,
        fire_at_ms: i64,
        content: &NotificationContent,
    ) -> Result<(), NotifyError> {
        (**self).schedule(task_id, fire_at_ms, content)
    }

    fn cancel(&self, task_id: TaskId) {
        (**self).cancel(task_id)
    }

    fn settings_url(&self) -> Option<String> {
        (**self).settings_url()
    }
}

impl<G: NotificationGateway + ?Sized> NotificationGateway for std::sync::Arc<G> {
    fn request_authorization(&self) -> Result<bool, NotifyError> {
        (**self).request_authorization()
    }

    fn schedule(
        &self,
        task_id: TaskId,
        fire_at_ms: i64,
        content: &NotificationContent,
    ) -> Result<(), NotifyError> {
        (**self).schedule(task_id, fire_at_ms, content)
    }

    fn cancel(&self, task_id: TaskId) {
        (**self).cancel(task_id)
    }

    fn settings_url(&self) -> Option<String> {
        (**self).settings_url()
    }
}

/// How the in-memory center answers authorization requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthorizationPolicy {
    /// First request flips state to granted.
    GrantOnRequest,
    /// First request flips state to denied.
    DenyOnRequest,
    /// Authorization was granted out-of-band before the session started.
    AlreadyGranted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AuthorizationState {
    NotDetermined,
    Granted,
    Denied,
}

struct CenterState {
    authorization: AuthorizationState,
    scheduled: HashMap<TaskId, (i64, NotificationContent)>,
}

/// In-memory notification center.
///
/// Serves as the reference gateway implementation and as the registry
/// assertions target in tests. State lives behind a mutex because the
/// notification registry is a process-wide shared resource.
pub struct InMemoryNotificationCenter {
    policy: AuthorizationPolicy,
    state: Mutex<CenterState>,
}

impl InMemoryNotificationCenter {
    pub fn new(policy: AuthorizationPolicy) -> Self {
        let authorization = match policy {
            AuthorizationPolicy::AlreadyGranted => AuthorizationState::Granted,
            _ => AuthorizationState::NotDetermined,
        };
        Self {
            policy,
            state: Mutex::new(CenterState {
                authorization,
                scheduled: HashMap::new(),
            }),
        }
    }

    /// Returns the registered fire instant for the task, when present.
    pub fn scheduled_time(&self, task_id: TaskId) -> Option<i64> {
        let state = self.state.lock().expect("notification center lock poisoned");
        state.scheduled.get(&task_id).map(|(at, _)| *at)
    }

    /// Returns the number of registered entries.
    pub fn scheduled_count(&self) -> usize {
        let state = self.state.lock().expect("notification center lock poisoned");
        state.scheduled.len()
    }
}

impl NotificationGateway for InMemoryNotificationCenter {
    fn request_authorization(&self) -> Result<bool, NotifyError> {
        let mut state = self.state.lock().expect("notification center lock poisoned");
        match state.authorization {
            AuthorizationState::Granted => Ok(true),
            AuthorizationState::Denied => Ok(false),
            AuthorizationState::NotDetermined => {
                state.authorization = match self.policy {
                    AuthorizationPolicy::DenyOnRequest => AuthorizationState::Denied,
                    _ => AuthorizationState::Granted,
                };
                Ok(state.authorization == AuthorizationState::Granted)
            }
        }
    }

    fn schedule(
        &self,
        task_id: TaskId,
        fire_at_ms: i64,
        content: &NotificationContent,
    ) -> Result<(), NotifyError> {
        let mut state = self.state.lock().expect("notification center lock poisoned");
        if state.authorization != AuthorizationState::Granted {
            return Err(NotifyError::Platform(
                "notifications are not authorized".to_string(),
            ));
        }
        state
            .scheduled
            .insert(task_id, (fire_at_ms, content.clone()));
        Ok(())
    }

    fn cancel(&self, task_id: TaskId) {
        let mut state = self.state.lock().expect("notification center lock poisoned");
        state.scheduled.remove(&task_id);
    }

    fn settings_url(&self) -> Option<String> {
        Some("app-settings:notifications".to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::{
        AuthorizationPolicy, InMemoryNotificationCenter, NotificationContent, NotificationGateway,
        NotifyError,
    };
    use uuid::Uuid;

    fn content() -> NotificationContent {
        NotificationContent {
            title: "t".to_string(),
            body: "b".to_string(),
        }
    }

    #[test]
    fn authorization_decision_is_sticky() {
        let center = InMemoryNotificationCenter::new(AuthorizationPolicy::DenyOnRequest);
        assert_eq!(center.request_authorization(), Ok(false));
        assert_eq!(center.request_authorization(), Ok(false));
    }

    #[test]
    fn schedule_replaces_existing_entry_for_same_task() {
        let center = InMemoryNotificationCenter::new(AuthorizationPolicy::AlreadyGranted);
        let id = Uuid::new_v4();

        center.schedule(id, 1_000, &content()).unwrap();
        center.schedule(id, 2_000, &content()).unwrap();

        assert_eq!(center.scheduled_count(), 1);
        assert_eq!(center.scheduled_time(id), Some(2_000));
    }

    #[test]
    fn schedule_without_authorization_is_rejected() {
        let center = InMemoryNotificationCenter::new(AuthorizationPolicy::GrantOnRequest);
        let err = center.schedule(Uuid::new_v4(), 1_000, &content()).unwrap_err();
        assert!(matches!(err, NotifyError::Platform(_)));
    }

    #[test]
    fn cancel_without_entry_is_a_noop() {
        let center = InMemoryNotificationCenter::new(AuthorizationPolicy::AlreadyGranted);
        center.cancel(Uuid::new_v4());
        assert_eq!(center.scheduled_count(), 0);
    }
}
