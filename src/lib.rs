//! Task reminder and persistence core.
//!
//! This crate is the headless core of a task-management application. It
//! owns the task editing state, coalesces field edits into debounced
//! saves, and keeps at most one scheduled local reminder per task. The
//! presentation layer (form editor, alerts, navigation) lives elsewhere
//! and consumes the services exposed here.

pub mod db;
pub mod logging;
pub mod model;
pub mod notify;
pub mod repo;
pub mod service;

pub use logging::{default_log_level, init_logging, logging_status};
pub use model::task::{ChangedField, Task, TaskChange, TaskField, TaskId, TaskStatus};
pub use notify::{
    AuthorizationPolicy, InMemoryNotificationCenter, NotificationContent, NotificationGateway,
    NotifyError,
};
pub use repo::task_repo::{
    RepoError, RepoResult, SqliteTaskRepository, TaskListQuery, TaskRepository,
};
pub use service::reminder::{ReminderError, ReminderScheduler, ScheduleTicket};
pub use service::save::{
    FlushReport, PersistenceError, SaveCoordinator, DEFAULT_DEBOUNCE_WINDOW,
};
pub use service::session::{EditOutcome, ReminderSync, SessionError, TaskEditSession};
pub use service::store::{StoreError, TaskStore};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::core_version;

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
