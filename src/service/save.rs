//! Save coordinator: debounced, serialized persistence of edited tasks.
//!
//! # Responsibility
//! - Coalesce rapid pending-save requests into one flush per debounce
//!   window.
//! - Serialize flushes so two callers never write the store concurrently.
//! - Preserve pending state across failed flushes so no edit is silently
//!   lost.
//!
//! # Invariants
//! - `queue_save` is idempotent per task id.
//! - The first queued save opens the debounce window; later queues inside
//!   the window do not extend the deadline.
//! - A task leaves the pending set only after its row was written.

use crate::model::task::TaskId;
use crate::repo::task_repo::{RepoError, TaskRepository};
use crate::service::store::TaskStore;
use log::{error, info};
use std::collections::BTreeSet;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// Default debounce window between the first queued save and its flush.
pub const DEFAULT_DEBOUNCE_WINDOW: Duration = Duration::from_secs(3);

/// Flush failure carrying the task that could not be persisted.
///
/// The tasks queued behind the failing one stay pending; the next flush
/// retries them together with the failed task.
#[derive(Debug)]
pub struct PersistenceError {
    /// The task whose write failed.
    pub task_id: TaskId,
    /// Underlying repository failure.
    pub source: RepoError,
}

impl Display for PersistenceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "failed to persist task {}: {}", self.task_id, self.source)
    }
}

impl Error for PersistenceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        Some(&self.source)
    }
}

/// Summary of one completed flush.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlushReport {
    /// Tasks written to storage.
    pub saved: usize,
    /// Pending ids dropped because the store no longer tracks them.
    pub skipped: usize,
}

struct PendingState {
    tasks: BTreeSet<TaskId>,
    deadline: Option<Instant>,
}

/// Debounced save coordinator.
///
/// Interior mutability keeps `queue_save` cheap for callers holding only
/// a shared reference; the dedicated flush gate is the sole mutual
/// exclusion guarding writes to the underlying store.
pub struct SaveCoordinator {
    window: Duration,
    pending: Mutex<PendingState>,
    flush_gate: Mutex<()>,
}

impl SaveCoordinator {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            pending: Mutex::new(PendingState {
                tasks: BTreeSet::new(),
                deadline: None,
            }),
            flush_gate: Mutex::new(()),
        }
    }

    /// Records a pending save for the task.
    ///
    /// Idempotent: repeated calls within one debounce window collapse
    /// into a single flush covering the task.
    pub fn queue_save(&self, id: TaskId) {
        let mut state = self.pending.lock().expect("save coordinator lock poisoned");
        state.tasks.insert(id);
        if state.deadline.is_none() {
            state.deadline = Some(Instant::now() + self.window);
        }
    }

    /// Returns whether the debounce window has elapsed for pending saves.
    pub fn flush_due(&self, now: Instant) -> bool {
        let state = self.pending.lock().expect("save coordinator lock poisoned");
        state.deadline.is_some_and(|deadline| now >= deadline)
    }

    /// Returns the ids currently awaiting persistence.
    pub fn pending(&self) -> Vec<TaskId> {
        let state = self.pending.lock().expect("save coordinator lock poisoned");
        state.tasks.iter().copied().collect()
    }

    pub fn has_pending(&self) -> bool {
        let state = self.pending.lock().expect("save coordinator lock poisoned");
        !state.tasks.is_empty()
    }

    /// Persists every pending task through the repository.
    ///
    /// Flushes are serialized: a second caller blocks on the flush gate
    /// until the first completes. Tasks are upserted: a pending task the
    /// repository has never seen is created rather than rejected. On the
    /// first write failure the flush stops; the failed task and everything
    /// after it stay pending for retry.
    pub fn flush<R: TaskRepository>(
        &self,
        store: &TaskStore,
        repo: &R,
    ) -> Result<FlushReport, PersistenceError> {
        let _gate = self.flush_gate.lock().expect("flush gate poisoned");

        let snapshot: Vec<TaskId> = {
            let state = self.pending.lock().expect("save coordinator lock poisoned");
            state.tasks.iter().copied().collect()
        };

        let mut report = FlushReport {
            saved: 0,
            skipped: 0,
        };

        for id in snapshot {
            let Some(task) = store.get(id) else {
                // The store dropped the task; nothing left to persist.
                self.forget(id);
                report.skipped += 1;
                continue;
            };

            let write = match repo.save_task(task) {
                Err(RepoError::NotFound(_)) => repo.create_task(task).map(|_| ()),
                other => other,
            };

            if let Err(source) = write {
                error!(
                    "event=save_flush module=save status=error task_id={id} saved={} error={source}",
                    report.saved
                );
                return Err(PersistenceError {
                    task_id: id,
                    source,
                });
            }

            self.forget(id);
            report.saved += 1;
        }

        info!(
            "event=save_flush module=save status=ok saved={} skipped={}",
            report.saved, report.skipped
        );
        Ok(report)
    }

    fn forget(&self, id: TaskId) {
        let mut state = self.pending.lock().expect("save coordinator lock poisoned");
        state.tasks.remove(&id);
        if state.tasks.is_empty() {
            state.deadline = None;
        }
    }
}

impl Default for SaveCoordinator {
    fn default() -> Self {
        Self::new(DEFAULT_DEBOUNCE_WINDOW)
    }
}
