//! Task record: payload + retry bookkeeping + callback.

use std::panic::{AssertUnwindSafe, catch_unwind};

use chrono::{DateTime, Utc};
use tokio::sync::watch;
use tracing::error;

use super::TaskHandle;
use crate::domain::{
    AttemptLimit, AttemptReport, Completion, Payload, TaskId, TaskOutcome, TaskSnapshot, TaskState,
};

/// Caller's per-attempt notification.
pub type ProgressCallback = Box<dyn FnMut(AttemptReport) + Send + 'static>;

/// One submitted task, owned by the queue.
///
/// - While Pending it lives in the backlog.
/// - While Active it is moved into the spawned attempt.
/// - Once Completed it is dropped.
///
/// Every transition is published to the task's handle.
pub(crate) struct TaskRecord {
    pub(crate) id: TaskId,
    pub(crate) payload: Payload,
    pub(crate) limit: AttemptLimit,
    pub(crate) attempts_made: u32,
    state: TaskState,
    on_progress: ProgressCallback,
    status: watch::Sender<TaskSnapshot>,
}

impl TaskRecord {
    pub(crate) fn new(
        id: TaskId,
        payload: Payload,
        limit: AttemptLimit,
        on_progress: ProgressCallback,
        submitted_at: DateTime<Utc>,
    ) -> (Self, TaskHandle) {
        let (status, rx) = watch::channel(TaskSnapshot::new(id, submitted_at));
        let record = Self {
            id,
            payload,
            limit,
            attempts_made: 0,
            state: TaskState::Pending,
            on_progress,
            status,
        };
        (record, TaskHandle::new(id, rx))
    }

    /// Pending -> Active. Counts the attempt.
    pub(crate) fn start_attempt(&mut self) {
        debug_assert_eq!(self.state, TaskState::Pending);
        self.state = TaskState::Active;
        self.attempts_made = self.attempts_made.saturating_add(1);
        let attempts_made = self.attempts_made;
        self.status.send_modify(|s| {
            s.state = TaskState::Active;
            s.attempts_made = attempts_made;
        });
    }

    /// Would a failure of the current attempt be retried?
    pub(crate) fn can_retry(&self) -> bool {
        self.limit.permits_another(self.attempts_made)
    }

    /// Active -> Pending after a failed attempt.
    pub(crate) fn requeue(&mut self, error: Option<String>) {
        debug_assert_eq!(self.state, TaskState::Active);
        self.state = TaskState::Pending;
        self.status.send_modify(|s| {
            s.state = TaskState::Pending;
            s.last_error = error;
        });
    }

    /// Active -> Completed.
    pub(crate) fn complete(&mut self, outcome: TaskOutcome, error: Option<String>) {
        debug_assert_eq!(self.state, TaskState::Active);
        self.state = TaskState::Completed;
        self.status.send_modify(|s| {
            s.state = TaskState::Completed;
            s.outcome = Some(outcome);
            if error.is_some() {
                s.last_error = error;
            }
        });
    }

    /// Hand the attempt's result to the caller.
    ///
    /// A panicking callback is logged and otherwise ignored so the task's
    /// slot is still released.
    pub(crate) fn notify(&mut self, completion: Completion, retrying: bool) {
        let report = AttemptReport::new(self.id, self.attempts_made, completion, retrying);
        let callback = &mut self.on_progress;
        if catch_unwind(AssertUnwindSafe(|| callback(report))).is_err() {
            error!(task_id = %self.id, attempt = self.attempts_made, "progress callback panicked");
        }
    }
}
