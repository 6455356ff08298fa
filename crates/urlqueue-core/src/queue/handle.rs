//! TaskHandle: read-only view of a submitted task.

use tokio::sync::watch;

use crate::domain::{TaskId, TaskSnapshot, TaskState};

/// Observation token returned by `submit`.
///
/// There is deliberately nothing here to start, cancel or retry the task:
/// only the queue drives it.
#[derive(Debug, Clone)]
pub struct TaskHandle {
    id: TaskId,
    status: watch::Receiver<TaskSnapshot>,
}

impl TaskHandle {
    pub(crate) fn new(id: TaskId, status: watch::Receiver<TaskSnapshot>) -> Self {
        Self { id, status }
    }

    pub fn id(&self) -> TaskId {
        self.id
    }

    pub fn state(&self) -> TaskState {
        self.status.borrow().state
    }

    pub fn attempts_made(&self) -> u32 {
        self.status.borrow().attempts_made
    }

    pub fn is_completed(&self) -> bool {
        self.state().is_terminal()
    }

    pub fn snapshot(&self) -> TaskSnapshot {
        self.status.borrow().clone()
    }

    /// Wait until the task is Completed and return its final snapshot.
    ///
    /// If the queue goes away first (runtime shutdown), returns the last
    /// published snapshot instead.
    pub async fn finished(&self) -> TaskSnapshot {
        let mut rx = self.status.clone();
        if let Ok(snapshot) = rx.wait_for(TaskSnapshot::is_completed).await {
            return snapshot.clone();
        }
        rx.borrow().clone()
    }
}
