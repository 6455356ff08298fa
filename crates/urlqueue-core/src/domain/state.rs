//! Task state machine.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ids::TaskId;

/// Task state.
///
/// State transitions:
/// - Pending -> Active -> Completed
/// - Pending -> Active -> Pending (failed attempt, attempts remain)
///
/// There is no separate "retrying" state: a retried task sits in the backlog
/// exactly like a fresh one, only its attempt count differs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskState {
    /// Waiting in the backlog for a free slot.
    Pending,

    /// Handed to the transport; one attempt in flight.
    Active,

    /// Finished, successfully or not. No further transitions.
    Completed,
}

impl TaskState {
    pub fn is_terminal(self) -> bool {
        matches!(self, TaskState::Completed)
    }
}

/// How a completed task ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskOutcome {
    Succeeded,
    /// Every permitted attempt failed.
    Failed,
}

/// Read-only view of a task, published by the queue on every transition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskSnapshot {
    pub id: TaskId,
    pub state: TaskState,
    pub attempts_made: u32,
    pub outcome: Option<TaskOutcome>,
    pub last_error: Option<String>,
    pub submitted_at: DateTime<Utc>,
}

impl TaskSnapshot {
    pub(crate) fn new(id: TaskId, submitted_at: DateTime<Utc>) -> Self {
        Self {
            id,
            state: TaskState::Pending,
            attempts_made: 0,
            outcome: None,
            last_error: None,
            submitted_at,
        }
    }

    pub fn is_completed(&self) -> bool {
        self.state.is_terminal()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_completed_is_terminal() {
        assert!(!TaskState::Pending.is_terminal());
        assert!(!TaskState::Active.is_terminal());
        assert!(TaskState::Completed.is_terminal());
    }

    #[test]
    fn snapshot_serializes_with_snake_case_state() {
        let snapshot = TaskSnapshot::new(TaskId::from_ulid(ulid::Ulid::new()), Utc::now());

        let json = serde_json::to_value(&snapshot).unwrap();
        assert_eq!(json["state"], "pending");
        assert_eq!(json["attempts_made"], 0);
        assert!(json["outcome"].is_null());
    }
}
