use serde::{Deserialize, Serialize};

/// One consistent snapshot of a queue's counters.
///
/// `total == pending + completed` and `pending == active + backlog`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueCounts {
    /// Not yet completed (backlog + active).
    pub pending: usize,
    pub active: usize,
    pub backlog: usize,
    pub completed: usize,
    /// Ever submitted.
    pub total: usize,
}
