//! Process-wide default queue.

use std::sync::OnceLock;

use super::DEFAULT_CONCURRENCY_LIMIT;
use super::dispatch::DispatchQueue;

static SHARED: OnceLock<DispatchQueue> = OnceLock::new();

impl DispatchQueue {
    /// The shared queue: created on first access, then the same instance for
    /// the rest of the process. Concurrency limit 3, default reqwest
    /// transport, retries at the back.
    ///
    /// Use your own instance when requests must not wait behind other users
    /// of the shared one.
    pub fn shared() -> &'static DispatchQueue {
        SHARED.get_or_init(|| DispatchQueue::new(DEFAULT_CONCURRENCY_LIMIT))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queue::RequeuePosition;

    #[test]
    fn shared_queue_is_created_once() {
        let first = DispatchQueue::shared();
        let second = DispatchQueue::shared();

        assert!(std::ptr::eq(first, second));
        assert!(first.shares_state_with(second));
        assert_eq!(first.concurrency_limit(), DEFAULT_CONCURRENCY_LIMIT);
        assert_eq!(first.requeue_position(), RequeuePosition::Back);
    }

    #[test]
    fn shared_queue_is_distinct_from_new_instances() {
        let own = DispatchQueue::new(1);
        assert!(!own.shares_state_with(DispatchQueue::shared()));
    }
}
