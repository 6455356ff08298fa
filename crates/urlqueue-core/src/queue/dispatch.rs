//! Dispatch queue: FIFO backlog, admission gate, retry bookkeeping.

use std::any::Any;
use std::collections::VecDeque;
use std::panic::AssertUnwindSafe;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use bytes::Bytes;
use futures::FutureExt;
use tracing::{debug, error, info, warn};

use super::record::TaskRecord;
use super::{RequeuePosition, TaskHandle};
use crate::domain::{
    AttemptLimit, AttemptReport, Completion, Payload, QueueId, RequestDescriptor, TaskOutcome,
    TransportError,
};
use crate::observability::QueueCounts;
use crate::ports::{Clock, IdGenerator, Transport};

/// Everything submission, dispatch and completion contend for.
///
/// Always touched under one lock; the invariants below hold whenever the lock
/// is released:
/// - `active <= limit` (unless `limit == 0`)
/// - `submitted == active + backlog.len() + completed`
/// - backlog non-empty implies no free slot
struct QueueState {
    backlog: VecDeque<TaskRecord>,
    active: usize,
    submitted: usize,
    completed: usize,
}

impl QueueState {
    fn new() -> Self {
        Self {
            backlog: VecDeque::new(),
            active: 0,
            submitted: 0,
            completed: 0,
        }
    }

    fn has_free_slot(&self, limit: usize) -> bool {
        limit == 0 || self.active < limit
    }

    /// Pop backlog heads into free slots. The caller launches them after the
    /// lock is released.
    fn take_ready(&mut self, limit: usize) -> Vec<TaskRecord> {
        let mut ready = Vec::new();
        while self.has_free_slot(limit)
            && let Some(mut record) = self.backlog.pop_front()
        {
            record.start_attempt();
            self.active += 1;
            ready.push(record);
        }
        ready
    }

    fn counts(&self) -> QueueCounts {
        QueueCounts {
            pending: self.submitted - self.completed,
            active: self.active,
            backlog: self.backlog.len(),
            completed: self.completed,
            total: self.submitted,
        }
    }
}

pub(crate) struct Inner {
    id: QueueId,
    limit: usize,
    requeue: RequeuePosition,
    transport: Arc<dyn Transport>,
    clock: Arc<dyn Clock>,
    ids: Arc<dyn IdGenerator>,
    state: Mutex<QueueState>,
}

impl Inner {
    pub(crate) fn new(
        limit: usize,
        requeue: RequeuePosition,
        transport: Arc<dyn Transport>,
        clock: Arc<dyn Clock>,
        ids: Arc<dyn IdGenerator>,
    ) -> Self {
        Self {
            id: ids.generate_queue_id(),
            limit,
            requeue,
            transport,
            clock,
            ids,
            state: Mutex::new(QueueState::new()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, QueueState> {
        // callbacks never run under this lock, so poisoning can't leave
        // the counters half-updated
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Hand each record to the transport on its own task.
    fn launch(self: &Arc<Self>, ready: Vec<TaskRecord>) {
        for record in ready {
            debug!(
                queue_id = %self.id,
                task_id = %record.id,
                attempt = record.attempts_made,
                kind = %record.payload.kind(),
                url = %record.payload.request().url(),
                "dispatching attempt"
            );
            let inner = Arc::clone(self);
            tokio::spawn(async move {
                let completion = AssertUnwindSafe(inner.transport.execute(&record.payload))
                    .catch_unwind()
                    .await
                    .unwrap_or_else(|panic| {
                        let message = panic_message(panic.as_ref());
                        error!(
                            queue_id = %inner.id,
                            task_id = %record.id,
                            attempt = record.attempts_made,
                            panic = %message,
                            "transport panicked"
                        );
                        Completion::failure(TransportError::Other(format!(
                            "transport panicked: {message}"
                        )))
                    });
                inner.finish_attempt(record, completion);
            });
        }
    }

    /// Runs once per dispatched attempt: tell the caller, then retry or
    /// finalize, then refill the freed slot.
    fn finish_attempt(self: &Arc<Self>, mut record: TaskRecord, completion: Completion) {
        let succeeded = completion.is_success();
        let retrying = !succeeded && record.can_retry();
        let error = completion.error.as_ref().map(ToString::to_string);

        if let Some(err) = &error {
            warn!(
                queue_id = %self.id,
                task_id = %record.id,
                attempt = record.attempts_made,
                max_attempts = %record.limit,
                retrying,
                error = %err,
                "attempt failed"
            );
        }

        record.notify(completion, retrying);

        let (ready, finished) = {
            let mut state = self.lock();
            state.active -= 1;

            let finished = if retrying {
                record.requeue(error);
                match self.requeue {
                    RequeuePosition::Back => state.backlog.push_back(record),
                    RequeuePosition::Front => state.backlog.push_front(record),
                }
                None
            } else {
                let outcome = if succeeded {
                    TaskOutcome::Succeeded
                } else {
                    TaskOutcome::Failed
                };
                record.complete(outcome, error);
                state.completed += 1;
                Some((record, outcome))
            };

            (state.take_ready(self.limit), finished)
        };

        if let Some((record, outcome)) = finished {
            info!(
                queue_id = %self.id,
                task_id = %record.id,
                attempts = record.attempts_made,
                ?outcome,
                "task completed"
            );
            // the caller's callback is dropped here, outside the lock
            drop(record);
        }

        self.launch(ready);
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(msg) = panic.downcast_ref::<&str>() {
        (*msg).to_string()
    } else if let Some(msg) = panic.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// Bounded-concurrency HTTP request dispatcher.
///
/// Cheap to clone; clones share one backlog and one set of counters.
///
/// ```ignore
/// let queue = DispatchQueue::new(2);
/// let request = RequestDescriptor::parse(Method::GET, "https://example.com/")?;
/// queue.submit_data(request, |report| println!("{:?}", report.status()), 3);
/// ```
#[derive(Clone)]
pub struct DispatchQueue {
    inner: Arc<Inner>,
}

impl DispatchQueue {
    pub(crate) fn from_inner(inner: Inner) -> Self {
        Self {
            inner: Arc::new(inner),
        }
    }

    /// Queue a task. Returns immediately.
    ///
    /// If a slot is free the first attempt is started right away on the
    /// current Tokio runtime; otherwise the task waits in the backlog.
    /// `on_progress` runs once per attempt, with `retrying` set when the task
    /// has gone back into the backlog. `max_attempts <= 0` retries until
    /// the transport reports success.
    ///
    /// The attempt keeps its slot until `on_progress` returns: inside the
    /// callback `is_busy()` is still true and the finishing task is not yet
    /// in `completed_count()`. Keep callbacks short.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn submit<F>(
        &self,
        payload: Payload,
        max_attempts: impl Into<AttemptLimit>,
        on_progress: F,
    ) -> TaskHandle
    where
        F: FnMut(AttemptReport) + Send + 'static,
    {
        let limit = max_attempts.into();
        let id = self.inner.ids.generate_task_id();
        let (record, handle) = TaskRecord::new(
            id,
            payload,
            limit,
            Box::new(on_progress),
            self.inner.clock.now(),
        );

        debug!(
            queue_id = %self.inner.id,
            task_id = %id,
            kind = %record.payload.kind(),
            max_attempts = %limit,
            "task submitted"
        );

        let ready = {
            let mut state = self.inner.lock();
            state.submitted += 1;
            state.backlog.push_back(record);
            state.take_ready(self.inner.limit)
        };
        self.inner.launch(ready);

        handle
    }

    pub fn submit_data<F>(
        &self,
        request: RequestDescriptor,
        on_progress: F,
        max_attempts: impl Into<AttemptLimit>,
    ) -> TaskHandle
    where
        F: FnMut(AttemptReport) + Send + 'static,
    {
        self.submit(Payload::data(request), max_attempts, on_progress)
    }

    pub fn submit_upload_file<F>(
        &self,
        request: RequestDescriptor,
        path: impl AsRef<Path>,
        on_progress: F,
        max_attempts: impl Into<AttemptLimit>,
    ) -> TaskHandle
    where
        F: FnMut(AttemptReport) + Send + 'static,
    {
        self.submit(Payload::upload_file(request, path), max_attempts, on_progress)
    }

    pub fn submit_upload_bytes<F>(
        &self,
        request: RequestDescriptor,
        data: impl Into<Bytes>,
        on_progress: F,
        max_attempts: impl Into<AttemptLimit>,
    ) -> TaskHandle
    where
        F: FnMut(AttemptReport) + Send + 'static,
    {
        self.submit(Payload::upload_bytes(request, data), max_attempts, on_progress)
    }

    /// Tasks not yet completed (backlog + active).
    pub fn pending_count(&self) -> usize {
        self.counts().pending
    }

    /// Every task ever submitted.
    pub fn total_count(&self) -> usize {
        self.counts().total
    }

    pub fn completed_count(&self) -> usize {
        self.counts().completed
    }

    /// At least one attempt is in flight.
    pub fn is_busy(&self) -> bool {
        self.counts().active > 0
    }

    pub fn counts(&self) -> QueueCounts {
        self.inner.lock().counts()
    }

    /// `0` means unbounded.
    pub fn concurrency_limit(&self) -> usize {
        self.inner.limit
    }

    pub fn requeue_position(&self) -> RequeuePosition {
        self.inner.requeue
    }

    pub fn id(&self) -> QueueId {
        self.inner.id
    }

    #[cfg(test)]
    pub(crate) fn shares_state_with(&self, other: &DispatchQueue) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl std::fmt::Debug for DispatchQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DispatchQueue")
            .field("id", &self.inner.id)
            .field("limit", &self.inner.limit)
            .field("requeue", &self.inner.requeue)
            .field("counts", &self.counts())
            .finish()
    }
}
