//! DispatchQueueBuilder - queue の構築とワイヤリング
//!
//! ```ignore
//! let queue = DispatchQueue::builder()
//!     .concurrency_limit(1)
//!     .requeue(RequeuePosition::Front)
//!     .transport(Arc::new(ReqwestTransport::default()))
//!     .build();
//! ```

use std::sync::Arc;

use super::dispatch::{DispatchQueue, Inner};
use super::{QueueConfig, RequeuePosition};
use crate::impls::ReqwestTransport;
use crate::ports::{Clock, IdGenerator, SystemClock, Transport, UlidGenerator};

/// Collects the queue's fixed configuration. Anything left unset falls back
/// to `QueueConfig::default()`, a default `ReqwestTransport` and the system
/// clock.
#[derive(Default)]
pub struct DispatchQueueBuilder {
    config: QueueConfig,
    transport: Option<Arc<dyn Transport>>,
    clock: Option<Arc<dyn Clock>>,
}

impl DispatchQueueBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace limit and requeue position at once.
    pub fn config(mut self, config: QueueConfig) -> Self {
        self.config = config;
        self
    }

    /// `0` means unbounded.
    pub fn concurrency_limit(mut self, limit: usize) -> Self {
        self.config.concurrency_limit = limit;
        self
    }

    pub fn requeue(mut self, position: RequeuePosition) -> Self {
        self.config.requeue = position;
        self
    }

    pub fn transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Clock used for submission timestamps and task id timestamps.
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    pub fn build(self) -> DispatchQueue {
        let transport = self
            .transport
            .unwrap_or_else(|| Arc::new(ReqwestTransport::default()));
        let clock = self.clock.unwrap_or_else(|| Arc::new(SystemClock));
        let ids: Arc<dyn IdGenerator> = Arc::new(UlidGenerator::new(Arc::clone(&clock)));

        DispatchQueue::from_inner(Inner::new(
            self.config.concurrency_limit,
            self.config.requeue,
            transport,
            clock,
            ids,
        ))
    }
}

impl DispatchQueue {
    pub fn builder() -> DispatchQueueBuilder {
        DispatchQueueBuilder::new()
    }

    /// Queue with the default reqwest transport.
    pub fn new(concurrency_limit: usize) -> Self {
        Self::builder().concurrency_limit(concurrency_limit).build()
    }

    pub fn with_transport(concurrency_limit: usize, transport: Arc<dyn Transport>) -> Self {
        Self::builder()
            .concurrency_limit(concurrency_limit)
            .transport(transport)
            .build()
    }

    pub fn from_config(config: QueueConfig, transport: Arc<dyn Transport>) -> Self {
        Self::builder().config(config).transport(transport).build()
    }
}
