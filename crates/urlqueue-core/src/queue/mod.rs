//! Queue module: configuration, task bookkeeping, and the dispatch engine.

mod builder;
mod config;
mod dispatch;
mod handle;
mod record;
mod shared;

pub use builder::DispatchQueueBuilder;
pub use config::{
    DEFAULT_CONCURRENCY_LIMIT, ENV_CONCURRENCY_LIMIT, ENV_REQUEUE, QueueConfig, RequeuePosition,
};
pub use dispatch::DispatchQueue;
pub use handle::TaskHandle;
pub use record::ProgressCallback;
