//! urlqueue-core
//!
//! Bounded-concurrency HTTP request dispatcher.
//!
//! Requests are submitted faster than they should be sent; the queue releases
//! them to a [`ports::Transport`] no faster than its concurrency limit, in
//! strict submission order, retrying failed attempts up to a per-task bound.
//!
//! # モジュール構成
//! - **domain**: ドメインモデル（ids, request, response, state, attempts, errors）
//! - **ports**: 抽象化レイヤー（Transport, Clock, IdGenerator）
//! - **queue**: DispatchQueue 本体（backlog, admission, retry, TaskHandle）
//! - **impls**: Transport 実装（ReqwestTransport, ScriptedTransport）
//! - **observability**: QueueCounts

pub mod domain;
pub mod impls;
pub mod observability;
pub mod ports;
pub mod queue;

pub use domain::{AttemptLimit, AttemptReport, Payload, RequestDescriptor, TaskId};
pub use observability::QueueCounts;
pub use queue::{DispatchQueue, QueueConfig, RequeuePosition, TaskHandle};

// request / response types are reqwest's (= http's)
pub use reqwest::{Method, StatusCode, Url};
