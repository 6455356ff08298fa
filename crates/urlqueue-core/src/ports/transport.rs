//! Transport port - 1 回の HTTP 実行の抽象化
//!
//! # 実装
//! - **ReqwestTransport**: reqwest::Client（本番用）
//! - **ScriptedTransport**: 台本どおりに成功/失敗する（開発・テスト用）

use async_trait::async_trait;

use crate::domain::{Completion, Payload};

/// Executes exactly one request (or upload) and reports how it went.
///
/// Implementations must not enforce a concurrency limit of their own and must
/// not retry; both are the dispatch queue's job. Every call yields exactly one
/// `Completion`, failures included, so there is no `Result` here.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn execute(&self, payload: &Payload) -> Completion;
}
