//! IdGenerator port - ID 生成の抽象化
//!
//! # 実装
//! - **UlidGenerator**: ULID ベース（本番用）

use crate::domain::ids::{QueueId, TaskId};
use crate::ports::Clock;
use ulid::Ulid;

/// IdGenerator は task / queue の ID を生成
///
/// # Thread Safety
/// - `Send + Sync` を要求（submit は複数スレッドから呼ばれる）
pub trait IdGenerator: Send + Sync {
    fn generate_task_id(&self) -> TaskId;

    fn generate_queue_id(&self) -> QueueId;
}

/// UlidGenerator は ULID ベースの ID 生成器
///
/// Clock を使って timestamp 部分を決めるので、FixedClock を渡せば
/// timestamp 部分が決定的になる（ランダム部分は `rand` から）。
pub struct UlidGenerator<C> {
    clock: C,
}

impl<C: Clock> UlidGenerator<C> {
    pub fn new(clock: C) -> Self {
        Self { clock }
    }

    fn next_ulid(&self) -> Ulid {
        let timestamp_ms = self.clock.now().timestamp_millis().max(0) as u64;
        Ulid::from_parts(timestamp_ms, rand::random())
    }
}

impl<C: Clock> IdGenerator for UlidGenerator<C> {
    fn generate_task_id(&self) -> TaskId {
        TaskId::from(self.next_ulid())
    }

    fn generate_queue_id(&self) -> QueueId {
        QueueId::from(self.next_ulid())
    }
}
