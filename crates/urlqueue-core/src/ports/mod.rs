//! Ports - 抽象化レイヤー
//!
//! 外部の協力者 (HTTP transport, 時計, ID 採番) へのインターフェース。
//! The dispatch queue only ever talks to these traits.

pub mod clock;
pub mod id_generator;
pub mod transport;

pub use self::clock::{Clock, FixedClock, SystemClock};
pub use self::id_generator::{IdGenerator, UlidGenerator};
pub use self::transport::Transport;
