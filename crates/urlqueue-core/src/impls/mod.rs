//! Impls - Transport の実装
//!
//! - ReqwestTransport: reqwest 経由で実際に HTTP を送る
//! - ScriptedTransport: 開発・テスト用（ネットワーク不要）

pub mod reqwest_transport;
pub mod scripted_transport;

pub use reqwest_transport::{ReqwestTransport, ReqwestTransportConfig};
pub use scripted_transport::ScriptedTransport;
