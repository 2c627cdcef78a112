// admin_ws_client/src/client/mod.rs

//! WebSocket 客户端模块。
//!
//! 主要职责包括：
//! - **传输层抽象** (`transport`): `Connector` / `Transport` 两个 trait 封装底层 WebSocket 库，
//!   生产实现基于 `tokio-tungstenite`，测试中可以替换为脚本化实现。
//! - **出站队列** (`queue`): 连接未打开时暂存待发送的消息，有容量上限。
//! - **分发表** (`dispatch`): 按消息类型 (以及通配类型 `*`) 把入站消息分发给订阅者。
//! - **会话** (`session`): 认证标记与持久化凭证。
//! - **连接监管** (`supervisor`): 连接状态机与固定延迟的自动重连。
//! - **客户端服务** (`service`): 组合以上组件，对 UI 协作方暴露的唯一入口。

pub mod dispatch;
pub mod queue;
pub mod service;
pub mod session;
pub mod supervisor;
pub mod transport;

#[cfg(test)]
pub(crate) mod mock;

pub use dispatch::{MessageHandler, Subscription};
pub use service::WebSocketClientService;
pub use session::{CredentialStore, FileCredentialStore, MemoryCredentialStore, CREDENTIAL_STORAGE_KEY};
pub use supervisor::{ConnectionHandler, ConnectionState};
pub use transport::{Connector, Transport, TransportEvent, TungsteniteConnector};
