//! `admin_ws_client` 是管理后台使用的 WebSocket 客户端核心。
//!
//! 它负责与后台服务维持一条 WebSocket 连接：断线期间缓存出站消息、按消息类型分发入站消息、
//! 在异常断开后按固定延迟自动重连，并处理认证相关的副作用 (令牌持久化与认证标记)。
//!
//! 主要模块包括：
//! - `message`: 出站 / 入站消息的结构，如 `OutboundMessage` 与 `InboundFrame`。
//! - `error`: 库中使用的错误类型 `WsError`。
//! - `config`: 客户端配置 `ClientConfig`。
//! - `client`: 连接监管、分发表、出站队列与对外的 `WebSocketClientService`。

pub mod client;
pub mod config;
pub mod error;
pub mod message;

pub use client::{ConnectionState, Subscription, WebSocketClientService};
pub use config::ClientConfig;
pub use error::{WsError, WsResult};
pub use message::{InboundFrame, InboundMessage, OutboundFrame, OutboundMessage};
