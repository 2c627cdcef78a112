// admin_ws_client/src/error.rs

//! 定义 WebSocket 客户端库相关的错误类型。

use thiserror::Error;

use crate::client::supervisor::ConnectionState;

/// WebSocket 客户端库的统一错误类型。
#[derive(Error, Debug)]
pub enum WsError {
    /// 当 serde 序列化失败时返回。
    #[error("序列化错误: {0}")]
    SerializationError(String),

    /// 当 serde 反序列化失败时返回。
    #[error("反序列化错误: {0}")]
    DeserializationError(String),

    /// WebSocket 协议相关的错误，例如握手失败、连接被重置。
    #[error("WebSocket协议错误: {0}")]
    WebSocketProtocolError(#[from] tokio_tungstenite::tungstenite::Error),

    /// 底层 I/O 错误。
    #[error("I/O错误: {0}")]
    IoError(#[from] std::io::Error),

    /// 客户端的后台任务已退出，命令通道已关闭。
    #[error("发送错误: 通道已关闭")]
    SendErrorClosed,

    /// 无效的 URL 格式。
    #[error("无效的URL: {0}")]
    InvalidUrl(String),

    /// 未连接错误，当尝试在未建立连接时进行只能在连接状态下执行的操作。
    #[error("未连接")]
    NotConnected,

    /// 在当前连接状态下不允许执行该操作 (例如非 Disconnected 状态下调用 connect)。
    #[error("当前连接状态 {0:?} 不允许此操作")]
    InvalidState(ConnectionState),

    /// 出站队列已满，新消息被拒绝。
    #[error("出站队列已满 (容量 {capacity})，消息类型 '{message_type}' 被拒绝")]
    QueueFull { capacity: usize, message_type: String },

    /// 连接尝试在完成前被 disconnect 取消。
    #[error("连接尝试已被取消")]
    ConnectCancelled,

    /// 凭证存储读写失败。
    #[error("凭证存储错误: {0}")]
    CredentialStore(String),

    /// 配置无效或无法加载。
    #[error("配置错误: {0}")]
    Config(String),
}

/// 本库中所有可失败操作的返回类型。
pub type WsResult<T> = Result<T, WsError>;
