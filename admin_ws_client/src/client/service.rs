// admin_ws_client/src/client/service.rs

//! 管理后台的 WebSocket 客户端服务。
//!
//! `WebSocketClientService` 是 UI 协作方唯一需要接触的类型：发送消息、按类型订阅入站消息、
//! 观察连接状态、连接与断开。它是一个可克隆的轻量句柄，所有克隆共享同一个后台监管任务；
//! 不同实例之间完全独立，没有任何进程级共享状态。
//!
//! 请求与回复之间没有关联 ID：调用方应先订阅期望的回复类型，再发送触发请求。

use admin_models::ws_payloads::AuthPayload;
use log::{info, warn};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::fmt;
use std::sync::{Arc, Mutex};
use tokio::sync::{mpsc, oneshot};

use crate::client::dispatch::{DispatchTable, MessageHandler, Subscription};
use crate::client::session::{CredentialStore, FileCredentialStore, MemoryCredentialStore, SessionState};
use crate::client::supervisor::{
    Command, ConnectionHandler, ConnectionState, SharedStatus, Supervisor, SupervisorContext,
};
use crate::client::transport::{Connector, TungsteniteConnector};
use crate::config::ClientConfig;
use crate::error::{WsError, WsResult};
use crate::message::OutboundMessage;

#[derive(Clone)]
pub struct WebSocketClientService {
    cmd_tx: mpsc::UnboundedSender<Command>,
    dispatch: Arc<DispatchTable>,
    session: Arc<SessionState>,
    observers: Arc<Mutex<Vec<ConnectionHandler>>>,
    status: Arc<SharedStatus>,
}

impl WebSocketClientService {
    /// 使用 `tokio-tungstenite` 连接器创建客户端。
    ///
    /// 配置了 `credential_path` 时凭证保存在该文件中，否则只保存在内存里。
    /// 必须在 tokio 运行时内调用。
    pub fn new(config: ClientConfig) -> WsResult<Self> {
        let store: Arc<dyn CredentialStore> = match &config.credential_path {
            Some(path) => Arc::new(FileCredentialStore::new(path)),
            None => Arc::new(MemoryCredentialStore::new()),
        };
        Self::with_components(config, Arc::new(TungsteniteConnector), store)
    }

    /// 使用自定义的连接器与凭证存储创建客户端。必须在 tokio 运行时内调用。
    pub fn with_components(
        config: ClientConfig,
        connector: Arc<dyn Connector>,
        store: Arc<dyn CredentialStore>,
    ) -> WsResult<Self> {
        config.validate()?;
        info!(
            "[WS客户端] 正在初始化，端点: {}，最大重连次数: {}，重连间隔: {} ms",
            config.url, config.max_reconnect_attempts, config.reconnect_delay_ms
        );

        let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
        let dispatch = Arc::new(DispatchTable::new());
        let session = Arc::new(SessionState::new(store));
        let observers = Arc::new(Mutex::new(Vec::new()));
        let status = Arc::new(SharedStatus::new());

        let supervisor = Supervisor::new(
            SupervisorContext {
                config,
                connector,
                dispatch: Arc::clone(&dispatch),
                session: Arc::clone(&session),
                observers: Arc::clone(&observers),
                status: Arc::clone(&status),
            },
            cmd_rx,
        );
        tokio::spawn(supervisor.run());

        Ok(Self {
            cmd_tx,
            dispatch,
            session,
            observers,
            status,
        })
    }

    async fn request<T>(&self, build: impl FnOnce(oneshot::Sender<T>) -> Command) -> WsResult<T> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.cmd_tx.send(build(reply_tx)).map_err(|_| WsError::SendErrorClosed)?;
        reply_rx.await.map_err(|_| WsError::SendErrorClosed)
    }

    /// 建立连接，等待连接打开或失败。
    ///
    /// 只能在 `Disconnected` 状态下调用。连接失败时返回错误，同时按异常关闭的规则安排自动重连。
    ///
    /// # Returns
    /// * `Ok(())`: 连接已打开，断线期间排队的消息已全部写出。
    /// * `Err(WsError::NotConnected)`: 握手成功，但写出排队消息时连接中断。
    /// * `Err(WsError::ConnectCancelled)`: 连接完成前调用了 `disconnect`。
    pub async fn connect(&self) -> WsResult<()> {
        self.request(|reply| Command::Connect { reply }).await?
    }

    /// 主动断开连接并取消任何待执行的自动重连。已断开时调用无副作用。
    pub async fn disconnect(&self) {
        if let Err(e) = self.request(|reply| Command::Disconnect { reply }).await {
            warn!("[WS客户端] disconnect 调用失败: {}", e);
        }
    }

    /// 发送一条消息。连接打开时直接写出，否则进入出站队列，在下次连接打开时按提交顺序写出。
    ///
    /// 传输层故障不会通过这里返回；只有队列已满 (`WsError::QueueFull`) 或客户端已关闭时才返回错误。
    pub async fn send(&self, message: impl Into<OutboundMessage>) -> WsResult<()> {
        let message = message.into();
        self.request(|reply| Command::Send { message, reply }).await?
    }

    /// 注册某个消息类型的处理器，处理器收到剥离 `type` 字段之后的消息体。
    /// 类型为 `"*"` 时收到每一条原始入站帧。
    pub fn on_message<F>(&self, message_type: &str, handler: F) -> Subscription
    where
        F: Fn(&Value) + Send + Sync + 'static,
    {
        let handler: MessageHandler = Arc::new(handler);
        self.dispatch.register(message_type, handler)
    }

    /// 注册一个带类型的处理器，消息体先反序列化为 `T`；无法反序列化的消息记录日志后跳过。
    pub fn on_typed_message<T, F>(&self, message_type: &str, handler: F) -> Subscription
    where
        T: DeserializeOwned,
        F: Fn(T) + Send + Sync + 'static,
    {
        let type_name = message_type.to_string();
        self.on_message(message_type, move |body| match T::deserialize(body) {
            Ok(typed) => handler(typed),
            Err(e) => warn!("[WS客户端] 消息 '{}' 的消息体无法解析为目标类型: {}", type_name, e),
        })
    }

    /// 注册连接状态观察者。
    pub fn on_connection<F>(&self, handler: F)
    where
        F: Fn(bool) + Send + Sync + 'static,
    {
        self.observers
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .push(Arc::new(handler));
    }

    /// 连接当前是否处于 `Open` 状态。
    pub fn is_connected(&self) -> bool {
        self.status.state() == ConnectionState::Open
    }

    /// 本次连接是否已通过认证。断开连接后总是 `false`。
    pub fn is_auth(&self) -> bool {
        self.session.is_authenticated()
    }

    /// 当前连接状态。
    ///
    /// # Returns
    /// * `ConnectionState`: `Disconnected`、`Connecting`、`Open` 或 `Closing` 之一。
    pub fn connection_state(&self) -> ConnectionState {
        self.status.state()
    }

    /// 当前已安排的自动重连次数，连接成功打开时清零。
    pub fn reconnect_attempts(&self) -> u32 {
        self.status.reconnect_attempts()
    }

    /// 使用邮箱和密码认证。
    pub async fn authenticate(&self, email: impl Into<String>, password: impl Into<String>) -> WsResult<()> {
        self.send(OutboundMessage::Authenticate(AuthPayload::Credentials {
            email: email.into(),
            password: password.into(),
        }))
        .await
    }

    /// 使用令牌认证。
    pub async fn authenticate_with_token(&self, token: impl Into<String>) -> WsResult<()> {
        self.send(OutboundMessage::authenticate_with_token(token)).await
    }

    /// 订阅服务端推送频道。
    pub async fn subscribe(&self, channel: impl Into<String>) -> WsResult<()> {
        self.send(OutboundMessage::Subscribe { channel: channel.into() }).await
    }

    /// 如果存在持久化凭证，发送令牌认证消息。返回是否发送了。
    pub async fn resume_session(&self) -> WsResult<bool> {
        match self.session.stored_credential() {
            Some(token) => {
                info!("[WS客户端] 发现已保存的凭证，尝试静默认证。");
                self.authenticate_with_token(token).await?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// 清除持久化凭证。不影响当前连接的认证状态。
    pub fn clear_credential(&self) -> WsResult<()> {
        self.session.clear_credential()
    }
}

impl fmt::Debug for WebSocketClientService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WebSocketClientService")
            .field("state", &self.status.state())
            .field("reconnect_attempts", &self.status.reconnect_attempts())
            .field("authenticated", &self.session.is_authenticated())
            .finish_non_exhaustive()
    }
}
