// admin_ws_client/src/client/supervisor.rs

//! 连接监管器。
//!
//! 监管器运行在一个独立的 tokio 任务里，是传输句柄、出站队列和重连计数器的唯一所有者。
//! 客户端句柄通过命令通道与它交互；传输层事件、重连定时器和命令在同一个 `select!`
//! 循环中串行处理，任意两个处理过程不会交错执行。
//!
//! 状态机：
//! ```text
//! Disconnected -> Connecting -> Open -> Disconnected   (对端关闭 / 网络中断)
//!                               Open -> Closing -> Disconnected   (调用方 disconnect)
//! ```
//! 异常关闭 (关闭码不在"不重连"列表中) 且重连计数器未达上限时，固定延迟后自动重连；
//! 计数器在安排重连时加一，连接成功打开时清零。

use log::{debug, error, info, warn};
use std::future::Future;
use std::panic::{self, AssertUnwindSafe};
use std::pin::Pin;
use std::sync::atomic::{AtomicU8, AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::{mpsc, oneshot};
use tokio::time::Sleep;

use crate::client::dispatch::{DispatchTable, panic_message};
use crate::client::queue::OutboundQueue;
use crate::client::session::SessionState;
use crate::client::transport::{
    CLOSE_CODE_ABNORMAL, CLOSE_CODE_GOING_AWAY, CLOSE_CODE_NORMAL, Connector, Transport, TransportEvent,
};
use crate::config::ClientConfig;
use crate::error::{WsError, WsResult};
use crate::message::{InboundFrame, InboundMessage, OutboundMessage};

/// 连接状态。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ConnectionState {
    Disconnected = 0,
    Connecting = 1,
    Open = 2,
    Closing = 3,
}

impl ConnectionState {
    fn from_u8(value: u8) -> Self {
        match value {
            1 => ConnectionState::Connecting,
            2 => ConnectionState::Open,
            3 => ConnectionState::Closing,
            _ => ConnectionState::Disconnected,
        }
    }
}

/// 连接状态观察者，参数为"是否已连接"。
pub type ConnectionHandler = Arc<dyn Fn(bool) + Send + Sync>;

/// 监管器对外公开的只读状态，客户端句柄可以不经过命令通道直接查询。
#[derive(Debug)]
pub(crate) struct SharedStatus {
    state: AtomicU8,
    reconnect_attempts: AtomicU32,
}

impl SharedStatus {
    pub(crate) fn new() -> Self {
        Self {
            state: AtomicU8::new(ConnectionState::Disconnected as u8),
            reconnect_attempts: AtomicU32::new(0),
        }
    }

    pub(crate) fn state(&self) -> ConnectionState {
        ConnectionState::from_u8(self.state.load(Ordering::SeqCst))
    }

    pub(crate) fn reconnect_attempts(&self) -> u32 {
        self.reconnect_attempts.load(Ordering::SeqCst)
    }
}

/// 客户端句柄发给监管器的命令。
pub(crate) enum Command {
    Connect { reply: oneshot::Sender<WsResult<()>> },
    Disconnect { reply: oneshot::Sender<()> },
    Send { message: OutboundMessage, reply: oneshot::Sender<WsResult<()>> },
}

type ConnectFuture = Pin<Box<dyn Future<Output = WsResult<Box<dyn Transport>>> + Send>>;

/// 监管器与客户端句柄共享的组件。
pub(crate) struct SupervisorContext {
    pub(crate) config: ClientConfig,
    pub(crate) connector: Arc<dyn Connector>,
    pub(crate) dispatch: Arc<DispatchTable>,
    pub(crate) session: Arc<SessionState>,
    pub(crate) observers: Arc<Mutex<Vec<ConnectionHandler>>>,
    pub(crate) status: Arc<SharedStatus>,
}

pub(crate) struct Supervisor {
    ctx: SupervisorContext,
    cmd_rx: mpsc::UnboundedReceiver<Command>,
    state: ConnectionState,
    transport: Option<Box<dyn Transport>>,
    pending_connect: Option<ConnectFuture>,
    connect_waiter: Option<oneshot::Sender<WsResult<()>>>,
    /// 当前这次连接尝试是否由重连定时器发起。
    reconnecting: bool,
    queue: OutboundQueue,
    reconnect_attempts: u32,
    reconnect_timer: Option<Pin<Box<Sleep>>>,
}

impl Supervisor {
    pub(crate) fn new(ctx: SupervisorContext, cmd_rx: mpsc::UnboundedReceiver<Command>) -> Self {
        let queue = OutboundQueue::with_capacity(ctx.config.max_queue_len);
        Self {
            ctx,
            cmd_rx,
            state: ConnectionState::Disconnected,
            transport: None,
            pending_connect: None,
            connect_waiter: None,
            reconnecting: false,
            queue,
            reconnect_attempts: 0,
            reconnect_timer: None,
        }
    }

    /// 监管器主循环。所有客户端句柄被丢弃 (命令通道关闭) 后退出。
    pub(crate) async fn run(mut self) {
        debug!("[连接监管] 监管任务已启动，端点: {}", self.ctx.config.url);
        loop {
            tokio::select! {
                cmd = self.cmd_rx.recv() => match cmd {
                    Some(cmd) => self.handle_command(cmd).await,
                    None => {
                        self.shutdown().await;
                        break;
                    }
                },
                result = await_connect(&mut self.pending_connect) => {
                    self.pending_connect = None;
                    self.on_connect_result(result).await;
                }
                event = next_event(&mut self.transport) => self.on_transport_event(event).await,
                _ = await_timer(&mut self.reconnect_timer) => {
                    self.reconnect_timer = None;
                    self.on_reconnect_timer();
                }
            }
        }
        debug!("[连接监管] 监管任务已退出。");
    }

    async fn handle_command(&mut self, cmd: Command) {
        match cmd {
            Command::Connect { reply } => {
                if self.state != ConnectionState::Disconnected {
                    let _ = reply.send(Err(WsError::InvalidState(self.state)));
                    return;
                }
                // 手动连接取代尚未触发的自动重连
                if self.reconnect_timer.take().is_some() {
                    debug!("[连接监管] 手动连接，已取消待执行的自动重连。");
                }
                self.connect_waiter = Some(reply);
                self.begin_connect(false);
            }
            Command::Disconnect { reply } => {
                self.disconnect().await;
                let _ = reply.send(());
            }
            Command::Send { message, reply } => {
                let result = self.submit(message).await;
                let _ = reply.send(result);
            }
        }
    }

    fn set_state(&mut self, state: ConnectionState) {
        if self.state != state {
            debug!("[连接监管] 状态变更: {:?} -> {:?}", self.state, state);
        }
        self.state = state;
        self.ctx.status.state.store(state as u8, Ordering::SeqCst);
    }

    fn set_reconnect_attempts(&mut self, attempts: u32) {
        self.reconnect_attempts = attempts;
        self.ctx.status.reconnect_attempts.store(attempts, Ordering::SeqCst);
    }

    fn begin_connect(&mut self, reconnecting: bool) {
        self.set_state(ConnectionState::Connecting);
        self.reconnecting = reconnecting;
        let connector = Arc::clone(&self.ctx.connector);
        let url = self.ctx.config.url.clone();
        info!("[连接监管] 正在连接 WebSocket: {}", url);
        self.pending_connect = Some(Box::pin(async move { connector.connect(&url).await }));
    }

    async fn on_connect_result(&mut self, result: WsResult<Box<dyn Transport>>) {
        match result {
            Ok(transport) => {
                info!("[连接监管] WebSocket 已连接。");
                self.transport = Some(transport);
                self.set_state(ConnectionState::Open);
                self.set_reconnect_attempts(0);
                self.notify_observers(true);

                if std::mem::take(&mut self.reconnecting) {
                    if let Some(token) = self.ctx.session.stored_credential() {
                        info!("[连接监管] 重连成功，使用已保存的凭证重新认证。");
                        self.queue.push_front(OutboundMessage::authenticate_with_token(token));
                    }
                }
                self.drain_queue().await;

                // 排队消息写出失败时连接已按异常关闭处理
                if let Some(waiter) = self.connect_waiter.take() {
                    let result = if self.state == ConnectionState::Open {
                        Ok(())
                    } else {
                        Err(WsError::NotConnected)
                    };
                    let _ = waiter.send(result);
                }
            }
            Err(e) => {
                error!("[连接监管] 连接 WebSocket 失败: {}", e);
                self.reconnecting = false;
                if let Some(waiter) = self.connect_waiter.take() {
                    let _ = waiter.send(Err(e));
                }
                // 握手失败与连接中断一样按异常关闭处理，可能触发自动重连
                self.handle_closed(CLOSE_CODE_ABNORMAL);
            }
        }
    }

    async fn on_transport_event(&mut self, event: TransportEvent) {
        match event {
            TransportEvent::Frame(text) => self.handle_frame(&text),
            TransportEvent::Closed(code) => {
                self.transport = None;
                self.handle_closed(code);
            }
        }
    }

    fn handle_frame(&mut self, text: &str) {
        let frame = match InboundFrame::parse(text) {
            Ok(frame) => frame,
            Err(e) => {
                warn!("[连接监管] 丢弃无法解析的入站帧: {}", e);
                return;
            }
        };
        debug!("[连接监管] 收到消息类型 '{}'", frame.message_type);

        match InboundMessage::classify(&frame) {
            InboundMessage::AuthSuccess(payload) => self.ctx.session.mark_authenticated(payload.token()),
            InboundMessage::Error(payload) if payload.is_authentication_failure() => {
                warn!("[连接监管] 服务端报告认证失败: {:?}", payload.message);
                self.ctx.session.mark_unauthenticated();
            }
            _ => {}
        }

        self.ctx.dispatch.dispatch(&frame);
    }

    fn handle_closed(&mut self, code: u16) {
        info!("[连接监管] WebSocket 已断开，关闭码: {}", code);
        self.set_state(ConnectionState::Disconnected);
        self.ctx.session.mark_unauthenticated();
        self.notify_observers(false);

        if !self.ctx.config.should_retry_close_code(code) {
            return;
        }
        if self.reconnect_attempts < self.ctx.config.max_reconnect_attempts {
            self.schedule_reconnect();
        } else {
            warn!(
                "[连接监管] 已达到最大重连次数 ({})，不再自动重连。",
                self.ctx.config.max_reconnect_attempts
            );
        }
    }

    fn schedule_reconnect(&mut self) {
        let attempt = self.reconnect_attempts + 1;
        self.set_reconnect_attempts(attempt);
        let delay = self.ctx.config.reconnect_delay();
        info!(
            "[连接监管] 计划第 {}/{} 次重连，{:?} 后执行。",
            attempt, self.ctx.config.max_reconnect_attempts, delay
        );
        self.reconnect_timer = Some(Box::pin(tokio::time::sleep(delay)));
    }

    fn on_reconnect_timer(&mut self) {
        if self.state != ConnectionState::Disconnected {
            debug!("[连接监管] 重连定时器触发时状态为 {:?}，忽略。", self.state);
            return;
        }
        info!("[连接监管] 开始第 {} 次自动重连。", self.reconnect_attempts);
        self.begin_connect(true);
    }

    async fn disconnect(&mut self) {
        let cancelled_timer = self.reconnect_timer.take().is_some();
        self.reconnecting = false;

        match self.state {
            ConnectionState::Disconnected => {
                if cancelled_timer {
                    info!("[连接监管] 已取消待执行的自动重连。");
                } else {
                    debug!("[连接监管] disconnect 调用时已处于断开状态。");
                }
                return;
            }
            ConnectionState::Connecting => {
                info!("[连接监管] 取消进行中的连接尝试。");
                self.pending_connect = None;
                if let Some(waiter) = self.connect_waiter.take() {
                    let _ = waiter.send(Err(WsError::ConnectCancelled));
                }
            }
            ConnectionState::Open | ConnectionState::Closing => {
                info!("[连接监管] 正在主动断开 WebSocket 连接。");
                self.set_state(ConnectionState::Closing);
                if let Some(mut transport) = self.transport.take() {
                    if let Err(e) = transport.close(CLOSE_CODE_NORMAL, "Manual disconnect").await {
                        warn!("[连接监管] 发送关闭帧失败: {}", e);
                    }
                }
            }
        }

        self.set_state(ConnectionState::Disconnected);
        self.ctx.session.mark_unauthenticated();
        self.notify_observers(false);
    }

    async fn submit(&mut self, message: OutboundMessage) -> WsResult<()> {
        if self.state == ConnectionState::Open && self.transport.is_some() {
            if self.queue.is_empty() {
                self.write_or_fail(message).await;
                return Ok(());
            }
            self.queue.enqueue(message)?;
            self.drain_queue().await;
            return Ok(());
        }
        let message_type = message.message_type().to_string();
        self.queue.enqueue(message)?;
        warn!(
            "[连接监管] WebSocket 未就绪，消息 '{}' 已入队 ({}/{})。",
            message_type,
            self.queue.len(),
            self.queue.capacity()
        );
        Ok(())
    }

    /// 按 FIFO 顺序写出排队的消息。写入失败时连接按异常断开处理，剩余消息留在队列中。
    async fn drain_queue(&mut self) {
        let mut sent = 0usize;
        while self.state == ConnectionState::Open {
            let Some(message) = self.queue.pop_front() else {
                break;
            };
            if !self.write_or_fail(message).await {
                break;
            }
            sent += 1;
        }
        if sent > 0 {
            info!("[连接监管] 已发送 {} 条排队消息。", sent);
        }
    }

    /// 写出一条消息，返回连接是否仍然可用。
    async fn write_or_fail(&mut self, message: OutboundMessage) -> bool {
        let text = match message.to_json() {
            Ok(text) => text,
            Err(e) => {
                error!("[连接监管] 消息 '{}' 序列化失败，已丢弃: {}", message.message_type(), e);
                return true;
            }
        };
        let Some(transport) = self.transport.as_mut() else {
            return false;
        };
        match transport.send(text).await {
            Ok(()) => {
                debug!("[连接监管] 消息 '{}' 已写入。", message.message_type());
                true
            }
            Err(e) => {
                error!("[连接监管] 写入消息 '{}' 失败: {}", message.message_type(), e);
                self.transport = None;
                self.handle_closed(CLOSE_CODE_ABNORMAL);
                false
            }
        }
    }

    fn notify_observers(&self, connected: bool) {
        let observers: Vec<ConnectionHandler> = self
            .ctx
            .observers
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .iter()
            .cloned()
            .collect();
        for observer in observers {
            if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(|| observer(connected))) {
                error!("[连接监管] 连接状态观察者发生错误: {}", panic_message(payload.as_ref()));
            }
        }
    }

    async fn shutdown(&mut self) {
        debug!("[连接监管] 所有客户端句柄已释放，正在关闭连接。");
        self.reconnect_timer = None;
        self.pending_connect = None;
        if let Some(mut transport) = self.transport.take() {
            if let Err(e) = transport.close(CLOSE_CODE_GOING_AWAY, "Client dropped").await {
                debug!("[连接监管] 关闭连接时出错: {}", e);
            }
        }
        self.set_state(ConnectionState::Disconnected);
    }
}

async fn await_connect(pending: &mut Option<ConnectFuture>) -> WsResult<Box<dyn Transport>> {
    match pending {
        Some(fut) => fut.as_mut().await,
        None => std::future::pending().await,
    }
}

async fn next_event(transport: &mut Option<Box<dyn Transport>>) -> TransportEvent {
    match transport {
        Some(t) => t.recv().await,
        None => std::future::pending().await,
    }
}

async fn await_timer(timer: &mut Option<Pin<Box<Sleep>>>) {
    match timer {
        Some(sleep) => sleep.as_mut().await,
        None => std::future::pending().await,
    }
}
