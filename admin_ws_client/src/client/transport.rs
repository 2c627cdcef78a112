// admin_ws_client/src/client/transport.rs

//! 客户端 WebSocket 传输层。
//!
//! 传输层只负责一条物理连接：建立连接、写入原始文本帧、报告对端关闭。
//! 它不包含任何重连或业务逻辑，这些都由 `supervisor` 负责。
//!
//! `Connector` / `Transport` 两个 trait 是监管器与具体 socket 实现之间的接缝：
//! 生产环境使用基于 `tokio-tungstenite` 的 `TungsteniteConnector`，测试中可以注入
//! 脚本化的内存实现。

use async_trait::async_trait;
use futures_util::{
    SinkExt, StreamExt,
    stream::{SplitSink, SplitStream},
};
use log::{debug, error, info, warn};
use std::borrow::Cow;
use tokio_tungstenite::{
    MaybeTlsStream, WebSocketStream, connect_async,
    tungstenite::Error as TungsteniteError,
    tungstenite::protocol::{CloseFrame, Message, frame::coding::CloseCode},
};

use crate::error::{WsError, WsResult};

/// 正常关闭。
pub const CLOSE_CODE_NORMAL: u16 = 1000;
/// 对端离开 (例如服务端重启、页面关闭)。
pub const CLOSE_CODE_GOING_AWAY: u16 = 1001;
/// 关闭帧中没有携带状态码。
pub const CLOSE_CODE_NO_STATUS: u16 = 1005;
/// 连接在没有关闭帧的情况下中断。
pub const CLOSE_CODE_ABNORMAL: u16 = 1006;

/// 传输层向监管器报告的事件。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    /// 收到一条文本帧。
    Frame(String),
    /// 连接已关闭，附带关闭码。之后该传输句柄不再产生任何事件。
    Closed(u16),
}

/// 一条已经建立的连接。
#[async_trait]
pub trait Transport: Send {
    /// 写入一条文本帧。只能在连接打开期间调用。
    async fn send(&mut self, frame: String) -> WsResult<()>;

    /// 等待下一个事件。
    async fn recv(&mut self) -> TransportEvent;

    /// 请求优雅关闭，重复调用无副作用。
    async fn close(&mut self, code: u16, reason: &str) -> WsResult<()>;
}

/// 负责打开新连接的工厂。每次 (重) 连都会产生一个全新的 `Transport`。
#[async_trait]
pub trait Connector: Send + Sync {
    async fn connect(&self, url: &str) -> WsResult<Box<dyn Transport>>;
}

/// 一个可能经过 TLS 加密的 TCP WebSocket 流。
pub type ClientWsStream = WebSocketStream<MaybeTlsStream<tokio::net::TcpStream>>;

/// 基于 `tokio-tungstenite` 的连接器。
#[derive(Debug, Default, Clone, Copy)]
pub struct TungsteniteConnector;

#[async_trait]
impl Connector for TungsteniteConnector {
    async fn connect(&self, url: &str) -> WsResult<Box<dyn Transport>> {
        info!("[传输层] 开始尝试连接到 WebSocket 服务器，URL: {}", url);
        match connect_async(url).await {
            Ok((ws_stream, response)) => {
                info!("[传输层] 已成功连接到 {} (HTTP 状态码: {})", url, response.status());
                debug!("[传输层] WebSocket 连接响应头: {:?}", response.headers());
                let (ws_sender, ws_receiver) = ws_stream.split();
                Ok(Box::new(TungsteniteTransport {
                    ws_sender,
                    ws_receiver,
                    close_requested: false,
                }))
            }
            Err(e) => {
                error!("[传输层] 连接到 {} 失败，错误: {}", url, e);
                Err(WsError::WebSocketProtocolError(e))
            }
        }
    }
}

/// `tokio-tungstenite` 连接的发送端与接收端。
pub struct TungsteniteTransport {
    ws_sender: SplitSink<ClientWsStream, Message>,
    ws_receiver: SplitStream<ClientWsStream>,
    close_requested: bool,
}

#[async_trait]
impl Transport for TungsteniteTransport {
    async fn send(&mut self, frame: String) -> WsResult<()> {
        if self.close_requested {
            return Err(WsError::NotConnected);
        }
        debug!("[传输层] 发送文本帧: {}", frame);
        self.ws_sender.send(Message::Text(frame)).await?;
        Ok(())
    }

    async fn recv(&mut self) -> TransportEvent {
        // 跳过不映射到应用层消息的控制帧，Ping 的 Pong 回复由 tungstenite 自动处理
        loop {
            match self.ws_receiver.next().await {
                Some(Ok(Message::Text(text))) => return TransportEvent::Frame(text),
                Some(Ok(Message::Binary(bin))) => {
                    warn!("[传输层] 收到非预期的二进制帧 ({} 字节)，已丢弃。", bin.len());
                }
                Some(Ok(Message::Ping(_))) | Some(Ok(Message::Pong(_))) | Some(Ok(Message::Frame(_))) => {}
                Some(Ok(Message::Close(close_frame))) => {
                    debug!("[传输层] 收到 Close 控制帧: {:?}", close_frame);
                    let code = close_frame.map(|f| u16::from(f.code)).unwrap_or(CLOSE_CODE_NO_STATUS);
                    return TransportEvent::Closed(code);
                }
                Some(Err(TungsteniteError::ConnectionClosed)) | Some(Err(TungsteniteError::AlreadyClosed)) => {
                    debug!("[传输层] 连接已关闭 (ConnectionClosed / AlreadyClosed)。");
                    let code = if self.close_requested { CLOSE_CODE_NORMAL } else { CLOSE_CODE_ABNORMAL };
                    return TransportEvent::Closed(code);
                }
                Some(Err(e)) => {
                    error!("[传输层] 从 WebSocket 流接收消息时发生底层错误: {}", e);
                    return TransportEvent::Closed(CLOSE_CODE_ABNORMAL);
                }
                None => {
                    debug!("[传输层] WebSocket 接收流已结束。");
                    return TransportEvent::Closed(CLOSE_CODE_ABNORMAL);
                }
            }
        }
    }

    async fn close(&mut self, code: u16, reason: &str) -> WsResult<()> {
        if self.close_requested {
            return Ok(());
        }
        self.close_requested = true;
        let frame = CloseFrame {
            code: CloseCode::from(code),
            reason: Cow::Owned(reason.to_string()),
        };
        match self.ws_sender.send(Message::Close(Some(frame))).await {
            Ok(()) => Ok(()),
            Err(TungsteniteError::ConnectionClosed) | Err(TungsteniteError::AlreadyClosed) => Ok(()),
            Err(e) => Err(WsError::WebSocketProtocolError(e)),
        }
    }
}
