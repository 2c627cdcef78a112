// admin_ws_client/src/client/mock.rs

//! 单元测试用的脚本化连接器。
//!
//! 每次连接都会生成一个新的 `MockTransport`；测试通过连接器向"当前连接"注入入站帧或关闭事件，
//! 并检查所有写出的帧和关闭码。

use async_trait::async_trait;
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;

use crate::client::transport::{Connector, Transport, TransportEvent};
use crate::error::{WsError, WsResult};

#[derive(Default)]
struct MockState {
    attempts: usize,
    fail_remaining: usize,
    fail_writes: bool,
    hold_connects: bool,
    written: Vec<String>,
    close_codes: Vec<u16>,
    current: Option<mpsc::UnboundedSender<TransportEvent>>,
}

#[derive(Default)]
pub(crate) struct MockConnector {
    state: Arc<Mutex<MockState>>,
}

impl MockConnector {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MockState> {
        self.state.lock().unwrap()
    }

    /// 接下来的 `n` 次连接尝试失败。
    pub(crate) fn fail_next(&self, n: usize) {
        self.lock().fail_remaining = n;
    }

    /// 之后的连接尝试一直挂起，既不成功也不失败。
    pub(crate) fn hold_connects(&self, hold: bool) {
        self.lock().hold_connects = hold;
    }

    pub(crate) fn fail_writes(&self, fail: bool) {
        self.lock().fail_writes = fail;
    }

    pub(crate) fn attempts(&self) -> usize {
        self.lock().attempts
    }

    pub(crate) fn written(&self) -> Vec<String> {
        self.lock().written.clone()
    }

    pub(crate) fn close_codes(&self) -> Vec<u16> {
        self.lock().close_codes.clone()
    }

    /// 向当前连接注入一条入站文本帧。
    pub(crate) fn push_frame(&self, text: &str) {
        self.inject(TransportEvent::Frame(text.to_string()));
    }

    /// 让当前连接以指定关闭码断开。
    pub(crate) fn close_with(&self, code: u16) {
        self.inject(TransportEvent::Closed(code));
    }

    /// 返回 `None` 表示这次连接尝试被挂起。
    fn try_connect(&self) -> Option<WsResult<Box<dyn Transport>>> {
        let mut state = self.lock();
        state.attempts += 1;
        if state.hold_connects {
            return None;
        }
        if state.fail_remaining > 0 {
            state.fail_remaining -= 1;
            state.current = None;
            return Some(Err(WsError::IoError(std::io::Error::new(
                std::io::ErrorKind::ConnectionRefused,
                "模拟连接被拒绝",
            ))));
        }
        let (tx, rx) = mpsc::unbounded_channel();
        state.current = Some(tx);
        Some(Ok(Box::new(MockTransport {
            events: rx,
            state: Arc::clone(&self.state),
        })))
    }

    fn inject(&self, event: TransportEvent) {
        let state = self.lock();
        let sender = state.current.as_ref().expect("当前没有活动的模拟连接");
        sender.send(event).expect("模拟连接已被丢弃");
    }
}

#[async_trait]
impl Connector for MockConnector {
    async fn connect(&self, _url: &str) -> WsResult<Box<dyn Transport>> {
        let outcome = self.try_connect();
        match outcome {
            Some(result) => result,
            None => std::future::pending().await,
        }
    }
}

struct MockTransport {
    events: mpsc::UnboundedReceiver<TransportEvent>,
    state: Arc<Mutex<MockState>>,
}

#[async_trait]
impl Transport for MockTransport {
    async fn send(&mut self, frame: String) -> WsResult<()> {
        let mut state = self.state.lock().unwrap();
        if state.fail_writes {
            return Err(WsError::NotConnected);
        }
        state.written.push(frame);
        Ok(())
    }

    async fn recv(&mut self) -> TransportEvent {
        match self.events.recv().await {
            Some(event) => event,
            None => std::future::pending().await,
        }
    }

    async fn close(&mut self, code: u16, _reason: &str) -> WsResult<()> {
        self.state.lock().unwrap().close_codes.push(code);
        Ok(())
    }
}
