// admin_ws_client/tests/client_integration_test.rs

use admin_ws_client::{ClientConfig, OutboundFrame, OutboundMessage, WebSocketClientService};
use futures_util::{SinkExt, StreamExt};
use log::{info, warn, LevelFilter};
use serde_json::{json, Value};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::protocol::{CloseFrame, Message as TungsteniteMessage};
use tokio_tungstenite::{accept_async, WebSocketStream};

// 辅助函数：初始化日志，仅用于测试，避免多次初始化
fn init_test_logger() {
    let _ = env_logger::builder().filter_level(LevelFilter::Info).is_test(true).try_init();
}

/// 服务端在每条连接上观察到的事件。
#[derive(Debug, PartialEq)]
enum ServerEvent {
    Text(String),
    Closed(Option<u16>),
}

struct TestServer {
    addr: SocketAddr,
    connections: Arc<AtomicUsize>,
    events: mpsc::UnboundedReceiver<ServerEvent>,
}

impl TestServer {
    fn url(&self) -> String {
        format!("ws://{}", self.addr)
    }

    async fn next_event(&mut self) -> ServerEvent {
        tokio::time::timeout(Duration::from_secs(5), self.events.recv())
            .await
            .expect("[Test Main] 等待服务端事件超时")
            .expect("[Test Main] 服务端事件通道已关闭")
    }
}

/// 启动一个测试服务器，按收到消息的 `type` 决定如何回应：
/// - `get_pincodes`: 回复一条 `pincodes_data`
/// - `close_me`: 以 `data.code` (缺省 1000) 发送关闭帧
/// - `drop_me`: 不发关闭帧直接丢弃连接
/// - 其他: 回复 `{"type":"echo","original":...}`
async fn start_test_server() -> TestServer {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("无法绑定到随机端口");
    let addr = listener.local_addr().expect("无法获取本地监听地址");
    let connections = Arc::new(AtomicUsize::new(0));
    let (tx, events) = mpsc::unbounded_channel();

    let counter = Arc::clone(&connections);
    tokio::spawn(async move {
        loop {
            let Ok((tcp_stream, peer_addr)) = listener.accept().await else {
                continue;
            };
            match accept_async(tcp_stream).await {
                Ok(ws_stream) => {
                    counter.fetch_add(1, Ordering::SeqCst);
                    info!("[Test Server] 与 {} 的 WebSocket 握手成功", peer_addr);
                    tokio::spawn(handle_connection(ws_stream, tx.clone()));
                }
                Err(e) => warn!("[Test Server] 与 {} 的 WebSocket 握手失败: {}", peer_addr, e),
            }
        }
    });

    TestServer {
        addr,
        connections,
        events,
    }
}

async fn handle_connection(
    mut ws_stream: WebSocketStream<tokio::net::TcpStream>,
    tx: mpsc::UnboundedSender<ServerEvent>,
) {
    while let Some(Ok(msg)) = ws_stream.next().await {
        match msg {
            TungsteniteMessage::Text(text) => {
                let _ = tx.send(ServerEvent::Text(text.clone()));
                let value: Value = serde_json::from_str(&text).unwrap_or(Value::Null);
                match value.get("type").and_then(Value::as_str) {
                    Some("get_pincodes") => {
                        let reply = json!({
                            "type": "pincodes_data",
                            "available_pincodes": [
                                { "pincode": "411001", "city": "Pune", "state": "MH", "status": true }
                            ]
                        });
                        let _ = ws_stream.send(TungsteniteMessage::Text(reply.to_string())).await;
                    }
                    Some("close_me") => {
                        let code = value.pointer("/data/code").and_then(Value::as_u64).unwrap_or(1000) as u16;
                        let frame = CloseFrame {
                            code: CloseCode::from(code),
                            reason: "test close".into(),
                        };
                        let _ = ws_stream.close(Some(frame)).await;
                    }
                    Some("drop_me") => return,
                    _ => {
                        let reply = json!({ "type": "echo", "original": value });
                        let _ = ws_stream.send(TungsteniteMessage::Text(reply.to_string())).await;
                    }
                }
            }
            TungsteniteMessage::Close(frame) => {
                let _ = tx.send(ServerEvent::Closed(frame.map(|f| u16::from(f.code))));
                return;
            }
            _ => {}
        }
    }
}

fn client_for(server: &TestServer) -> WebSocketClientService {
    let config = ClientConfig::new(server.url()).with_reconnect_delay(Duration::from_millis(100));
    WebSocketClientService::new(config).expect("构造客户端失败")
}

async fn recv_value(rx: &mut mpsc::UnboundedReceiver<Value>) -> Value {
    tokio::time::timeout(Duration::from_secs(5), rx.recv())
        .await
        .expect("[Test Main] 等待客户端收到消息超时")
        .expect("[Test Main] 客户端消息通道已关闭")
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_echo_round_trip_with_subscriber_registered_first() {
    init_test_logger();
    let mut server = start_test_server().await;
    let client = client_for(&server);

    let (tx, mut rx) = mpsc::unbounded_channel();
    client.on_message("echo", move |body| {
        let _ = tx.send(body.clone());
    });

    client.connect().await.expect("[Test Main] 客户端连接失败");
    assert!(client.is_connected());

    client
        .send(OutboundMessage::with_data("ping", &json!({ "n": 7 })).expect("构造消息失败"))
        .await
        .expect("发送失败");

    assert_eq!(server.next_event().await, ServerEvent::Text(r#"{"type":"ping","data":{"n":7}}"#.to_string()));
    let body = recv_value(&mut rx).await;
    assert_eq!(body, json!({ "original": { "type": "ping", "data": { "n": 7 } } }));

    client.disconnect().await;
    assert_eq!(server.next_event().await, ServerEvent::Closed(Some(1000)));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
/// 连接前排队的消息在连接打开后按提交顺序写出；pincodes_data 回复送达订阅者。
async fn test_queued_requests_flush_in_order_and_pincodes_reply_arrives() {
    init_test_logger();
    let mut server = start_test_server().await;
    let client = client_for(&server);

    let (tx, mut rx) = mpsc::unbounded_channel();
    client.on_message("pincodes_data", move |body| {
        let _ = tx.send(body.clone());
    });

    client.send(OutboundFrame::new("first")).await.expect("入队失败");
    client.send(OutboundFrame::new("get_pincodes")).await.expect("入队失败");
    client.connect().await.expect("[Test Main] 客户端连接失败");

    assert_eq!(server.next_event().await, ServerEvent::Text(r#"{"type":"first"}"#.to_string()));
    assert_eq!(server.next_event().await, ServerEvent::Text(r#"{"type":"get_pincodes"}"#.to_string()));

    let body = recv_value(&mut rx).await;
    assert!(body.get("type").is_none());
    assert_eq!(body["available_pincodes"][0]["city"], "Pune");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
/// 服务端以 1000 关闭后客户端不重连。
async fn test_server_normal_close_is_not_retried() {
    init_test_logger();
    let server = start_test_server().await;
    let client = client_for(&server);
    let (tx, mut rx) = mpsc::unbounded_channel();
    client.on_connection(move |connected| {
        let _ = tx.send(connected);
    });

    client.connect().await.expect("[Test Main] 客户端连接失败");
    client
        .send(OutboundMessage::with_data("close_me", &json!({ "code": 1000 })).expect("构造消息失败"))
        .await
        .expect("发送失败");

    assert_eq!(rx.recv().await, Some(true));
    assert_eq!(
        tokio::time::timeout(Duration::from_secs(5), rx.recv()).await.expect("等待断开通知超时"),
        Some(false)
    );

    tokio::time::sleep(Duration::from_millis(500)).await;
    assert_eq!(server.connections.load(Ordering::SeqCst), 1);
    assert!(!client.is_connected());
    assert_eq!(client.reconnect_attempts(), 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
/// 连接被意外丢弃后客户端在延迟后自动重连。
async fn test_dropped_connection_reconnects() {
    init_test_logger();
    let server = start_test_server().await;
    let client = client_for(&server);

    client.connect().await.expect("[Test Main] 客户端连接失败");
    client.send(OutboundFrame::new("drop_me")).await.expect("发送失败");

    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    while server.connections.load(Ordering::SeqCst) < 2 || !client.is_connected() {
        assert!(tokio::time::Instant::now() < deadline, "[Test Main] 等待自动重连超时");
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    assert_eq!(client.reconnect_attempts(), 0);
}
