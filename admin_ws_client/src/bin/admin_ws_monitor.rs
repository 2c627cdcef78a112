// admin_ws_client/src/bin/admin_ws_monitor.rs

//! 命令行监视器：连接到管理后台的 WebSocket 端点，把收到的每条消息和连接状态变化打印到日志。
//!
//! 用法: `admin_ws_monitor [配置文件路径]`，缺省读取 `admin_ws_client.json`，文件不存在时使用默认配置。

use admin_ws_client::{ClientConfig, WebSocketClientService};
use anyhow::Context;
use log::{info, warn, LevelFilter};
use std::path::PathBuf;

const DEFAULT_CONFIG_PATH: &str = "admin_ws_client.json";
const DEFAULT_CREDENTIAL_PATH: &str = "admin_session.json";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::new()
        .filter_level(LevelFilter::Info)
        .parse_default_env()
        .format_timestamp_millis()
        .init();

    let config_path = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH));
    let mut config = ClientConfig::load_or_default(&config_path);
    if config.credential_path.is_none() {
        config = config.with_credential_path(DEFAULT_CREDENTIAL_PATH);
    }
    info!("[监视器] 使用端点: {}", config.url);

    let client = WebSocketClientService::new(config).context("初始化 WebSocket 客户端失败")?;

    client.on_message("*", |frame| info!("[监视器] 收到消息: {}", frame));
    client.on_connection(|connected| {
        if connected {
            info!("[监视器] 连接已建立。");
        } else {
            warn!("[监视器] 连接已断开。");
        }
    });

    match client.connect().await {
        Ok(()) => {
            if client.resume_session().await.context("发送静默认证消息失败")? {
                info!("[监视器] 已使用保存的凭证发送认证请求。");
            }
        }
        // 首次连接失败时客户端会按配置自动重试
        Err(e) => warn!("[监视器] 首次连接失败: {}", e),
    }

    tokio::signal::ctrl_c().await.context("等待 Ctrl+C 信号失败")?;
    info!("[监视器] 收到退出信号，正在断开连接。");
    client.disconnect().await;
    Ok(())
}
