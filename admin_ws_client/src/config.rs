// admin_ws_client/src/config.rs

//! 客户端配置。
//!
//! 所有参数在构造客户端时固定，运行期间不可调整。配置可以直接在代码里构造，
//! 也可以从 JSON 文件加载；文件缺失或损坏时回退到默认值。

use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;

use crate::error::{WsError, WsResult};

/// 默认端点 (本地开发环境)。
pub const DEFAULT_WS_URL: &str = "ws://localhost:8001/admin/ws";
/// 默认最大自动重连次数。
pub const DEFAULT_MAX_RECONNECT_ATTEMPTS: u32 = 3;
/// 默认重连间隔 (毫秒)，固定值，不做指数退避。
pub const DEFAULT_RECONNECT_DELAY_MS: u64 = 3000;
/// 正常关闭 (1000) 与离开 (1001) 两种关闭码不触发自动重连。
pub const DEFAULT_NO_RETRY_CLOSE_CODES: [u16; 2] = [1000, 1001];
/// 出站队列默认容量。
pub const DEFAULT_MAX_QUEUE_LEN: usize = 1024;

/// WebSocket 客户端配置。
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct ClientConfig {
    /// WebSocket 端点 URL，必须是 `ws://` 或 `wss://`。
    pub url: String,
    /// 异常关闭后最多自动重连的次数。
    pub max_reconnect_attempts: u32,
    /// 每次自动重连前的固定等待时间 (毫秒)。
    pub reconnect_delay_ms: u64,
    /// 收到这些关闭码时不自动重连。
    pub no_retry_close_codes: Vec<u16>,
    /// 断线期间出站队列最多缓存的消息条数。
    pub max_queue_len: usize,
    /// 凭证文件路径；为空时凭证只保存在内存中。
    pub credential_path: Option<PathBuf>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_WS_URL.to_string(),
            max_reconnect_attempts: DEFAULT_MAX_RECONNECT_ATTEMPTS,
            reconnect_delay_ms: DEFAULT_RECONNECT_DELAY_MS,
            no_retry_close_codes: DEFAULT_NO_RETRY_CLOSE_CODES.to_vec(),
            max_queue_len: DEFAULT_MAX_QUEUE_LEN,
            credential_path: None,
        }
    }
}

impl ClientConfig {
    /// 使用指定端点、其余参数取默认值。
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Self::default()
        }
    }

    /// 设置每次会话最多自动重连的次数，0 表示不自动重连。
    pub fn with_max_reconnect_attempts(mut self, attempts: u32) -> Self {
        self.max_reconnect_attempts = attempts;
        self
    }

    /// 设置两次重连之间的固定延迟 (毫秒精度)。
    pub fn with_reconnect_delay(mut self, delay: Duration) -> Self {
        self.reconnect_delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX);
        self
    }

    /// 设置不触发自动重连的关闭码列表，替换默认的 1000 / 1001。
    pub fn with_no_retry_close_codes(mut self, codes: impl Into<Vec<u16>>) -> Self {
        self.no_retry_close_codes = codes.into();
        self
    }

    /// 设置出站队列容量上限。
    pub fn with_max_queue_len(mut self, len: usize) -> Self {
        self.max_queue_len = len;
        self
    }

    /// 把凭证持久化到指定的 JSON 文件。
    pub fn with_credential_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.credential_path = Some(path.into());
        self
    }

    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_millis(self.reconnect_delay_ms)
    }

    /// 该关闭码是否应触发自动重连。
    pub fn should_retry_close_code(&self, code: u16) -> bool {
        !self.no_retry_close_codes.contains(&code)
    }

    /// 校验配置，返回解析后的端点 URL。
    pub fn validate(&self) -> WsResult<Url> {
        let parsed = Url::parse(&self.url)
            .map_err(|e| WsError::InvalidUrl(format!("无效的 WebSocket URL '{}': {}", self.url, e)))?;
        match parsed.scheme() {
            "ws" | "wss" => {}
            other => {
                return Err(WsError::InvalidUrl(format!(
                    "WebSocket URL '{}' 的协议必须是 ws 或 wss，实际为 '{}'",
                    self.url, other
                )));
            }
        }
        if self.max_queue_len == 0 {
            return Err(WsError::Config("max_queue_len 必须大于 0".to_string()));
        }
        Ok(parsed)
    }

    /// 从 JSON 文件加载配置。
    pub fn from_file(path: &Path) -> WsResult<Self> {
        let content = fs::read_to_string(path)?;
        serde_json::from_str(&content)
            .map_err(|e| WsError::Config(format!("解析配置文件 {:?} 失败: {}", path, e)))
    }

    /// 从 JSON 文件加载配置，文件不存在或损坏时记录日志并使用默认配置。
    pub fn load_or_default(path: &Path) -> Self {
        match Self::from_file(path) {
            Ok(config) => {
                info!("[配置模块] 已成功从配置文件 {:?} 加载客户端配置。", path);
                config
            }
            Err(WsError::IoError(e)) => {
                info!("[配置模块] 未能读取配置文件 {:?} (错误: {})，使用默认配置。", path, e);
                Self::default()
            }
            Err(e) => {
                warn!("[配置模块] 警告：{}。文件可能已损坏，使用默认配置。", e);
                Self::default()
            }
        }
    }
}
