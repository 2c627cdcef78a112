// admin_ws_client/src/client/session.rs

//! 会话 / 认证状态。
//!
//! - 内存中的"已认证"标记：收到 `auth_success` 置位，收到认证类 `error` 或连接断开时清除。
//! - 持久化凭证：认证成功时写入，自动重连成功后读取并用于静默重新认证。
//!
//! 凭证存储的读写失败只记录日志，不会影响连接本身。

use log::{debug, error, info};
use serde_json::{Map, Value};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use crate::error::{WsError, WsResult};

/// 凭证在存储中使用的固定键名。
pub const CREDENTIAL_STORAGE_KEY: &str = "admin_token";

/// 持久化凭证的存储后端。
pub trait CredentialStore: Send + Sync {
    fn load(&self) -> WsResult<Option<String>>;
    fn save(&self, token: &str) -> WsResult<()>;
    fn clear(&self) -> WsResult<()>;
}

/// 仅保存在内存中的凭证，进程退出即丢失。
#[derive(Debug, Default)]
pub struct MemoryCredentialStore {
    token: Mutex<Option<String>>,
}

impl MemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// 预置一个凭证，模拟上次运行留下的令牌。
    pub fn with_token(token: impl Into<String>) -> Self {
        Self {
            token: Mutex::new(Some(token.into())),
        }
    }
}

impl CredentialStore for MemoryCredentialStore {
    fn load(&self) -> WsResult<Option<String>> {
        Ok(self.token.lock().unwrap_or_else(|p| p.into_inner()).clone())
    }

    fn save(&self, token: &str) -> WsResult<()> {
        *self.token.lock().unwrap_or_else(|p| p.into_inner()) = Some(token.to_string());
        Ok(())
    }

    fn clear(&self) -> WsResult<()> {
        *self.token.lock().unwrap_or_else(|p| p.into_inner()) = None;
        Ok(())
    }
}

/// 把凭证保存在一个 JSON 文件里：`{ "admin_token": "<token>" }`。
///
/// 文件中的其他键原样保留。
#[derive(Debug, Clone)]
pub struct FileCredentialStore {
    path: PathBuf,
}

impl FileCredentialStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_map(&self) -> WsResult<Map<String, Value>> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Map::new()),
            Err(e) => return Err(WsError::CredentialStore(format!("读取凭证文件 {:?} 失败: {}", self.path, e))),
        };
        match serde_json::from_str::<Value>(&content) {
            Ok(Value::Object(map)) => Ok(map),
            Ok(_) => Err(WsError::CredentialStore(format!("凭证文件 {:?} 不是 JSON 对象", self.path))),
            Err(e) => Err(WsError::CredentialStore(format!("解析凭证文件 {:?} 失败: {}", self.path, e))),
        }
    }

    fn write_map(&self, map: Map<String, Value>) -> WsResult<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent).map_err(|e| {
                    WsError::CredentialStore(format!("创建凭证目录 {:?} 失败: {}", parent, e))
                })?;
            }
        }
        let content = serde_json::to_string_pretty(&Value::Object(map))
            .map_err(|e| WsError::SerializationError(format!("序列化凭证文件内容失败: {}", e)))?;
        fs::write(&self.path, content)
            .map_err(|e| WsError::CredentialStore(format!("写入凭证文件 {:?} 失败: {}", self.path, e)))
    }
}

impl CredentialStore for FileCredentialStore {
    fn load(&self) -> WsResult<Option<String>> {
        Ok(self
            .read_map()?
            .get(CREDENTIAL_STORAGE_KEY)
            .and_then(Value::as_str)
            .map(str::to_string))
    }

    fn save(&self, token: &str) -> WsResult<()> {
        // 文件损坏时直接覆盖，凭证本身比旧内容更重要
        let mut map = self.read_map().unwrap_or_default();
        map.insert(CREDENTIAL_STORAGE_KEY.to_string(), Value::String(token.to_string()));
        self.write_map(map)
    }

    fn clear(&self) -> WsResult<()> {
        let mut map = match self.read_map() {
            Ok(map) => map,
            Err(_) => Map::new(),
        };
        if map.remove(CREDENTIAL_STORAGE_KEY).is_none() && !self.path.exists() {
            return Ok(());
        }
        self.write_map(map)
    }
}

/// 一个客户端实例的会话状态，由客户端句柄与监管器共享。
pub struct SessionState {
    authenticated: AtomicBool,
    store: Arc<dyn CredentialStore>,
}

impl SessionState {
    pub fn new(store: Arc<dyn CredentialStore>) -> Self {
        Self {
            authenticated: AtomicBool::new(false),
            store,
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.authenticated.load(Ordering::SeqCst)
    }

    /// 认证成功：置位标记，若服务端返回了令牌则持久化。
    pub(crate) fn mark_authenticated(&self, token: Option<&str>) {
        self.authenticated.store(true, Ordering::SeqCst);
        if let Some(token) = token.filter(|t| !t.is_empty()) {
            match self.store.save(token) {
                Ok(()) => info!("[会话] 认证成功，凭证已持久化。"),
                Err(e) => error!("[会话] 认证成功，但持久化凭证失败: {}", e),
            }
        } else {
            info!("[会话] 认证成功 (服务端未返回令牌)。");
        }
    }

    pub(crate) fn mark_unauthenticated(&self) {
        if self.authenticated.swap(false, Ordering::SeqCst) {
            debug!("[会话] 已清除认证标记。");
        }
    }

    /// 读取持久化凭证，读取失败按"没有凭证"处理。
    pub fn stored_credential(&self) -> Option<String> {
        match self.store.load() {
            Ok(token) => token.filter(|t| !t.is_empty()),
            Err(e) => {
                error!("[会话] 读取持久化凭证失败: {}", e);
                None
            }
        }
    }

    pub fn clear_credential(&self) -> WsResult<()> {
        self.store.clear()?;
        info!("[会话] 已清除持久化凭证。");
        Ok(())
    }
}
