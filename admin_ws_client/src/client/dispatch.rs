// admin_ws_client/src/client/dispatch.rs

//! 分发表：消息类型 → 订阅者回调的有序集合，外加一个保留的通配条目 `*`。
//!
//! 分发顺序固定为：先按注册顺序调用该类型的订阅者 (传入剥离 `type` 后的消息体)，
//! 再按注册顺序调用通配订阅者 (传入原始帧)。同一个处理器同时注册在两处时会被调用两次。
//!
//! 处理器在分发表的锁之外执行，因此处理器内部可以安全地注册或注销订阅。
//! 每个处理器被调用前都会确认它仍在表中：在本次分发中途被注销的处理器不会再被调用。
//! 处理器 panic 会被捕获并记录日志，不影响其他订阅者。
//!
//! 类型字面量为 `*` 的入站帧只经由通配集合投递一次，不会作为"精确类型"再投递一遍。

use admin_models::ws_payloads::WILDCARD_MESSAGE_TYPE;
use log::{debug, error};
use serde_json::Value;
use std::any::Any;
use std::collections::HashMap;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, Weak};

use crate::message::InboundFrame;

/// 订阅者回调。
pub type MessageHandler = Arc<dyn Fn(&Value) + Send + Sync>;

struct Entry {
    id: u64,
    handler: MessageHandler,
}

#[derive(Default)]
pub struct DispatchTable {
    handlers: Mutex<HashMap<String, Vec<Entry>>>,
    next_id: AtomicU64,
}

impl DispatchTable {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, Vec<Entry>>> {
        // 处理器不在锁内执行，锁中毒只可能来自本模块自身，直接取回内部数据
        self.handlers.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// 注册一个处理器，返回用于注销的 `Subscription`。
    pub fn register(self: &Arc<Self>, message_type: impl Into<String>, handler: MessageHandler) -> Subscription {
        let message_type = message_type.into();
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.lock()
            .entry(message_type.clone())
            .or_default()
            .push(Entry { id, handler });
        debug!("[分发表] 已注册处理器 #{} (类型: '{}')", id, message_type);
        Subscription {
            table: Arc::downgrade(self),
            message_type,
            id,
        }
    }

    fn remove(&self, message_type: &str, id: u64) -> bool {
        let mut handlers = self.lock();
        let Some(entries) = handlers.get_mut(message_type) else {
            return false;
        };
        let before = entries.len();
        entries.retain(|e| e.id != id);
        let removed = entries.len() != before;
        if entries.is_empty() {
            handlers.remove(message_type);
        }
        removed
    }

    /// 当前为某个类型注册的处理器数量。
    pub fn handler_count(&self, message_type: &str) -> usize {
        self.lock().get(message_type).map_or(0, Vec::len)
    }

    fn snapshot(&self, message_type: &str) -> Vec<(u64, MessageHandler)> {
        self.lock()
            .get(message_type)
            .map(|entries| entries.iter().map(|e| (e.id, Arc::clone(&e.handler))).collect())
            .unwrap_or_default()
    }

    fn is_registered(&self, message_type: &str, id: u64) -> bool {
        self.lock()
            .get(message_type)
            .is_some_and(|entries| entries.iter().any(|e| e.id == id))
    }

    /// 把一条入站帧分发给所有匹配的订阅者，返回实际调用的处理器数量 (含 panic 的)。
    pub fn dispatch(&self, frame: &InboundFrame) -> usize {
        let exact = if frame.message_type == WILDCARD_MESSAGE_TYPE {
            Vec::new()
        } else {
            self.snapshot(&frame.message_type)
        };
        let wildcard = self.snapshot(WILDCARD_MESSAGE_TYPE);

        let mut invoked = 0;
        for (id, handler) in &exact {
            if self.is_registered(&frame.message_type, *id) {
                invoke(handler, &frame.body, &frame.message_type);
                invoked += 1;
            }
        }
        for (id, handler) in &wildcard {
            if self.is_registered(WILDCARD_MESSAGE_TYPE, *id) {
                invoke(handler, &frame.raw, WILDCARD_MESSAGE_TYPE);
                invoked += 1;
            }
        }
        invoked
    }
}

fn invoke(handler: &MessageHandler, value: &Value, channel: &str) {
    if let Err(panic_payload) = panic::catch_unwind(AssertUnwindSafe(|| handler(value))) {
        error!(
            "[分发表] 类型 '{}' 的消息处理器发生错误: {}",
            channel,
            panic_message(panic_payload.as_ref())
        );
    }
}

pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "未知 panic".to_string()
    }
}

/// 一次订阅的注销句柄。
///
/// 只有显式调用 `unsubscribe` 才会移除订阅；丢弃句柄不会。重复调用是无操作。
#[derive(Debug, Clone)]
pub struct Subscription {
    table: Weak<DispatchTable>,
    message_type: String,
    id: u64,
}

impl Subscription {
    /// 移除这次订阅。返回后该处理器不会再被调用，包括正在分发中的消息。
    pub fn unsubscribe(&self) {
        if let Some(table) = self.table.upgrade() {
            if table.remove(&self.message_type, self.id) {
                debug!("[分发表] 已注销处理器 #{} (类型: '{}')", self.id, self.message_type);
            }
        }
    }
}
