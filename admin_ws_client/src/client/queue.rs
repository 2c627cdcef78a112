// admin_ws_client/src/client/queue.rs

//! 出站队列：断线期间提交的消息按提交顺序缓存，连接打开后由监管器按 FIFO 顺序取出写入。
//!
//! 队列有容量上限，满了以后拒绝新消息 (reject newest)，已排队的消息不受影响。
//! 内部生成的重新认证消息通过 `push_front` 插到队首，不受容量限制。

use log::warn;
use std::collections::VecDeque;

use crate::error::{WsError, WsResult};
use crate::message::OutboundMessage;

#[derive(Debug)]
pub struct OutboundQueue {
    messages: VecDeque<OutboundMessage>,
    capacity: usize,
}

impl OutboundQueue {
    /// 创建一个最多容纳 `capacity` 条消息的空队列。
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            messages: VecDeque::new(),
            capacity,
        }
    }

    /// 追加到队尾。队列已满时返回 `WsError::QueueFull`，消息不入队。
    pub fn enqueue(&mut self, message: OutboundMessage) -> WsResult<()> {
        if self.messages.len() >= self.capacity {
            warn!(
                "[出站队列] 队列已满 ({} 条)，拒绝消息 '{}'",
                self.capacity,
                message.message_type()
            );
            return Err(WsError::QueueFull {
                capacity: self.capacity,
                message_type: message.message_type().to_string(),
            });
        }
        self.messages.push_back(message);
        Ok(())
    }

    /// 插到队首，不检查容量。
    pub fn push_front(&mut self, message: OutboundMessage) {
        self.messages.push_front(message);
    }

    pub fn pop_front(&mut self) -> Option<OutboundMessage> {
        self.messages.pop_front()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
