// admin_models/src/ws_payloads.rs

//! 包含管理后台 WebSocket 通信中使用的消息类型常量与各类 Payload 结构体定义。
//!
//! 线上帧统一为 JSON 对象，`type` 字段为消息类型。入站消息在分发给订阅者之前会剥离
//! `type` 字段，因此这里的 Payload 结构体描述的都是"剥离 `type` 之后剩余的部分"。

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::order_models::Order;

// --- 协议保留的消息类型 ---

/// 认证请求 (出站)。
pub const AUTHENTICATE_MESSAGE_TYPE: &str = "authenticate";
/// 认证成功 (入站)，消息体中携带 `user.token`。
pub const AUTH_SUCCESS_MESSAGE_TYPE: &str = "auth_success";
/// 错误通知 (入站)。
pub const ERROR_MESSAGE_TYPE: &str = "error";
/// 频道订阅请求 (出站)。
pub const SUBSCRIBE_MESSAGE_TYPE: &str = "subscribe";
/// 通配订阅类型，仅在本地使用，绝不会出现在线上。
pub const WILDCARD_MESSAGE_TYPE: &str = "*";
/// `error` 消息的 `message` 中包含此子串时视为认证失败 (区分大小写)。
pub const AUTH_FAILURE_MARKER: &str = "authentication";

// --- 业务消息类型 ---

pub const GET_PINCODES_MESSAGE_TYPE: &str = "get_pincodes";
pub const PINCODES_DATA_MESSAGE_TYPE: &str = "pincodes_data";
pub const ADD_PINCODE_MESSAGE_TYPE: &str = "add_pincode";
pub const UPDATE_PINCODES_MESSAGE_TYPE: &str = "update_pincodes";
pub const PINCODE_CREATED_MESSAGE_TYPE: &str = "pincode_created";
pub const PINCODE_UPDATED_MESSAGE_TYPE: &str = "pincode_updated";
pub const GET_ORDER_DETAILS_MESSAGE_TYPE: &str = "get_order_details";
pub const ORDER_DETAILS_MESSAGE_TYPE: &str = "order_details";

/// `authenticate` 消息的 `payload` 字段。
///
/// 两种形态在线上没有额外的判别字段，依靠字段名区分。
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(untagged)]
pub enum AuthPayload {
    /// 邮箱 + 密码登录。
    Credentials { email: String, password: String },
    /// 使用已持久化的令牌静默登录。
    Token { token: String },
}

/// `auth_success` 消息体中的用户信息。
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct AuthUser {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

/// `auth_success` 消息体。
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct AuthSuccessPayload {
    #[serde(default)]
    pub user: Option<AuthUser>,
}

impl AuthSuccessPayload {
    /// 需要持久化的令牌 (如果服务端返回了)。
    pub fn token(&self) -> Option<&str> {
        self.user.as_ref().and_then(|u| u.token.as_deref())
    }
}

/// `error` 消息体。
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct ErrorPayload {
    #[serde(default)]
    pub message: Option<String>,
}

impl ErrorPayload {
    /// 错误描述中是否包含认证失败标记。
    pub fn is_authentication_failure(&self) -> bool {
        self.message
            .as_deref()
            .is_some_and(|m| m.contains(AUTH_FAILURE_MARKER))
    }
}

/// 一条可配送的邮编记录。
///
/// 后台的不同消息里主键可能叫 `pincodeId` 也可能叫 `_id`，这里两者都接受。
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct PincodeData {
    #[serde(rename = "pincodeId", alias = "_id", default, skip_serializing_if = "Option::is_none")]
    pub pincode_id: Option<String>,
    pub pincode: String,
    pub city: String,
    pub state: String,
    pub status: bool,
}

/// `pincodes_data` 消息体。
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct PincodesDataPayload {
    #[serde(default)]
    pub available_pincodes: Vec<PincodeData>,
}

/// `add_pincode` / `update_pincodes` 请求中 `data` 字段的内容。
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct PincodeUpsert {
    /// 更新时携带的主键；新增时为空。
    #[serde(rename = "_id", default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub pincode: String,
    pub city: String,
    pub state: String,
    pub status: bool,
}

/// 从 `pincode_created` / `pincode_updated` 消息体中取出邮编记录。
///
/// 服务端有时把记录包在 `data` 字段里，有时直接平铺在消息体上，两种都要兼容。
pub fn pincode_from_event(body: &Value) -> Result<PincodeData, serde_json::Error> {
    let inner = body.get("data").unwrap_or(body);
    PincodeData::deserialize(inner)
}

/// `get_order_details` 请求中 `data` 字段的内容。
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct GetOrderDetailsRequest {
    pub order_id: String,
}

/// `order_details` 消息体。
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct OrderDetailsPayload {
    pub order: Order,
}
