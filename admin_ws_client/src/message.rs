// admin_ws_client/src/message.rs

//! 定义 WebSocket 通信中使用的出站 / 入站消息结构。
//!
//! 线上格式为 JSON 文本帧：
//! - 出站帧: `{ "type": string, "data"?: object, "payload"?: object, "channel"?: string }`
//! - 入站帧: `{ "type": string, ...其余字段 }`
//!
//! 出站消息用 `OutboundMessage` 表示，协议保留的消息类型各有一个变体，其余业务消息走
//! `Custom`。入站帧先解析为 `InboundFrame` (剥离 `type` 后的消息体 + 原始帧)，再由
//! `InboundMessage::classify` 归类为带类型的联合体，供连接监管器处理认证副作用。

use admin_models::ws_payloads::{
    AUTH_SUCCESS_MESSAGE_TYPE, AUTHENTICATE_MESSAGE_TYPE, AuthPayload, AuthSuccessPayload,
    ERROR_MESSAGE_TYPE, ErrorPayload, SUBSCRIBE_MESSAGE_TYPE,
};
use log::debug;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{WsError, WsResult};

/// 出站帧在线上的实际形态。
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct OutboundFrame {
    #[serde(rename = "type")]
    pub message_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel: Option<String>,
}

impl OutboundFrame {
    /// 只带 `type` 的空帧，例如 `{"type":"get_pincodes"}`。
    pub fn new(message_type: impl Into<String>) -> Self {
        Self {
            message_type: message_type.into(),
            data: None,
            payload: None,
            channel: None,
        }
    }
}

/// 出站消息。
#[derive(Debug, Clone, PartialEq)]
pub enum OutboundMessage {
    /// `authenticate`，payload 为邮箱密码或令牌。
    Authenticate(AuthPayload),
    /// `subscribe`，订阅服务端的推送频道。
    Subscribe { channel: String },
    /// 其余业务消息。
    Custom(OutboundFrame),
}

impl OutboundMessage {
    /// 创建一个只带类型的业务消息。
    pub fn new(message_type: impl Into<String>) -> Self {
        OutboundMessage::Custom(OutboundFrame::new(message_type))
    }

    /// 创建一个带 `data` 字段的业务消息。
    pub fn with_data<T: Serialize>(message_type: impl Into<String>, data: &T) -> WsResult<Self> {
        let message_type = message_type.into();
        let value = serde_json::to_value(data).map_err(|e| {
            WsError::SerializationError(format!("序列化消息 '{}' 的 data 字段失败: {}", message_type, e))
        })?;
        Ok(OutboundMessage::Custom(OutboundFrame {
            data: Some(value),
            ..OutboundFrame::new(message_type)
        }))
    }

    /// 创建一个带 `payload` 字段的业务消息。
    pub fn with_payload<T: Serialize>(message_type: impl Into<String>, payload: &T) -> WsResult<Self> {
        let message_type = message_type.into();
        let value = serde_json::to_value(payload).map_err(|e| {
            WsError::SerializationError(format!("序列化消息 '{}' 的 payload 字段失败: {}", message_type, e))
        })?;
        Ok(OutboundMessage::Custom(OutboundFrame {
            payload: Some(value),
            ..OutboundFrame::new(message_type)
        }))
    }

    /// 用令牌认证。
    pub fn authenticate_with_token(token: impl Into<String>) -> Self {
        OutboundMessage::Authenticate(AuthPayload::Token { token: token.into() })
    }

    pub fn message_type(&self) -> &str {
        match self {
            OutboundMessage::Authenticate(_) => AUTHENTICATE_MESSAGE_TYPE,
            OutboundMessage::Subscribe { .. } => SUBSCRIBE_MESSAGE_TYPE,
            OutboundMessage::Custom(frame) => &frame.message_type,
        }
    }

    /// 转换为线上帧。
    pub fn to_frame(&self) -> WsResult<OutboundFrame> {
        Ok(match self {
            OutboundMessage::Authenticate(auth) => OutboundFrame {
                payload: Some(serde_json::to_value(auth).map_err(|e| {
                    WsError::SerializationError(format!("序列化认证 payload 失败: {}", e))
                })?),
                ..OutboundFrame::new(AUTHENTICATE_MESSAGE_TYPE)
            },
            OutboundMessage::Subscribe { channel } => OutboundFrame {
                channel: Some(channel.clone()),
                ..OutboundFrame::new(SUBSCRIBE_MESSAGE_TYPE)
            },
            OutboundMessage::Custom(frame) => frame.clone(),
        })
    }

    /// 序列化为 JSON 文本，直接写入 socket。
    pub fn to_json(&self) -> WsResult<String> {
        let frame = self.to_frame()?;
        serde_json::to_string(&frame)
            .map_err(|e| WsError::SerializationError(format!("消息 '{}' 序列化为JSON失败: {}", frame.message_type, e)))
    }
}

impl From<OutboundFrame> for OutboundMessage {
    fn from(frame: OutboundFrame) -> Self {
        OutboundMessage::Custom(frame)
    }
}

/// 解析后的入站帧。
#[derive(Debug, Clone, PartialEq)]
pub struct InboundFrame {
    /// 帧的 `type` 字段。
    pub message_type: String,
    /// 剥离 `type` 之后剩余的字段，交给按类型订阅的处理器。
    pub body: Value,
    /// 原始帧 (含 `type`)，交给通配订阅者。
    pub raw: Value,
}

impl InboundFrame {
    /// 从一条原始文本帧解析。
    ///
    /// 非 JSON、非对象、缺少字符串类型的 `type` 字段，都视为畸形帧返回
    /// `WsError::DeserializationError`。
    pub fn parse(text: &str) -> WsResult<Self> {
        let raw: Value = serde_json::from_str(text)
            .map_err(|e| WsError::DeserializationError(format!("入站帧不是合法的 JSON: {}, 原始文本: '{}'", e, text)))?;

        let mut body: Map<String, Value> = match &raw {
            Value::Object(map) => map.clone(),
            _ => {
                return Err(WsError::DeserializationError(format!(
                    "入站帧不是 JSON 对象, 原始文本: '{}'",
                    text
                )));
            }
        };

        let message_type = match body.remove("type") {
            Some(Value::String(t)) => t,
            _ => {
                return Err(WsError::DeserializationError(format!(
                    "入站帧缺少字符串类型的 'type' 字段, 原始文本: '{}'",
                    text
                )));
            }
        };

        Ok(Self {
            message_type,
            body: Value::Object(body),
            raw,
        })
    }
}

/// 入站消息的带类型视图。只有对连接状态有副作用的保留类型单独建模。
#[derive(Debug, Clone, PartialEq)]
pub enum InboundMessage {
    AuthSuccess(AuthSuccessPayload),
    Error(ErrorPayload),
    /// 没有连接层副作用的业务消息，只做分发。
    Other,
}

impl InboundMessage {
    /// 对入站帧归类。保留类型的消息体字段不符合预期时按空消息体处理，
    /// 不影响后续分发。
    pub fn classify(frame: &InboundFrame) -> Self {
        match frame.message_type.as_str() {
            AUTH_SUCCESS_MESSAGE_TYPE => {
                InboundMessage::AuthSuccess(AuthSuccessPayload::deserialize(&frame.body).unwrap_or_else(|e| {
                    debug!("[WS客户端] auth_success 消息体不符合预期结构: {}", e);
                    AuthSuccessPayload::default()
                }))
            }
            ERROR_MESSAGE_TYPE => InboundMessage::Error(ErrorPayload::deserialize(&frame.body).unwrap_or_else(|e| {
                debug!("[WS客户端] error 消息体不符合预期结构: {}", e);
                ErrorPayload::default()
            })),
            _ => InboundMessage::Other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use admin_models::ws_payloads::{GET_ORDER_DETAILS_MESSAGE_TYPE, GetOrderDetailsRequest};
    use serde_json::json;

    #[test]
    /// 协议保留类型的出站帧必须与服务端约定逐字一致。
    fn test_reserved_outbound_frames_are_bit_exact() {
        let auth = OutboundMessage::Authenticate(AuthPayload::Credentials {
            email: "ops@example.com".to_string(),
            password: "pw".to_string(),
        });
        let v: Value = serde_json::from_str(&auth.to_json().expect("序列化失败")).expect("非法 JSON");
        assert_eq!(
            v,
            json!({ "type": "authenticate", "payload": { "email": "ops@example.com", "password": "pw" } })
        );

        let token = OutboundMessage::authenticate_with_token("tok-1");
        let v: Value = serde_json::from_str(&token.to_json().expect("序列化失败")).expect("非法 JSON");
        assert_eq!(v, json!({ "type": "authenticate", "payload": { "token": "tok-1" } }));

        let sub = OutboundMessage::Subscribe { channel: "orders".to_string() };
        let v: Value = serde_json::from_str(&sub.to_json().expect("序列化失败")).expect("非法 JSON");
        assert_eq!(v, json!({ "type": "subscribe", "channel": "orders" }));
    }

    #[test]
    fn test_custom_frames_omit_absent_fields() {
        assert_eq!(
            OutboundMessage::new("get_pincodes").to_json().expect("序列化失败"),
            r#"{"type":"get_pincodes"}"#
        );

        let req = OutboundMessage::with_data(
            GET_ORDER_DETAILS_MESSAGE_TYPE,
            &GetOrderDetailsRequest { order_id: "o-9".to_string() },
        )
        .expect("构造消息失败");
        assert_eq!(req.message_type(), "get_order_details");
        let v: Value = serde_json::from_str(&req.to_json().expect("序列化失败")).expect("非法 JSON");
        assert_eq!(v, json!({ "type": "get_order_details", "data": { "order_id": "o-9" } }));
    }

    #[test]
    /// 入站帧剥离 `type` 后的消息体交给按类型订阅者，原始帧保留给通配订阅者。
    fn test_inbound_frame_strips_type() {
        let frame = InboundFrame::parse(r#"{"type":"pincodes_data","available_pincodes":[{"pincode":"1"}]}"#)
            .expect("解析失败");
        assert_eq!(frame.message_type, "pincodes_data");
        assert_eq!(frame.body, json!({ "available_pincodes": [{ "pincode": "1" }] }));
        assert_eq!(frame.raw["type"], "pincodes_data");
    }

    #[test]
    fn test_malformed_inbound_frames_are_rejected() {
        for text in ["not json", "[1,2,3]", r#"{"no_type":1}"#, r#"{"type":42}"#] {
            match InboundFrame::parse(text) {
                Err(WsError::DeserializationError(_)) => {}
                other => panic!("帧 {} 预期为反序列化错误，实际: {:?}", text, other),
            }
        }
    }

    #[test]
    fn test_classify_reserved_types() {
        let ok = InboundFrame::parse(r#"{"type":"auth_success","user":{"token":"t"}}"#).expect("解析失败");
        match InboundMessage::classify(&ok) {
            InboundMessage::AuthSuccess(p) => assert_eq!(p.token(), Some("t")),
            other => panic!("预期 AuthSuccess，实际: {:?}", other),
        }

        // user 字段类型不对时依然归类为认证成功，只是没有令牌
        let odd = InboundFrame::parse(r#"{"type":"auth_success","user":"weird"}"#).expect("解析失败");
        assert_eq!(InboundMessage::classify(&odd), InboundMessage::AuthSuccess(AuthSuccessPayload::default()));

        let err = InboundFrame::parse(r#"{"type":"error","message":"authentication failed"}"#).expect("解析失败");
        match InboundMessage::classify(&err) {
            InboundMessage::Error(p) => assert!(p.is_authentication_failure()),
            other => panic!("预期 Error，实际: {:?}", other),
        }

        let other = InboundFrame::parse(r#"{"type":"order_details","order":{}}"#).expect("解析失败");
        assert!(matches!(InboundMessage::classify(&other), InboundMessage::Other));
    }
}
