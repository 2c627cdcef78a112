//! `admin_models` 公共模型库 crate。
//!
//! 本 crate 集中定义了管理后台 WebSocket 客户端 (`admin_ws_client`) 与其上层 UI 协作方
//! 共享的数据结构：
//! - **WebSocket 消息负载 (`ws_payloads`)**: 协议保留的消息类型常量，认证、错误、邮编、
//!   订单详情等消息的 Payload 结构体。
//! - **订单模型 (`order_models`)**: 订单详情、条目、地址、分页与筛选条件。
//! - **通用枚举 (`enums`)**: 订单类型与订单状态。
//!
//! 所有模型都派生 `serde::Serialize` / `serde::Deserialize`、`Debug` 与 `Clone`，
//! 字段名与后台服务端的 JSON 保持一致。

pub mod enums;
pub mod order_models;
pub mod ws_payloads;

pub use enums::{OrderStatus, OrderType};
pub use order_models::{Address, Customer, Order, OrderFilters, OrderItem, PaginationInfo, StatusHistory};
