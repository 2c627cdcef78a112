//! 通用枚举模块。
//!
//! 本模块定义了管理后台各组件之间共享的订单相关枚举类型。
//! 线上格式统一为 snake_case 字符串，与后台服务端保持一致。

use serde::{Deserialize, Serialize};
use std::fmt;

/// 订单类型。
///
/// `Mixed` 表示一个订单内同时包含多种条目 (商品、打印、跑腿)。
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum OrderType {
    /// 商品订单
    Product,
    /// 打印服务订单
    Printout,
    /// 跑腿配送订单
    Porter,
    /// 混合订单
    Mixed,
}

impl OrderType {
    /// 返回线上使用的字符串形式。
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderType::Product => "product",
            OrderType::Printout => "printout",
            OrderType::Porter => "porter",
            OrderType::Mixed => "mixed",
        }
    }
}

impl fmt::Display for OrderType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 订单状态。
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    /// 备货中
    Preparing,
    /// 分配配送员中
    Assigning,
    /// 已分配
    Assigned,
    /// 配送中
    OutForDelivery,
    /// 已送达
    Delivered,
    /// 已取消
    Cancelled,
}

impl OrderStatus {
    /// 返回线上使用的字符串形式。
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Preparing => "preparing",
            OrderStatus::Assigning => "assigning",
            OrderStatus::Assigned => "assigned",
            OrderStatus::OutForDelivery => "out_for_delivery",
            OrderStatus::Delivered => "delivered",
            OrderStatus::Cancelled => "cancelled",
        }
    }

    /// 订单是否已处于终态 (不会再发生状态流转)。
    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderStatus::Delivered | OrderStatus::Cancelled)
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
