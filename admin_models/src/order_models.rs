//! 订单相关的共享数据模型。
//!
//! 这些结构体与后台推送的 `order_details` 消息中的 `order` 字段一一对应，
//! 供订单详情抽屉等 UI 组件反序列化使用。可选字段在缺失时保持 `None`，
//! 序列化时省略。

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::enums::{OrderStatus, OrderType};

/// 订单状态变更记录。
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct StatusHistory {
    pub status: OrderStatus,
    pub changed_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub changed_by: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// 收货 / 取件地址。
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Address {
    pub street: String,
    pub city: String,
    pub state: String,
    pub pincode: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
}

/// 打印服务条目的服务数据。
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct PrintoutServiceData {
    pub file_urls: Vec<String>,
    pub copies: u32,
    pub color: bool,
    pub paper_size: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    pub price: f64,
}

/// 跑腿服务条目的服务数据。
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct PorterServiceData {
    pub pickup_address: Address,
    pub delivery_address: Address,
    pub estimated_distance: f64,
    pub estimated_cost: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

/// 订单条目，按 `type` 字段区分三种形态。
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OrderItem {
    Product {
        product: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        product_name: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        product_image: Option<Vec<String>>,
        quantity: u32,
        price: f64,
    },
    Printout {
        service_data: PrintoutServiceData,
    },
    Porter {
        service_data: PorterServiceData,
    },
}

impl OrderItem {
    /// 条目的小计金额。跑腿条目取预估费用。
    pub fn subtotal(&self) -> f64 {
        match self {
            OrderItem::Product { quantity, price, .. } => f64::from(*quantity) * price,
            OrderItem::Printout { service_data } => service_data.price,
            OrderItem::Porter { service_data } => service_data.estimated_cost,
        }
    }
}

/// 下单客户的基本信息。
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Customer {
    pub id: String,
    pub name: String,
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
}

/// 订单详情。
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Order {
    pub id: String,
    pub order_type: OrderType,
    pub status: OrderStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status_history: Option<Vec<StatusHistory>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub customer: Option<Customer>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delivery_partner_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delivery_address: Option<Address>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub items: Option<Vec<OrderItem>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payment_method: Option<String>,
    pub total: f64,
    pub created_at: DateTime<Utc>,
}

/// 列表接口返回的分页信息。
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct PaginationInfo {
    pub current_page: u32,
    pub total_pages: u32,
    pub total_items: u64,
    pub has_next: bool,
    pub has_prev: bool,
}

/// 订单列表的筛选条件，全部可选。
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct OrderFilters {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub search: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to_date: Option<String>,
}
