// ==========================================
// 零售订单管理系统 - 订单领域模型
// ==========================================

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::domain::client::Client;
use crate::domain::product::Product;
use crate::domain::types::OrderStatus;

// ==========================================
// Order - 订单
// ==========================================
// identifier: 客户姓名首字母 + 6 位序号（序号即订单自身主键）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: i64,
    pub status: OrderStatus,
    pub client_id: i64,
    pub identifier: String,
    pub created_at: NaiveDateTime,
}

// ==========================================
// OrderItem - 订单项
// ==========================================
// 每个 (order, product) 至多一条，由合并写入保证
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderItem {
    pub id: i64,
    pub order_id: i64,
    pub product_id: i64,
    pub quantity: i64,
}

/// 订单项 + 商品
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderLine {
    pub item: OrderItem,
    pub product: Product,
}

impl OrderLine {
    /// 行金额
    pub fn amount(&self) -> f64 {
        self.item.quantity as f64 * self.product.price
    }
}

// ==========================================
// OrderDetail - 订单完整视图
// ==========================================
// 关系加载: order -> client, order -> items -> product
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderDetail {
    pub order: Order,
    pub client: Client,
    pub lines: Vec<OrderLine>,
}

impl OrderDetail {
    /// 订单总额
    pub fn total(&self) -> f64 {
        self.lines.iter().map(OrderLine::amount).sum()
    }

    /// 指定商品的订单项数量（无则为 0）
    pub fn quantity_of(&self, product_id: i64) -> i64 {
        self.lines
            .iter()
            .find(|line| line.product.id == product_id)
            .map(|line| line.item.quantity)
            .unwrap_or(0)
    }
}
