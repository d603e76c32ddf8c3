// ==========================================
// 零售订单管理系统 - 商品领域模型
// ==========================================

use serde::{Deserialize, Serialize};

// ==========================================
// Product - 商品
// ==========================================
// 不变量: 每次提交后 stock >= 0
// stock = 名义库存 - Σ(引用该商品的订单项数量)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: i64,
    pub name: String,
    pub image: Option<String>, // 图片存储路径
    pub price: f64,            // 单价
    pub stock: i64,            // 当前库存
}

