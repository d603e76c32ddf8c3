// ==========================================
// 零售订单管理系统 - 引擎层错误类型
// ==========================================
// 职责: 表达订单/库存规则失败的原因（不含传输层语义）
// ==========================================

use crate::repository::error::RepositoryError;
use thiserror::Error;

/// 引擎层错误类型
#[derive(Error, Debug)]
pub enum EngineError {
    // ===== 实体解析失败 =====
    #[error("客户不存在: {0}")]
    ClientNotFound(String),

    #[error("商品不存在: {0}")]
    ProductNotFound(String),

    #[error("订单不存在: {0}")]
    OrderNotFound(String),

    #[error("订单{order}中不存在商品{product}的订单项")]
    ItemNotFound { order: String, product: String },

    // ===== 库存规则 =====
    #[error("库存不足: 商品「{product_name}」(id={product_id}) 需要{requested}, 可用{available}")]
    InsufficientStock {
        product_id: i64,
        product_name: String,
        requested: i64,
        available: i64,
    },

    #[error("无效数量: {0}")]
    InvalidQuantity(i64),

    // ===== 订单编号 =====
    #[error("订单编号超长: {identifier} (最多{max_len}个字符)")]
    IdentifierOverflow { identifier: String, max_len: usize },

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// Result 类型别名
pub type EngineResult<T> = Result<T, EngineError>;
