// ==========================================
// 零售订单管理系统 - API层错误类型
// ==========================================
// 职责: 将 Engine/Repository 错误转换为调用方可理解的错误
// 分类: NotFound / BadRequest / Forbidden / Internal
// ==========================================

use crate::engine::error::EngineError;
use crate::repository::error::RepositoryError;
use serde::Serialize;
use thiserror::Error;

/// 调用方可见的错误分类
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ErrorCategory {
    NotFound,
    BadRequest,
    Forbidden,
    Internal,
}

/// API层错误类型
/// 所有错误信息必须包含显式原因
#[derive(Error, Debug)]
pub enum ApiError {
    // ==========================================
    // 资源不存在
    // ==========================================
    #[error("客户不存在: {0}")]
    ClientNotFound(String),

    #[error("商品不存在: {0}")]
    ProductNotFound(String),

    #[error("订单不存在: {0}")]
    OrderNotFound(String),

    #[error("订单项不存在: {0}")]
    ItemNotFound(String),

    #[error("资源未找到: {0}")]
    NotFound(String),

    // ==========================================
    // 业务规则错误
    // ==========================================
    #[error("库存不足: 商品「{product_name}」需要{requested}, 可用{available}")]
    InsufficientStock {
        product_id: i64,
        product_name: String,
        requested: i64,
        available: i64,
    },

    #[error("数据验证失败: {0}")]
    ValidationError(String),

    #[error("无效输入: {0}")]
    InvalidInput(String),

    #[error("无权限: {0}")]
    Forbidden(String),

    #[error("业务规则违反: {0}")]
    BusinessRuleViolation(String),

    // ==========================================
    // 数据访问错误
    // ==========================================
    #[error("数据库错误: {0}")]
    DatabaseError(String),

    #[error("数据库连接失败: {0}")]
    DatabaseConnectionError(String),

    #[error("数据库事务失败: {0}")]
    DatabaseTransactionError(String),

    // ==========================================
    // 通用错误
    // ==========================================
    #[error("内部错误: {0}")]
    InternalError(String),
}

impl ApiError {
    /// 错误分类
    pub fn category(&self) -> ErrorCategory {
        match self {
            ApiError::ClientNotFound(_)
            | ApiError::ProductNotFound(_)
            | ApiError::OrderNotFound(_)
            | ApiError::ItemNotFound(_)
            | ApiError::NotFound(_) => ErrorCategory::NotFound,

            ApiError::InsufficientStock { .. }
            | ApiError::ValidationError(_)
            | ApiError::InvalidInput(_)
            | ApiError::BusinessRuleViolation(_) => ErrorCategory::BadRequest,

            ApiError::Forbidden(_) => ErrorCategory::Forbidden,

            ApiError::DatabaseError(_)
            | ApiError::DatabaseConnectionError(_)
            | ApiError::DatabaseTransactionError(_)
            | ApiError::InternalError(_) => ErrorCategory::Internal,
        }
    }
}

// ==========================================
// 从 RepositoryError 转换
// ==========================================
impl From<RepositoryError> for ApiError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound { entity, id } => {
                ApiError::NotFound(format!("{}(id={})不存在", entity, id))
            }
            RepositoryError::LockError(msg) => {
                ApiError::DatabaseConnectionError(format!("数据库锁获取失败: {}", msg))
            }
            RepositoryError::DatabaseQueryError(msg) => ApiError::DatabaseError(msg),
            RepositoryError::UniqueConstraintViolation(msg) => {
                ApiError::BusinessRuleViolation(format!("唯一约束违反: {}", msg))
            }
            RepositoryError::ForeignKeyViolation(msg) => {
                ApiError::BusinessRuleViolation(format!("外键约束违反: {}", msg))
            }
            RepositoryError::CheckConstraintViolation(msg) => {
                ApiError::BusinessRuleViolation(format!("检查约束违反: {}", msg))
            }
            RepositoryError::FieldValueError { field, message } => {
                ApiError::InternalError(format!("字段{}读取失败: {}", field, message))
            }
        }
    }
}

// ==========================================
// 从 EngineError 转换
// ==========================================
impl From<EngineError> for ApiError {
    fn from(err: EngineError) -> Self {
        match err {
            EngineError::ClientNotFound(key) => ApiError::ClientNotFound(key),
            EngineError::ProductNotFound(key) => ApiError::ProductNotFound(key),
            EngineError::OrderNotFound(key) => ApiError::OrderNotFound(key),
            EngineError::ItemNotFound { order, product } => {
                ApiError::ItemNotFound(format!("订单{}中没有商品{}", order, product))
            }
            EngineError::InsufficientStock {
                product_id,
                product_name,
                requested,
                available,
            } => ApiError::InsufficientStock {
                product_id,
                product_name,
                requested,
                available,
            },
            EngineError::InvalidQuantity(q) => {
                ApiError::ValidationError(format!("数量无效: {}", q))
            }
            EngineError::IdentifierOverflow {
                identifier,
                max_len,
            } => ApiError::BusinessRuleViolation(format!(
                "订单编号{}超过{}个字符",
                identifier, max_len
            )),
            EngineError::Repository(e) => e.into(),
        }
    }
}

/// Result 类型别名
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_repository_error_conversion() {
        let repo_err = RepositoryError::NotFound {
            entity: "Order".to_string(),
            id: "42".to_string(),
        };
        let api_err: ApiError = repo_err.into();
        match &api_err {
            ApiError::NotFound(msg) => {
                assert!(msg.contains("Order"));
                assert!(msg.contains("42"));
            }
            _ => panic!("Expected NotFound"),
        }
        assert_eq!(api_err.category(), ErrorCategory::NotFound);

        let api_err: ApiError = RepositoryError::LockError("poisoned".to_string()).into();
        assert_eq!(api_err.category(), ErrorCategory::Internal);
    }

    #[test]
    fn test_engine_error_conversion() {
        let api_err: ApiError = EngineError::InsufficientStock {
            product_id: 3,
            product_name: "Сыр".to_string(),
            requested: 10,
            available: 3,
        }
        .into();
        assert_eq!(api_err.category(), ErrorCategory::BadRequest);
        assert!(api_err.to_string().contains("Сыр"));

        let api_err: ApiError = EngineError::ItemNotFound {
            order: "SIV000001".to_string(),
            product: "Хлеб".to_string(),
        }
        .into();
        assert!(matches!(api_err, ApiError::ItemNotFound(_)));
        assert_eq!(api_err.category(), ErrorCategory::NotFound);

        let api_err: ApiError = EngineError::Repository(RepositoryError::DatabaseQueryError(
            "disk I/O".to_string(),
        ))
        .into();
        assert!(matches!(api_err, ApiError::DatabaseError(_)));
    }

    #[test]
    fn test_forbidden_category() {
        assert_eq!(
            ApiError::Forbidden("admin only".to_string()).category(),
            ErrorCategory::Forbidden
        );
    }
}
