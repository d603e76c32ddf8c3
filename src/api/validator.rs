// ==========================================
// 零售订单管理系统 - 请求校验
// ==========================================
// 职责: 在任何写操作之前拒绝格式错误的输入
// 说明: 只做形态校验（格式/范围），存在性校验在 engine 内完成
// ==========================================

use chrono::NaiveDate;
use serde::Deserialize;

use crate::api::error::{ApiError, ApiResult};
use crate::app::auth::{Identity, IdentityProvider};
use crate::domain::types::OrderStatus;
use crate::engine::lifecycle::ItemRequest;

/// 日期格式 YYYY-MM-DD
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// 解析出生日期；空串视为未填写
pub fn parse_birth_date(raw: Option<&str>) -> ApiResult<Option<NaiveDate>> {
    match raw.map(str::trim).filter(|s| !s.is_empty()) {
        None => Ok(None),
        Some(s) => NaiveDate::parse_from_str(s, DATE_FORMAT)
            .map(Some)
            .map_err(|_| {
                ApiError::ValidationError(format!("出生日期格式错误: {}（应为 YYYY-MM-DD）", s))
            }),
    }
}

/// 解析订单状态
pub fn parse_status(raw: &str) -> ApiResult<OrderStatus> {
    raw.parse::<OrderStatus>().map_err(ApiError::ValidationError)
}

/// 新增数量: 必须为正
pub fn require_positive_quantity(quantity: i64) -> ApiResult<()> {
    if quantity <= 0 {
        return Err(ApiError::ValidationError(format!(
            "数量必须为正数: {}",
            quantity
        )));
    }
    Ok(())
}

/// 设置数量: 不能为负（0 表示删除）
pub fn require_non_negative_quantity(quantity: i64) -> ApiResult<()> {
    if quantity < 0 {
        return Err(ApiError::ValidationError(format!(
            "数量不能为负数: {}",
            quantity
        )));
    }
    Ok(())
}

/// 非空文本（去除首尾空白）
pub fn require_text<'a>(field: &str, value: &'a str) -> ApiResult<&'a str> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ApiError::ValidationError(format!("{}不能为空", field)));
    }
    Ok(trimmed)
}

/// 客户姓名检索条件: 至少提供名或姓之一
pub fn require_name_criteria<'a>(
    first_name: Option<&'a str>,
    last_name: Option<&'a str>,
) -> ApiResult<(Option<&'a str>, Option<&'a str>)> {
    let first = first_name.map(str::trim).filter(|s| !s.is_empty());
    let last = last_name.map(str::trim).filter(|s| !s.is_empty());
    if first.is_none() && last.is_none() {
        return Err(ApiError::ValidationError(
            "至少需要提供名(first_name)或姓(last_name)之一".to_string(),
        ));
    }
    Ok((first, last))
}

/// 价格与库存范围
pub fn require_price(price: f64) -> ApiResult<()> {
    if !price.is_finite() || price < 0.0 {
        return Err(ApiError::ValidationError(format!("价格无效: {}", price)));
    }
    Ok(())
}

pub fn require_stock(stock: i64) -> ApiResult<()> {
    if stock < 0 {
        return Err(ApiError::ValidationError(format!("库存不能为负数: {}", stock)));
    }
    Ok(())
}

/// 管理类操作门禁: 仅 admin 可执行
pub fn require_admin(identity: &dyn IdentityProvider, operation: &str) -> ApiResult<Identity> {
    match identity.current_identity() {
        Some(current) if current.is_admin() => Ok(current),
        Some(current) => {
            tracing::warn!(user_id = %current.user_id, role = %current.role, operation, "非管理员尝试执行管理操作");
            Err(ApiError::Forbidden(format!("{}仅限管理员", operation)))
        }
        None => Err(ApiError::Forbidden(format!("{}需要登录", operation))),
    }
}

#[derive(Debug, Deserialize)]
struct FormItem {
    product_name: String,
    quantity: i64,
}

/// 解析表单中的订单项 JSON: [{"product_name": "...", "quantity": 2}, ...]
pub fn parse_items_json(raw: &str) -> ApiResult<Vec<ItemRequest>> {
    let items: Vec<FormItem> = serde_json::from_str(raw)
        .map_err(|e| ApiError::ValidationError(format!("订单项JSON格式错误: {}", e)))?;

    items
        .into_iter()
        .map(|item| {
            let name = require_text("商品名称", &item.product_name)?;
            require_positive_quantity(item.quantity)?;
            Ok(ItemRequest::by_name(name, item.quantity))
        })
        .collect()
}

/// 校验 (product_id, quantity) 清单
pub fn validate_id_items(items: &[(i64, i64)]) -> ApiResult<Vec<ItemRequest>> {
    items
        .iter()
        .map(|&(product_id, quantity)| {
            require_positive_quantity(quantity)?;
            Ok(ItemRequest::by_id(product_id, quantity))
        })
        .collect()
}
