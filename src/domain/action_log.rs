// ==========================================
// 零售订单管理系统 - 操作日志领域模型
// ==========================================
// 用途: 审计追踪（谁在何时改了哪个订单、库存如何变动）
// 对齐: scripts/schema.sql action_log 表
// ==========================================

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::fmt;

// ==========================================
// ActionLog - 操作日志
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionLog {
    pub action_id: String,
    pub action_type: String,
    pub action_ts: NaiveDateTime,
    pub actor: String,
    pub order_identifier: Option<String>,
    pub payload_json: Option<JsonValue>, // 库存变动等明细
    pub detail: Option<String>,
}

impl ActionLog {
    /// 以当前时间构造日志
    pub fn new(action_type: ActionType, actor: impl Into<String>) -> Self {
        Self {
            action_id: uuid::Uuid::new_v4().to_string(),
            action_type: action_type.to_string(),
            action_ts: chrono::Local::now().naive_local(),
            actor: actor.into(),
            order_identifier: None,
            payload_json: None,
            detail: None,
        }
    }

    pub fn with_order(mut self, identifier: impl Into<String>) -> Self {
        self.order_identifier = Some(identifier.into());
        self
    }

    pub fn with_payload(mut self, payload: JsonValue) -> Self {
        self.payload_json = Some(payload);
        self
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }
}

// ==========================================
// ActionType - 操作类型
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ActionType {
    CreateOrder,
    AddItem,
    UpdateItemQuantity,
    RemoveItem,
    ReplaceItems,
    UpdateStatus,
    DeleteOrder,
    DeleteClient,
}

impl fmt::Display for ActionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ActionType::CreateOrder => "CreateOrder",
            ActionType::AddItem => "AddItem",
            ActionType::UpdateItemQuantity => "UpdateItemQuantity",
            ActionType::RemoveItem => "RemoveItem",
            ActionType::ReplaceItems => "ReplaceItems",
            ActionType::UpdateStatus => "UpdateStatus",
            ActionType::DeleteOrder => "DeleteOrder",
            ActionType::DeleteClient => "DeleteClient",
        };
        write!(f, "{}", s)
    }
}
