// ==========================================
// 零售订单管理系统 - 身份能力
// ==========================================
// 职责: 提供当前操作人身份，仅用于管理类操作鉴权与审计 actor
// 说明: 认证本身由外部系统完成，这里只消费结果
// ==========================================

use crate::domain::types::Role;
use serde::{Deserialize, Serialize};

/// 未识别身份时的审计 actor
pub const SYSTEM_ACTOR: &str = "system";

/// 当前操作人
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub user_id: String,
    pub role: Role,
}

impl Identity {
    pub fn new(user_id: impl Into<String>, role: Role) -> Self {
        Self {
            user_id: user_id.into(),
            role,
        }
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

/// 身份提供者
pub trait IdentityProvider: Send + Sync {
    fn current_identity(&self) -> Option<Identity>;

    /// 审计日志中的操作人
    fn actor(&self) -> String {
        self.current_identity()
            .map(|identity| identity.user_id)
            .unwrap_or_else(|| SYSTEM_ACTOR.to_string())
    }
}

/// 固定身份（CLI/测试/种子数据）
#[derive(Debug, Clone, Default)]
pub struct StaticIdentityProvider {
    identity: Option<Identity>,
}

impl StaticIdentityProvider {
    pub fn new(identity: Identity) -> Self {
        Self {
            identity: Some(identity),
        }
    }

    pub fn admin(user_id: impl Into<String>) -> Self {
        Self::new(Identity::new(user_id, Role::Admin))
    }

    pub fn user(user_id: impl Into<String>) -> Self {
        Self::new(Identity::new(user_id, Role::User))
    }

    /// 匿名（无身份）
    pub fn anonymous() -> Self {
        Self { identity: None }
    }
}

impl IdentityProvider for StaticIdentityProvider {
    fn current_identity(&self) -> Option<Identity> {
        self.identity.clone()
    }
}
