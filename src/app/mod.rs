// ==========================================
// 零售订单管理系统 - 应用层
// ==========================================
// 职责: 组装共享连接、引擎与 API；提供身份能力
// ==========================================

pub mod auth;
pub mod state;

// 重导出
pub use auth::{Identity, IdentityProvider, StaticIdentityProvider};
pub use state::{get_default_db_path, AppState};
