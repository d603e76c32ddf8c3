// ==========================================
// 零售订单管理系统 - 数据仓储层
// ==========================================
// 红线: Repository 不含业务逻辑
// ==========================================
// 职责: 提供数据访问接口,屏蔽数据库细节
// 约束: 所有查询使用参数化,防止 SQL 注入
// 约定: 模块级函数接收 &Connection，供事务内复用
// ==========================================

pub mod action_log_repo;
pub mod client_repo;
pub mod error;
pub mod order_repo;
pub mod product_repo;

// 重导出核心仓储
pub use action_log_repo::ActionLogRepository;
pub use client_repo::{ClientRecord, ClientRepository};
pub use error::{RepositoryError, RepositoryResult};
pub use order_repo::OrderRepository;
pub use product_repo::{ProductRecord, ProductRepository};
