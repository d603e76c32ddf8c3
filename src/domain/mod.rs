// ==========================================
// 零售订单管理系统 - 领域模型层
// ==========================================
// 职责: 定义领域实体与枚举类型
// 红线: 不含数据访问逻辑,不含库存规则
// ==========================================

pub mod action_log;
pub mod client;
pub mod order;
pub mod product;
pub mod types;

// 重导出核心类型
pub use action_log::{ActionLog, ActionType};
pub use client::Client;
pub use order::{Order, OrderDetail, OrderItem, OrderLine};
pub use product::Product;
pub use types::{OrderStatus, Role};
