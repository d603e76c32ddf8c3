// ==========================================
// 零售订单管理系统 - 核心库
// ==========================================
// 技术栈: Rust + SQLite
// 系统定位: 客户/商品/订单/收据，库存与订单项严格一致
// ==========================================

// ==========================================
// 模块声明
// ==========================================

// 领域层 - 实体与类型
pub mod domain;

// 数据仓储层 - 数据访问
pub mod repository;

// 引擎层 - 业务规则
pub mod engine;

// 配置层 - 系统配置
pub mod config;

// 数据库基础设施（连接初始化/PRAGMA/建表）
pub mod db;

// 日志系统
pub mod logging;

// API 层 - 业务接口
pub mod api;

// 应用层 - 组装与身份
pub mod app;

// ==========================================
// 重导出核心类型
// ==========================================

// 领域类型
pub use domain::types::{OrderStatus, Role};

// 领域实体
pub use domain::{ActionLog, ActionType, Client, Order, OrderDetail, OrderItem, OrderLine, Product};

// 引擎
pub use engine::{
    IdentifierGenerator, InventoryLedger, OrderLifecycle, ReceiptOutcome, ReceiptPublisher,
};

// API
pub use api::{ApiError, ClientApi, ErrorCategory, LookupApi, OrderApi, ProductApi};

// ==========================================
// 常量定义
// ==========================================

// 系统版本
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// 系统名称
pub const APP_NAME: &str = "零售订单管理系统";
