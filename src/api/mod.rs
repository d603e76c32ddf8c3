// ==========================================
// 零售订单管理系统 - API 层
// ==========================================
// 职责: 请求校验、事务边界、错误映射，供二进制/上层调用
// ==========================================

pub mod client_api;
pub mod error;
pub mod lookup_api;
pub mod order_api;
pub mod product_api;
pub mod store;
pub mod validator;

// 重导出核心类型
pub use client_api::{ClientApi, ClientNameQuery, ClientPatch, NewClient};
pub use error::{ApiError, ApiResult, ErrorCategory};
pub use lookup_api::LookupApi;
pub use order_api::{CreateOrderRequest, OrderApi, OrderChange, OrderForm, OrderItemInput};
pub use product_api::{ImageUpload, NewProduct, ProductApi, ProductPatch};
pub use store::Store;
