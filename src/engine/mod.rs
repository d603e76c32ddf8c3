// ==========================================
// 零售订单管理系统 - 引擎层
// ==========================================
// 职责: 订单编号、库存账本、订单生命周期、收据/图片旁路
// 红线: Engine 不拼 SQL, 库存只随订单项存在性变化
// ==========================================

pub mod error;
pub mod identifier;
pub mod image_store;
pub mod inventory;
pub mod lifecycle;
pub mod receipt;

// 重导出核心引擎
pub use error::{EngineError, EngineResult};
pub use identifier::{IdentifierGenerator, Initials};
pub use image_store::{FsImageStore, ImageStore, NoOpImageStore};
pub use inventory::{InventoryLedger, StockMovement};
pub use lifecycle::{ClientPurge, ItemRequest, OrderLifecycle, ProductRef};
pub use receipt::{
    NoOpReceiptRenderer, Receipt, ReceiptLine, ReceiptOutcome, ReceiptPublisher, ReceiptRenderer,
    TextReceiptRenderer,
};
