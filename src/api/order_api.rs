// ==========================================
// 零售订单管理系统 - 订单 API
// ==========================================
// 职责: 订单创建、订单项增删改、状态、删除、收据、历史
// 事务: 每个写操作一个 IMMEDIATE 事务（engine::lifecycle 在事务内执行）
// 旁路: 订单详情在事务内加载，提交后刷新收据；收据失败只体现在 OrderChange.receipt
// ==========================================

use std::path::PathBuf;
use std::sync::Arc;

use rusqlite::Transaction;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::api::error::{ApiError, ApiResult};
use crate::api::store::Store;
use crate::api::validator;
use crate::app::auth::IdentityProvider;
use crate::config::config_manager::ConfigManager;
use crate::domain::action_log::ActionLog;
use crate::domain::order::{Order, OrderDetail};
use crate::domain::types::OrderStatus;
use crate::engine::lifecycle::{ItemRequest, OrderLifecycle, ProductRef};
use crate::engine::receipt::{Receipt, ReceiptOutcome, ReceiptPublisher};
use crate::repository::action_log_repo::ActionLogRepository;
use crate::repository::order_repo::{self, OrderRepository};

// ==========================================
// 请求/响应类型
// ==========================================

/// 订单项（按商品主键）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderItemInput {
    pub product_id: i64,
    pub quantity: i64,
}

/// 创建订单请求
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateOrderRequest {
    pub client_id: i64,
    #[serde(default)]
    pub status: OrderStatus,
    pub items: Vec<OrderItemInput>,
}

/// 表单创建订单: 客户按姓名定位，订单项为 JSON 文本
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderForm {
    pub client_first_name: String,
    pub client_last_name: String,
    pub status: String,
    pub items_json: String,
}

/// 订单变更结果: 订单最新视图 + 收据旁路结果
#[derive(Debug, Clone, Serialize)]
pub struct OrderChange {
    pub order: OrderDetail,
    pub receipt: ReceiptOutcome,
}

fn to_item_requests(items: &[OrderItemInput]) -> ApiResult<Vec<ItemRequest>> {
    let pairs: Vec<(i64, i64)> = items.iter().map(|i| (i.product_id, i.quantity)).collect();
    validator::validate_id_items(&pairs)
}

// ==========================================
// OrderApi - 订单 API
// ==========================================

/// 订单API
///
/// 职责：
/// 1. 订单与订单项写操作（库存联动由 OrderLifecycle 保证）
/// 2. 收据刷新/删除（旁路，失败不影响结果）
/// 3. 订单操作历史查询
pub struct OrderApi {
    store: Store,
    lifecycle: Arc<OrderLifecycle>,
    order_repo: Arc<OrderRepository>,
    action_log_repo: Arc<ActionLogRepository>,
    receipts: ReceiptPublisher,
    config: Arc<ConfigManager>,
    identity: Arc<dyn IdentityProvider>,
}

impl OrderApi {
    pub fn new(
        store: Store,
        lifecycle: Arc<OrderLifecycle>,
        receipts: ReceiptPublisher,
        config: Arc<ConfigManager>,
        identity: Arc<dyn IdentityProvider>,
    ) -> Self {
        let order_repo = Arc::new(OrderRepository::new(store.connection()));
        let action_log_repo = Arc::new(ActionLogRepository::new(store.connection()));
        Self {
            store,
            lifecycle,
            order_repo,
            action_log_repo,
            receipts,
            config,
            identity,
        }
    }

    // ==========================================
    // 创建
    // ==========================================

    /// 创建订单（按商品主键）
    ///
    /// # 错误
    /// - ValidationError: 数量非正
    /// - ClientNotFound / ProductNotFound / InsufficientStock
    pub fn create_order(&self, request: CreateOrderRequest) -> ApiResult<OrderChange> {
        let items = to_item_requests(&request.items)?;
        let actor = self.identity.actor();

        let detail = self.write_order(|tx| {
            Ok(self
                .lifecycle
                .create_order(tx, request.client_id, request.status, &items, &actor)?)
        })?;

        Ok(self.after_change(detail))
    }

    /// 表单创建订单（客户按姓名，订单项按商品名称）
    pub fn create_order_from_form(&self, form: OrderForm) -> ApiResult<OrderChange> {
        // 先校验全部输入，再进入事务
        let status = validator::parse_status(&form.status)?;
        let items = validator::parse_items_json(&form.items_json)?;
        let (first, last) = validator::require_name_criteria(
            Some(&form.client_first_name),
            Some(&form.client_last_name),
        )?;
        let actor = self.identity.actor();

        let detail = self.write_order(|tx| {
            let client = self.lifecycle.resolve_client_by_name(tx, first, last)?;
            Ok(self
                .lifecycle
                .create_order(tx, client.id, status, &items, &actor)?)
        })?;

        Ok(self.after_change(detail))
    }

    // ==========================================
    // 订单项
    // ==========================================

    pub fn add_item(&self, identifier: &str, product_id: i64, quantity: i64) -> ApiResult<OrderChange> {
        self.add(identifier, ProductRef::Id(product_id), quantity)
    }

    pub fn add_item_by_name(
        &self,
        identifier: &str,
        product_name: &str,
        quantity: i64,
    ) -> ApiResult<OrderChange> {
        let name = validator::require_text("商品名称", product_name)?;
        self.add(identifier, ProductRef::Name(name.to_string()), quantity)
    }

    fn add(&self, identifier: &str, product: ProductRef, quantity: i64) -> ApiResult<OrderChange> {
        validator::require_positive_quantity(quantity)?;
        let actor = self.identity.actor();

        let detail = self.write_order(|tx| {
            Ok(self
                .lifecycle
                .add_item(tx, identifier, &product, quantity, &actor)?)
        })?;

        Ok(self.after_change(detail))
    }

    pub fn update_item_quantity(
        &self,
        identifier: &str,
        product_id: i64,
        quantity: i64,
    ) -> ApiResult<OrderChange> {
        self.set_quantity(identifier, ProductRef::Id(product_id), quantity)
    }

    pub fn update_item_quantity_by_name(
        &self,
        identifier: &str,
        product_name: &str,
        quantity: i64,
    ) -> ApiResult<OrderChange> {
        let name = validator::require_text("商品名称", product_name)?;
        self.set_quantity(identifier, ProductRef::Name(name.to_string()), quantity)
    }

    fn set_quantity(
        &self,
        identifier: &str,
        product: ProductRef,
        quantity: i64,
    ) -> ApiResult<OrderChange> {
        validator::require_non_negative_quantity(quantity)?;
        let actor = self.identity.actor();

        let detail = self.write_order(|tx| {
            Ok(self
                .lifecycle
                .set_item_quantity(tx, identifier, &product, quantity, &actor)?)
        })?;

        Ok(self.after_change(detail))
    }

    pub fn remove_item(&self, identifier: &str, product_id: i64) -> ApiResult<OrderChange> {
        self.remove(identifier, ProductRef::Id(product_id))
    }

    pub fn remove_item_by_name(&self, identifier: &str, product_name: &str) -> ApiResult<OrderChange> {
        let name = validator::require_text("商品名称", product_name)?;
        self.remove(identifier, ProductRef::Name(name.to_string()))
    }

    fn remove(&self, identifier: &str, product: ProductRef) -> ApiResult<OrderChange> {
        let actor = self.identity.actor();

        let detail = self.write_order(|tx| {
            Ok(self.lifecycle.remove_item(tx, identifier, &product, &actor)?)
        })?;

        Ok(self.after_change(detail))
    }

    /// 整单替换订单项（先释放原订单项库存，再按新清单扣减）
    pub fn replace_items(&self, identifier: &str, items: Vec<OrderItemInput>) -> ApiResult<OrderChange> {
        let items = to_item_requests(&items)?;
        let actor = self.identity.actor();

        let detail = self.write_order(|tx| {
            Ok(self
                .lifecycle
                .replace_items(tx, identifier, &items, &actor)?)
        })?;

        Ok(self.after_change(detail))
    }

    // ==========================================
    // 状态与删除
    // ==========================================

    /// 设置订单状态（无迁移规则）
    pub fn update_status(&self, identifier: &str, status: OrderStatus) -> ApiResult<OrderDetail> {
        let actor = self.identity.actor();

        self.write_order(|tx| {
            Ok(self.lifecycle.set_status(tx, identifier, status, &actor)?)
        })
    }

    /// 删除订单（库存全部回补）
    ///
    /// # 返回
    /// - Ok(true): 已删除
    /// - Ok(false): 订单不存在
    pub fn delete_order(&self, identifier: &str) -> ApiResult<bool> {
        let actor = self.identity.actor();

        let purged = self.store.write(|tx| {
            Ok(self.lifecycle.purge_order(tx, identifier, &actor)?)
        })?;

        match purged {
            Some(order) => {
                self.receipts.discard(&order.identifier);
                Ok(true)
            }
            None => {
                info!(identifier, "删除订单: 订单不存在");
                Ok(false)
            }
        }
    }

    // ==========================================
    // 收据与历史
    // ==========================================

    /// 显式（重新）生成收据；此处收据失败向上返回
    pub fn generate_receipt(&self, identifier: &str) -> ApiResult<Option<PathBuf>> {
        let detail = self.load_detail(identifier)?;
        let supplier = self
            .config
            .receipt_supplier()
            .map_err(|e| ApiError::InternalError(format!("读取收据配置失败: {}", e)))?;
        let receipt = Receipt::from_detail(&detail, &supplier, chrono::Local::now().naive_local());

        let path = self
            .receipts
            .render_strict(&receipt)
            .map_err(|e| ApiError::InternalError(format!("收据生成失败: {}", e)))?;

        info!(identifier = %detail.order.identifier, rendered = path.is_some(), "收据已生成");
        Ok(path)
    }

    /// 已生成收据的位置
    pub fn receipt_path(&self, identifier: &str) -> ApiResult<PathBuf> {
        let detail = self.load_detail(identifier)?;
        self.receipts
            .locate(&detail.order.identifier)
            .ok_or_else(|| ApiError::NotFound(format!("订单{}的收据不存在", detail.order.identifier)))
    }

    /// 订单操作历史（订单删除后仍可查询）
    pub fn order_history(&self, identifier: &str) -> ApiResult<Vec<ActionLog>> {
        let identifier = validator::require_text("订单编号", identifier)?;
        Ok(self
            .action_log_repo
            .find_by_order(&order_repo::normalize_identifier(identifier))?)
    }

    // ==========================================
    // 内部
    // ==========================================

    fn load_detail(&self, identifier: &str) -> ApiResult<OrderDetail> {
        self.order_repo
            .find_detail_by_identifier(identifier)?
            .ok_or_else(|| ApiError::OrderNotFound(identifier.trim().to_string()))
    }

    /// 在同一事务内执行变更并加载订单详情，返回的详情即提交时的状态
    fn write_order<F>(&self, f: F) -> ApiResult<OrderDetail>
    where
        F: FnOnce(&Transaction<'_>) -> ApiResult<Order>,
    {
        self.store.write(|tx| {
            let order = f(tx)?;
            Ok(order_repo::load_detail(tx, order)?)
        })
    }

    fn after_change(&self, detail: OrderDetail) -> OrderChange {
        let receipt = self.refresh_receipt(&detail);
        OrderChange {
            order: detail,
            receipt,
        }
    }

    /// 收据刷新: 失败只记录 warn，永不返回错误
    fn refresh_receipt(&self, detail: &OrderDetail) -> ReceiptOutcome {
        if !self.receipts.is_configured() {
            return ReceiptOutcome::Skipped;
        }
        let supplier = match self.config.receipt_supplier() {
            Ok(supplier) => supplier,
            Err(e) => {
                warn!(identifier = %detail.order.identifier, error = %e, "读取收据配置失败（已忽略）");
                return ReceiptOutcome::Failed(e.to_string());
            }
        };
        let receipt = Receipt::from_detail(detail, &supplier, chrono::Local::now().naive_local());
        self.receipts.refresh(&receipt)
    }
}
