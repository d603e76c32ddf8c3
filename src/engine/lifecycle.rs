// ==========================================
// 零售订单管理系统 - 订单生命周期
// ==========================================
// 职责: 订单/订单项存在性变化 + 库存联动 + 审计日志
// 红线: Engine 不拼 SQL，只调用 repository 连接级函数
// 约定: 所有方法在调用方的 IMMEDIATE 事务内执行，不自行提交；
//       任一步失败由调用方回滚整个事务
// ==========================================
// 订单创建: 占位编号(序号0) -> 取得主键 -> 回写正式编号 -> 写入订单项
//           全部在同一事务内，失败不会留下零订单项的订单
// ==========================================

use crate::domain::action_log::{ActionLog, ActionType};
use crate::domain::client::Client;
use crate::domain::order::{Order, OrderItem};
use crate::domain::product::Product;
use crate::domain::types::OrderStatus;
use crate::engine::error::{EngineError, EngineResult};
use crate::engine::identifier::{IdentifierGenerator, Initials};
use crate::engine::inventory::{InventoryLedger, StockMovement};
use crate::repository::{action_log_repo, client_repo, order_repo, product_repo};
use rusqlite::Connection;
use serde_json::json;
use std::fmt;
use tracing::{info, instrument};

// ==========================================
// 请求类型
// ==========================================

/// 商品引用: 主键或名称（名称大小写不敏感精确匹配）
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProductRef {
    Id(i64),
    Name(String),
}

impl fmt::Display for ProductRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProductRef::Id(id) => write!(f, "{}", id),
            ProductRef::Name(name) => write!(f, "{}", name),
        }
    }
}

/// 订单项请求
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemRequest {
    pub product: ProductRef,
    pub quantity: i64,
}

impl ItemRequest {
    pub fn by_id(product_id: i64, quantity: i64) -> Self {
        Self {
            product: ProductRef::Id(product_id),
            quantity,
        }
    }

    pub fn by_name(name: impl Into<String>, quantity: i64) -> Self {
        Self {
            product: ProductRef::Name(name.into()),
            quantity,
        }
    }
}

/// 客户级联删除结果
#[derive(Debug, Clone)]
pub struct ClientPurge {
    pub client: Client,
    pub orders: Vec<Order>,
    pub movements: Vec<StockMovement>,
}

// ==========================================
// OrderLifecycle - 订单生命周期管理
// ==========================================
pub struct OrderLifecycle {
    identifiers: IdentifierGenerator,
    ledger: InventoryLedger,
}

impl OrderLifecycle {
    pub fn new() -> Self {
        Self {
            identifiers: IdentifierGenerator::new(),
            ledger: InventoryLedger::new(),
        }
    }

    // ==========================================
    // 解析（找不到即报错）
    // ==========================================

    pub fn resolve_client(&self, conn: &Connection, client_id: i64) -> EngineResult<Client> {
        client_repo::find_by_id(conn, client_id)?
            .ok_or_else(|| EngineError::ClientNotFound(client_id.to_string()))
    }

    pub fn resolve_client_by_name(
        &self,
        conn: &Connection,
        first_name: Option<&str>,
        last_name: Option<&str>,
    ) -> EngineResult<Client> {
        client_repo::find_first_by_name(conn, first_name, last_name)?.ok_or_else(|| {
            EngineError::ClientNotFound(
                [last_name, first_name]
                    .iter()
                    .flatten()
                    .copied()
                    .collect::<Vec<_>>()
                    .join(" "),
            )
        })
    }

    pub fn resolve_product(&self, conn: &Connection, product: &ProductRef) -> EngineResult<Product> {
        let found = match product {
            ProductRef::Id(id) => product_repo::find_by_id(conn, *id)?,
            ProductRef::Name(name) => product_repo::find_by_name(conn, name.trim())?,
        };
        found.ok_or_else(|| EngineError::ProductNotFound(product.to_string()))
    }

    pub fn resolve_order(&self, conn: &Connection, identifier: &str) -> EngineResult<Order> {
        order_repo::find_by_identifier(conn, identifier)?
            .ok_or_else(|| EngineError::OrderNotFound(identifier.trim().to_string()))
    }

    fn resolve_item(
        &self,
        conn: &Connection,
        order: &Order,
        product: &Product,
    ) -> EngineResult<OrderItem> {
        order_repo::find_item(conn, order.id, product.id)?.ok_or_else(|| EngineError::ItemNotFound {
            order: order.identifier.clone(),
            product: product.name.clone(),
        })
    }

    /// 解析并合并同一商品的多条请求（保持首次出现顺序）
    fn merge_requests(
        &self,
        conn: &Connection,
        items: &[ItemRequest],
    ) -> EngineResult<Vec<(Product, i64)>> {
        let mut merged: Vec<(Product, i64)> = Vec::with_capacity(items.len());
        for request in items {
            if request.quantity <= 0 {
                return Err(EngineError::InvalidQuantity(request.quantity));
            }
            let product = self.resolve_product(conn, &request.product)?;
            match merged.iter_mut().find(|(p, _)| p.id == product.id) {
                Some((_, qty)) => {
                    *qty = qty
                        .checked_add(request.quantity)
                        .ok_or(EngineError::InvalidQuantity(request.quantity))?;
                }
                None => merged.push((product, request.quantity)),
            }
        }
        Ok(merged)
    }

    /// 写入订单项（已存在则合并数量），库存校验只针对增量
    fn place_item(
        &self,
        conn: &Connection,
        order: &Order,
        product: &Product,
        quantity: i64,
    ) -> EngineResult<StockMovement> {
        let existing = order_repo::find_item(conn, order.id, product.id)?;
        let total = match &existing {
            Some(item) => item
                .quantity
                .checked_add(quantity)
                .ok_or(EngineError::InvalidQuantity(quantity))?,
            None => quantity,
        };
        let movement = self.ledger.withdraw(conn, product.id, quantity)?;
        match existing {
            Some(item) => order_repo::set_item_quantity(conn, item.id, total)?,
            None => {
                order_repo::insert_item(conn, order.id, product.id, quantity)?;
            }
        }
        Ok(movement)
    }

    /// 回补订单全部订单项的库存并删除订单项
    fn release_items(&self, conn: &Connection, order: &Order) -> EngineResult<Vec<StockMovement>> {
        let items = order_repo::items_of(conn, order.id)?;
        let mut movements = Vec::with_capacity(items.len());
        for item in &items {
            movements.push(self.ledger.restore(conn, item.product_id, item.quantity)?);
        }
        order_repo::delete_items_of(conn, order.id)?;
        Ok(movements)
    }

    fn reload(&self, conn: &Connection, order_id: i64) -> EngineResult<Order> {
        order_repo::find_by_id(conn, order_id)?
            .ok_or_else(|| EngineError::OrderNotFound(order_id.to_string()))
    }

    // ==========================================
    // 订单创建
    // ==========================================

    /// 创建订单
    ///
    /// # 错误
    /// - `ClientNotFound` / `ProductNotFound` / `InsufficientStock` / `InvalidQuantity`
    /// - `IdentifierOverflow`: 主键过大
    #[instrument(skip(self, conn, items), fields(item_count = items.len()))]
    pub fn create_order(
        &self,
        conn: &Connection,
        client_id: i64,
        status: OrderStatus,
        items: &[ItemRequest],
        actor: &str,
    ) -> EngineResult<Order> {
        let client = self.resolve_client(conn, client_id)?;
        let initials = Initials::of(&client);

        // 1. 占位编号落库以取得主键
        let placeholder = self.identifiers.placeholder(initials);
        let created_at = chrono::Local::now().naive_local();
        let order_id = order_repo::insert_order(conn, client.id, status, &placeholder, created_at)?;

        // 2. 按主键回写正式编号
        let identifier = self.identifiers.generate_checked(initials, order_id)?;
        order_repo::set_identifier(conn, order_id, &identifier)?;
        let order = self.reload(conn, order_id)?;

        // 3. 订单项 + 库存
        let merged = self.merge_requests(conn, items)?;
        let mut movements = Vec::with_capacity(merged.len());
        for (product, quantity) in &merged {
            movements.push(self.place_item(conn, &order, product, *quantity)?);
        }

        action_log_repo::insert(
            conn,
            &ActionLog::new(ActionType::CreateOrder, actor)
                .with_order(&identifier)
                .with_payload(json!({
                    "client_id": client.id,
                    "status": status.to_db_str(),
                    "movements": movements,
                })),
        )?;

        info!(
            identifier = %identifier,
            client_id = client.id,
            item_count = merged.len(),
            "订单已创建"
        );
        Ok(order)
    }

    // ==========================================
    // 订单项变更
    // ==========================================

    /// 添加订单项（同商品合并数量）
    #[instrument(skip(self, conn))]
    pub fn add_item(
        &self,
        conn: &Connection,
        identifier: &str,
        product: &ProductRef,
        quantity: i64,
        actor: &str,
    ) -> EngineResult<Order> {
        if quantity <= 0 {
            return Err(EngineError::InvalidQuantity(quantity));
        }
        let order = self.resolve_order(conn, identifier)?;
        let product = self.resolve_product(conn, product)?;
        let movement = self.place_item(conn, &order, &product, quantity)?;

        action_log_repo::insert(
            conn,
            &ActionLog::new(ActionType::AddItem, actor)
                .with_order(&order.identifier)
                .with_payload(json!({ "quantity": quantity, "movements": [movement] })),
        )?;

        info!(
            identifier = %order.identifier,
            product_id = product.id,
            quantity,
            stock_after = movement.stock_after,
            "订单项已添加"
        );
        Ok(order)
    }

    /// 设置订单项数量；数量为 0 等价于删除订单项
    #[instrument(skip(self, conn))]
    pub fn set_item_quantity(
        &self,
        conn: &Connection,
        identifier: &str,
        product: &ProductRef,
        quantity: i64,
        actor: &str,
    ) -> EngineResult<Order> {
        if quantity < 0 {
            return Err(EngineError::InvalidQuantity(quantity));
        }
        let order = self.resolve_order(conn, identifier)?;
        let product = self.resolve_product(conn, product)?;
        let item = self.resolve_item(conn, &order, &product)?;

        let movement = if quantity == 0 {
            let movement = self.ledger.restore(conn, product.id, item.quantity)?;
            order_repo::delete_item(conn, item.id)?;
            movement
        } else {
            let movement = self.ledger.adjust(conn, product.id, quantity - item.quantity)?;
            order_repo::set_item_quantity(conn, item.id, quantity)?;
            movement
        };

        action_log_repo::insert(
            conn,
            &ActionLog::new(ActionType::UpdateItemQuantity, actor)
                .with_order(&order.identifier)
                .with_payload(json!({
                    "from": item.quantity,
                    "to": quantity,
                    "movements": [movement],
                })),
        )?;

        info!(
            identifier = %order.identifier,
            product_id = product.id,
            from = item.quantity,
            to = quantity,
            stock_after = movement.stock_after,
            "订单项数量已更新"
        );
        Ok(order)
    }

    /// 删除订单项并回补库存
    #[instrument(skip(self, conn))]
    pub fn remove_item(
        &self,
        conn: &Connection,
        identifier: &str,
        product: &ProductRef,
        actor: &str,
    ) -> EngineResult<Order> {
        let order = self.resolve_order(conn, identifier)?;
        let product = self.resolve_product(conn, product)?;
        let item = self.resolve_item(conn, &order, &product)?;

        let movement = self.ledger.restore(conn, product.id, item.quantity)?;
        order_repo::delete_item(conn, item.id)?;

        action_log_repo::insert(
            conn,
            &ActionLog::new(ActionType::RemoveItem, actor)
                .with_order(&order.identifier)
                .with_payload(json!({ "movements": [movement] })),
        )?;

        info!(
            identifier = %order.identifier,
            product_id = product.id,
            stock_after = movement.stock_after,
            "订单项已删除"
        );
        Ok(order)
    }

    /// 整单替换订单项: 先全部释放，再按新清单扣减
    #[instrument(skip(self, conn, items), fields(item_count = items.len()))]
    pub fn replace_items(
        &self,
        conn: &Connection,
        identifier: &str,
        items: &[ItemRequest],
        actor: &str,
    ) -> EngineResult<Order> {
        let order = self.resolve_order(conn, identifier)?;
        let mut movements = self.release_items(conn, &order)?;

        let merged = self.merge_requests(conn, items)?;
        for (product, quantity) in &merged {
            movements.push(self.place_item(conn, &order, product, *quantity)?);
        }

        action_log_repo::insert(
            conn,
            &ActionLog::new(ActionType::ReplaceItems, actor)
                .with_order(&order.identifier)
                .with_payload(json!({ "movements": movements })),
        )?;

        info!(identifier = %order.identifier, item_count = merged.len(), "订单项已整体替换");
        Ok(order)
    }

    /// 设置订单状态（无状态迁移规则）
    #[instrument(skip(self, conn))]
    pub fn set_status(
        &self,
        conn: &Connection,
        identifier: &str,
        status: OrderStatus,
        actor: &str,
    ) -> EngineResult<Order> {
        let order = self.resolve_order(conn, identifier)?;
        order_repo::set_status(conn, order.id, status)?;

        action_log_repo::insert(
            conn,
            &ActionLog::new(ActionType::UpdateStatus, actor)
                .with_order(&order.identifier)
                .with_detail(format!("{} -> {}", order.status, status)),
        )?;

        info!(identifier = %order.identifier, from = %order.status, to = %status, "订单状态已更新");
        self.reload(conn, order.id)
    }

    // ==========================================
    // 删除（库存全部回补）
    // ==========================================

    /// 删除订单；订单不存在返回 Ok(None)
    #[instrument(skip(self, conn))]
    pub fn purge_order(
        &self,
        conn: &Connection,
        identifier: &str,
        actor: &str,
    ) -> EngineResult<Option<Order>> {
        let Some(order) = order_repo::find_by_identifier(conn, identifier)? else {
            return Ok(None);
        };

        let movements = self.release_items(conn, &order)?;
        order_repo::delete_order(conn, order.id)?;

        action_log_repo::insert(
            conn,
            &ActionLog::new(ActionType::DeleteOrder, actor)
                .with_order(&order.identifier)
                .with_payload(json!({ "movements": movements })),
        )?;

        info!(identifier = %order.identifier, released = movements.len(), "订单已删除");
        Ok(Some(order))
    }

    /// 删除客户: 级联删除其全部订单并回补库存
    #[instrument(skip(self, conn))]
    pub fn purge_client(
        &self,
        conn: &Connection,
        client_id: i64,
        actor: &str,
    ) -> EngineResult<ClientPurge> {
        let client = self.resolve_client(conn, client_id)?;
        let orders = order_repo::list_by_client(conn, client.id)?;

        let mut movements = Vec::new();
        for order in &orders {
            movements.extend(self.release_items(conn, order)?);
            order_repo::delete_order(conn, order.id)?;
        }
        client_repo::delete(conn, client.id)?;

        let identifiers: Vec<&str> = orders.iter().map(|o| o.identifier.as_str()).collect();
        action_log_repo::insert(
            conn,
            &ActionLog::new(ActionType::DeleteClient, actor)
                .with_payload(json!({
                    "client_id": client.id,
                    "orders": identifiers,
                    "movements": movements,
                }))
                .with_detail(client.display_name()),
        )?;

        info!(
            client_id = client.id,
            order_count = orders.len(),
            "客户已删除（级联订单）"
        );
        Ok(ClientPurge {
            client,
            orders,
            movements,
        })
    }
}

impl Default for OrderLifecycle {
    fn default() -> Self {
        Self::new()
    }
}
