// ==========================================
// 零售订单管理系统 - 库存账本
// ==========================================
// 职责: 订单项增减与库存增减严格互逆
// 红线: 不允许"先读再写"库存；扣减一律走条件更新
//       UPDATE ... SET stock = stock - q WHERE stock >= q
// 约定: 所有方法接收调用方事务内的 &Connection，不自行提交
// ==========================================

use crate::engine::error::{EngineError, EngineResult};
use crate::repository::product_repo;
use rusqlite::Connection;
use serde::Serialize;
use tracing::{debug, instrument, warn};

/// 一次库存变动（delta 为库存变化量: 扣减为负，回补为正）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StockMovement {
    pub product_id: i64,
    pub delta: i64,
    pub stock_after: i64,
}

// ==========================================
// InventoryLedger - 库存账本
// ==========================================
pub struct InventoryLedger {}

impl InventoryLedger {
    pub fn new() -> Self {
        Self {}
    }

    /// 扣减库存（订单项新增/数量增加）
    ///
    /// # 错误
    /// - `InvalidQuantity`: quantity <= 0
    /// - `ProductNotFound`: 商品不存在
    /// - `InsufficientStock`: 库存不足（库存不变）
    #[instrument(skip(self, conn))]
    pub fn withdraw(
        &self,
        conn: &Connection,
        product_id: i64,
        quantity: i64,
    ) -> EngineResult<StockMovement> {
        if quantity <= 0 {
            return Err(EngineError::InvalidQuantity(quantity));
        }

        let rows = product_repo::withdraw_stock(conn, product_id, quantity)?;
        if rows == 0 {
            // 区分"商品不存在"与"库存不足"
            let product = product_repo::find_by_id(conn, product_id)?
                .ok_or_else(|| EngineError::ProductNotFound(product_id.to_string()))?;
            warn!(
                product_id,
                product_name = %product.name,
                requested = quantity,
                available = product.stock,
                "库存不足，拒绝扣减"
            );
            return Err(EngineError::InsufficientStock {
                product_id,
                product_name: product.name,
                requested: quantity,
                available: product.stock,
            });
        }

        let stock_after = self.current_stock(conn, product_id)?;
        debug!(product_id, quantity, stock_after, "库存扣减");
        Ok(StockMovement {
            product_id,
            delta: -quantity,
            stock_after,
        })
    }

    /// 回补库存（订单项删除/数量减少/订单删除）
    #[instrument(skip(self, conn))]
    pub fn restore(
        &self,
        conn: &Connection,
        product_id: i64,
        quantity: i64,
    ) -> EngineResult<StockMovement> {
        if quantity < 0 {
            return Err(EngineError::InvalidQuantity(quantity));
        }

        if quantity > 0 && product_repo::restore_stock(conn, product_id, quantity)? == 0 {
            return Err(EngineError::ProductNotFound(product_id.to_string()));
        }

        let stock_after = self.current_stock(conn, product_id)?;
        debug!(product_id, quantity, stock_after, "库存回补");
        Ok(StockMovement {
            product_id,
            delta: quantity,
            stock_after,
        })
    }

    /// 按订单项数量变化量调整库存
    ///
    /// item_delta > 0: 订单项增加 -> 扣减库存（仅校验增量）
    /// item_delta < 0: 订单项减少 -> 回补库存
    pub fn adjust(
        &self,
        conn: &Connection,
        product_id: i64,
        item_delta: i64,
    ) -> EngineResult<StockMovement> {
        if item_delta > 0 {
            self.withdraw(conn, product_id, item_delta)
        } else {
            self.restore(conn, product_id, -item_delta)
        }
    }

    fn current_stock(&self, conn: &Connection, product_id: i64) -> EngineResult<i64> {
        product_repo::stock_of(conn, product_id)?
            .ok_or_else(|| EngineError::ProductNotFound(product_id.to_string()))
    }
}

impl Default for InventoryLedger {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;
    use crate::repository::product_repo::ProductRecord;

    // ==========================================
    // 测试数据准备
    // ==========================================

    fn setup(stock: i64) -> (Connection, i64) {
        let conn = db::open_in_memory().unwrap();
        let product = product_repo::insert(
            &conn,
            &ProductRecord {
                name: "Молоко".to_string(),
                image: None,
                price: 89.9,
                stock,
            },
        )
        .unwrap();
        (conn, product.id)
    }

    #[test]
    fn test_withdraw_decrements_stock() {
        let (conn, id) = setup(10);
        let ledger = InventoryLedger::new();

        let movement = ledger.withdraw(&conn, id, 4).unwrap();
        assert_eq!(movement.delta, -4);
        assert_eq!(movement.stock_after, 6);
    }

    #[test]
    fn test_withdraw_exact_stock_reaches_zero() {
        let (conn, id) = setup(3);
        let ledger = InventoryLedger::new();

        let movement = ledger.withdraw(&conn, id, 3).unwrap();
        assert_eq!(movement.stock_after, 0);
    }

    #[test]
    fn test_insufficient_stock_leaves_stock_untouched() {
        let (conn, id) = setup(3);
        let ledger = InventoryLedger::new();

        let err = ledger.withdraw(&conn, id, 10).unwrap_err();
        match err {
            EngineError::InsufficientStock {
                product_id,
                product_name,
                requested,
                available,
            } => {
                assert_eq!(product_id, id);
                assert_eq!(product_name, "Молоко");
                assert_eq!(requested, 10);
                assert_eq!(available, 3);
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(product_repo::stock_of(&conn, id).unwrap(), Some(3));
    }

    #[test]
    fn test_withdraw_unknown_product() {
        let (conn, _) = setup(3);
        let ledger = InventoryLedger::new();

        assert!(matches!(
            ledger.withdraw(&conn, 9999, 1),
            Err(EngineError::ProductNotFound(_))
        ));
        assert!(matches!(
            ledger.restore(&conn, 9999, 1),
            Err(EngineError::ProductNotFound(_))
        ));
    }

    #[test]
    fn test_invalid_quantities() {
        let (conn, id) = setup(3);
        let ledger = InventoryLedger::new();

        assert!(matches!(
            ledger.withdraw(&conn, id, 0),
            Err(EngineError::InvalidQuantity(0))
        ));
        assert!(matches!(
            ledger.restore(&conn, id, -1),
            Err(EngineError::InvalidQuantity(-1))
        ));
    }

    #[test]
    fn test_adjust_is_inverse() {
        let (conn, id) = setup(10);
        let ledger = InventoryLedger::new();

        assert_eq!(ledger.adjust(&conn, id, 4).unwrap().stock_after, 6);
        assert_eq!(ledger.adjust(&conn, id, -2).unwrap().stock_after, 8);
        assert_eq!(ledger.adjust(&conn, id, 0).unwrap().stock_after, 8);
        assert_eq!(ledger.adjust(&conn, id, -2).unwrap().stock_after, 10);
    }
}
