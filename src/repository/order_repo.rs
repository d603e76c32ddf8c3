// ==========================================
// 零售订单管理系统 - 订单/订单项数据仓储
// ==========================================
// 红线: Repository 不含业务逻辑（库存联动在 engine::lifecycle）
// 关系加载: order -> client, order -> items -> product
// ==========================================

use crate::domain::order::{Order, OrderDetail, OrderItem, OrderLine};
use crate::domain::product::Product;
use crate::domain::types::OrderStatus;
use crate::repository::client_repo;
use crate::repository::error::{RepositoryError, RepositoryResult};
use chrono::NaiveDateTime;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::sync::{Arc, Mutex};

const ORDER_COLUMNS: &str = "id, status, client_id, identifier, created_at";

fn map_order(row: &Row<'_>) -> rusqlite::Result<Order> {
    let status: String = row.get(1)?;
    let status = status.parse::<OrderStatus>().map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(1, rusqlite::types::Type::Text, e.into())
    })?;
    Ok(Order {
        id: row.get(0)?,
        status,
        client_id: row.get(2)?,
        identifier: row.get(3)?,
        created_at: row.get(4)?,
    })
}

fn map_item(row: &Row<'_>) -> rusqlite::Result<OrderItem> {
    Ok(OrderItem {
        id: row.get(0)?,
        order_id: row.get(1)?,
        product_id: row.get(2)?,
        quantity: row.get(3)?,
    })
}

/// 订单编号统一为去空白的大写形式
pub fn normalize_identifier(identifier: &str) -> String {
    identifier.trim().to_uppercase()
}

// ==========================================
// 订单: 连接级操作
// ==========================================

/// 插入订单行，返回数据库分配的主键
pub fn insert_order(
    conn: &Connection,
    client_id: i64,
    status: OrderStatus,
    identifier: &str,
    created_at: NaiveDateTime,
) -> RepositoryResult<i64> {
    conn.execute(
        "INSERT INTO orders (status, client_id, identifier, created_at) VALUES (?1, ?2, ?3, ?4)",
        params![status.to_db_str(), client_id, identifier, created_at],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn set_identifier(conn: &Connection, order_id: i64, identifier: &str) -> RepositoryResult<()> {
    let rows = conn.execute(
        "UPDATE orders SET identifier = ?1 WHERE id = ?2",
        params![identifier, order_id],
    )?;
    if rows == 0 {
        return Err(RepositoryError::NotFound {
            entity: "Order".to_string(),
            id: order_id.to_string(),
        });
    }
    Ok(())
}

pub fn set_status(conn: &Connection, order_id: i64, status: OrderStatus) -> RepositoryResult<()> {
    let rows = conn.execute(
        "UPDATE orders SET status = ?1 WHERE id = ?2",
        params![status.to_db_str(), order_id],
    )?;
    if rows == 0 {
        return Err(RepositoryError::NotFound {
            entity: "Order".to_string(),
            id: order_id.to_string(),
        });
    }
    Ok(())
}

pub fn find_by_id(conn: &Connection, order_id: i64) -> RepositoryResult<Option<Order>> {
    let sql = format!("SELECT {} FROM orders WHERE id = ?1", ORDER_COLUMNS);
    let order = conn.query_row(&sql, params![order_id], map_order).optional()?;
    Ok(order)
}

pub fn find_by_identifier(conn: &Connection, identifier: &str) -> RepositoryResult<Option<Order>> {
    let sql = format!("SELECT {} FROM orders WHERE identifier = ?1", ORDER_COLUMNS);
    let order = conn
        .query_row(&sql, params![normalize_identifier(identifier)], map_order)
        .optional()?;
    Ok(order)
}

pub fn list(conn: &Connection, skip: i64, limit: i64) -> RepositoryResult<Vec<Order>> {
    let sql = format!(
        "SELECT {} FROM orders ORDER BY id LIMIT ?1 OFFSET ?2",
        ORDER_COLUMNS
    );
    let mut stmt = conn.prepare(&sql)?;
    let orders = stmt
        .query_map(params![limit, skip], map_order)?
        .collect::<Result<Vec<Order>, _>>()?;
    Ok(orders)
}

pub fn list_by_client(conn: &Connection, client_id: i64) -> RepositoryResult<Vec<Order>> {
    let sql = format!(
        "SELECT {} FROM orders WHERE client_id = ?1 ORDER BY id",
        ORDER_COLUMNS
    );
    let mut stmt = conn.prepare(&sql)?;
    let orders = stmt
        .query_map(params![client_id], map_order)?
        .collect::<Result<Vec<Order>, _>>()?;
    Ok(orders)
}

pub fn delete_order(conn: &Connection, order_id: i64) -> RepositoryResult<usize> {
    let rows = conn.execute("DELETE FROM orders WHERE id = ?1", params![order_id])?;
    Ok(rows)
}

pub fn count(conn: &Connection) -> RepositoryResult<i64> {
    let n = conn.query_row("SELECT COUNT(*) FROM orders", [], |row| row.get(0))?;
    Ok(n)
}

// ==========================================
// 订单项: 连接级操作
// ==========================================

pub fn items_of(conn: &Connection, order_id: i64) -> RepositoryResult<Vec<OrderItem>> {
    let mut stmt = conn.prepare(
        "SELECT id, order_id, product_id, quantity FROM order_items WHERE order_id = ?1 ORDER BY id",
    )?;
    let items = stmt
        .query_map(params![order_id], map_item)?
        .collect::<Result<Vec<OrderItem>, _>>()?;
    Ok(items)
}

pub fn find_item(
    conn: &Connection,
    order_id: i64,
    product_id: i64,
) -> RepositoryResult<Option<OrderItem>> {
    let item = conn
        .query_row(
            r#"SELECT id, order_id, product_id, quantity FROM order_items
               WHERE order_id = ?1 AND product_id = ?2
               ORDER BY id LIMIT 1"#,
            params![order_id, product_id],
            map_item,
        )
        .optional()?;
    Ok(item)
}

pub fn insert_item(
    conn: &Connection,
    order_id: i64,
    product_id: i64,
    quantity: i64,
) -> RepositoryResult<OrderItem> {
    conn.execute(
        "INSERT INTO order_items (order_id, product_id, quantity) VALUES (?1, ?2, ?3)",
        params![order_id, product_id, quantity],
    )?;
    Ok(OrderItem {
        id: conn.last_insert_rowid(),
        order_id,
        product_id,
        quantity,
    })
}

pub fn set_item_quantity(conn: &Connection, item_id: i64, quantity: i64) -> RepositoryResult<()> {
    let rows = conn.execute(
        "UPDATE order_items SET quantity = ?1 WHERE id = ?2",
        params![quantity, item_id],
    )?;
    if rows == 0 {
        return Err(RepositoryError::NotFound {
            entity: "OrderItem".to_string(),
            id: item_id.to_string(),
        });
    }
    Ok(())
}

pub fn delete_item(conn: &Connection, item_id: i64) -> RepositoryResult<usize> {
    let rows = conn.execute("DELETE FROM order_items WHERE id = ?1", params![item_id])?;
    Ok(rows)
}

pub fn delete_items_of(conn: &Connection, order_id: i64) -> RepositoryResult<usize> {
    let rows = conn.execute(
        "DELETE FROM order_items WHERE order_id = ?1",
        params![order_id],
    )?;
    Ok(rows)
}

/// 订单项合计（按商品）
pub fn total_quantity_for_product(conn: &Connection, product_id: i64) -> RepositoryResult<i64> {
    let n = conn.query_row(
        "SELECT COALESCE(SUM(quantity), 0) FROM order_items WHERE product_id = ?1",
        params![product_id],
        |row| row.get(0),
    )?;
    Ok(n)
}

// ==========================================
// 关系加载
// ==========================================

/// 加载订单完整视图（客户 + 订单项 + 商品）
pub fn load_detail(conn: &Connection, order: Order) -> RepositoryResult<OrderDetail> {
    let client = client_repo::find_by_id(conn, order.client_id)?.ok_or_else(|| {
        RepositoryError::NotFound {
            entity: "Client".to_string(),
            id: order.client_id.to_string(),
        }
    })?;

    let mut stmt = conn.prepare(
        r#"SELECT oi.id, oi.order_id, oi.product_id, oi.quantity,
                  p.id, p.name, p.image, p.price, p.stock
           FROM order_items oi
           JOIN products p ON p.id = oi.product_id
           WHERE oi.order_id = ?1
           ORDER BY oi.id"#,
    )?;
    let lines = stmt
        .query_map(params![order.id], |row| {
            Ok(OrderLine {
                item: map_item(row)?,
                product: Product {
                    id: row.get(4)?,
                    name: row.get(5)?,
                    image: row.get(6)?,
                    price: row.get(7)?,
                    stock: row.get(8)?,
                },
            })
        })?
        .collect::<Result<Vec<OrderLine>, _>>()?;

    Ok(OrderDetail {
        order,
        client,
        lines,
    })
}

// ==========================================
// OrderRepository - 订单仓储（只读视图）
// ==========================================

/// 订单仓储
/// 职责: 订单查询与关系加载；写入统一走 engine::lifecycle 事务
pub struct OrderRepository {
    conn: Arc<Mutex<Connection>>,
}

impl OrderRepository {
    /// 从已有连接创建仓储实例
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    /// 获取数据库连接
    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    pub fn find_detail_by_id(&self, order_id: i64) -> RepositoryResult<Option<OrderDetail>> {
        let conn = self.get_conn()?;
        match find_by_id(&conn, order_id)? {
            Some(order) => Ok(Some(load_detail(&conn, order)?)),
            None => Ok(None),
        }
    }

    pub fn find_detail_by_identifier(&self, identifier: &str) -> RepositoryResult<Option<OrderDetail>> {
        let conn = self.get_conn()?;
        match find_by_identifier(&conn, identifier)? {
            Some(order) => Ok(Some(load_detail(&conn, order)?)),
            None => Ok(None),
        }
    }

    pub fn list_details(&self, skip: i64, limit: i64) -> RepositoryResult<Vec<OrderDetail>> {
        let conn = self.get_conn()?;
        list(&conn, skip, limit)?
            .into_iter()
            .map(|order| load_detail(&conn, order))
            .collect()
    }

    pub fn list_by_client(&self, client_id: i64) -> RepositoryResult<Vec<Order>> {
        let conn = self.get_conn()?;
        list_by_client(&conn, client_id)
    }

    pub fn count(&self) -> RepositoryResult<i64> {
        let conn = self.get_conn()?;
        count(&conn)
    }
}
