// ==========================================
// 零售订单管理系统 - 商品数据仓储
// ==========================================
// 红线: Repository 不含业务逻辑（库存规则在 engine::inventory）
// 约定: 库存扣减只提供“条件更新”原语，不提供读后写
// ==========================================

use crate::domain::product::Product;
use crate::repository::error::{RepositoryError, RepositoryResult};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::sync::{Arc, Mutex};

const PRODUCT_COLUMNS: &str = "id, name, image, price, stock";

/// 新商品字段（不含主键）
#[derive(Debug, Clone)]
pub struct ProductRecord {
    pub name: String,
    pub image: Option<String>,
    pub price: f64,
    pub stock: i64,
}

fn map_row(row: &Row<'_>) -> rusqlite::Result<Product> {
    Ok(Product {
        id: row.get(0)?,
        name: row.get(1)?,
        image: row.get(2)?,
        price: row.get(3)?,
        stock: row.get(4)?,
    })
}

// ==========================================
// 连接级操作
// ==========================================

pub fn insert(conn: &Connection, record: &ProductRecord) -> RepositoryResult<Product> {
    conn.execute(
        "INSERT INTO products (name, image, price, stock) VALUES (?1, ?2, ?3, ?4)",
        params![record.name, record.image, record.price, record.stock],
    )?;
    let id = conn.last_insert_rowid();
    find_by_id(conn, id)?.ok_or_else(|| RepositoryError::NotFound {
        entity: "Product".to_string(),
        id: id.to_string(),
    })
}

pub fn find_by_id(conn: &Connection, product_id: i64) -> RepositoryResult<Option<Product>> {
    let sql = format!("SELECT {} FROM products WHERE id = ?1", PRODUCT_COLUMNS);
    let product = conn
        .query_row(&sql, params![product_id], map_row)
        .optional()?;
    Ok(product)
}

/// 名称精确匹配（大小写不敏感），取主键最小的一条
pub fn find_by_name(conn: &Connection, name: &str) -> RepositoryResult<Option<Product>> {
    let sql = format!(
        "SELECT {} FROM products WHERE fold_case(name) = fold_case(?1) ORDER BY id LIMIT 1",
        PRODUCT_COLUMNS
    );
    let product = conn.query_row(&sql, params![name], map_row).optional()?;
    Ok(product)
}

/// 名称子串匹配（大小写不敏感）
pub fn search_by_fragment(conn: &Connection, fragment: &str) -> RepositoryResult<Vec<Product>> {
    let sql = format!(
        "SELECT {} FROM products WHERE instr(fold_case(name), fold_case(?1)) > 0 ORDER BY id",
        PRODUCT_COLUMNS
    );
    let mut stmt = conn.prepare(&sql)?;
    let products = stmt
        .query_map(params![fragment], map_row)?
        .collect::<Result<Vec<Product>, _>>()?;
    Ok(products)
}

pub fn list(conn: &Connection, skip: i64, limit: i64) -> RepositoryResult<Vec<Product>> {
    let sql = format!(
        "SELECT {} FROM products ORDER BY id LIMIT ?1 OFFSET ?2",
        PRODUCT_COLUMNS
    );
    let mut stmt = conn.prepare(&sql)?;
    let products = stmt
        .query_map(params![limit, skip], map_row)?
        .collect::<Result<Vec<Product>, _>>()?;
    Ok(products)
}

/// 整体更新（名称/图片/单价/库存）
pub fn update(conn: &Connection, product: &Product) -> RepositoryResult<()> {
    let rows_affected = conn.execute(
        "UPDATE products SET name = ?1, image = ?2, price = ?3, stock = ?4 WHERE id = ?5",
        params![
            product.name,
            product.image,
            product.price,
            product.stock,
            product.id,
        ],
    )?;

    if rows_affected == 0 {
        return Err(RepositoryError::NotFound {
            entity: "Product".to_string(),
            id: product.id.to_string(),
        });
    }
    Ok(())
}

pub fn delete(conn: &Connection, product_id: i64) -> RepositoryResult<usize> {
    let rows = conn.execute("DELETE FROM products WHERE id = ?1", params![product_id])?;
    Ok(rows)
}

/// 条件扣减库存: 仅当 stock >= quantity 时扣减
///
/// # 返回
/// - Ok(1): 扣减成功
/// - Ok(0): 库存不足或商品不存在（由调用方区分）
pub fn withdraw_stock(conn: &Connection, product_id: i64, quantity: i64) -> RepositoryResult<usize> {
    let rows = conn.execute(
        "UPDATE products SET stock = stock - ?1 WHERE id = ?2 AND stock >= ?1",
        params![quantity, product_id],
    )?;
    Ok(rows)
}

/// 回补库存
pub fn restore_stock(conn: &Connection, product_id: i64, quantity: i64) -> RepositoryResult<usize> {
    let rows = conn.execute(
        "UPDATE products SET stock = stock + ?1 WHERE id = ?2",
        params![quantity, product_id],
    )?;
    Ok(rows)
}

/// 当前库存（商品不存在返回 None）
pub fn stock_of(conn: &Connection, product_id: i64) -> RepositoryResult<Option<i64>> {
    let stock = conn
        .query_row(
            "SELECT stock FROM products WHERE id = ?1",
            params![product_id],
            |row| row.get(0),
        )
        .optional()?;
    Ok(stock)
}

/// 引用该商品的订单项数量
pub fn count_item_references(conn: &Connection, product_id: i64) -> RepositoryResult<i64> {
    let n = conn.query_row(
        "SELECT COUNT(*) FROM order_items WHERE product_id = ?1",
        params![product_id],
        |row| row.get(0),
    )?;
    Ok(n)
}

pub fn count(conn: &Connection) -> RepositoryResult<i64> {
    let n = conn.query_row("SELECT COUNT(*) FROM products", [], |row| row.get(0))?;
    Ok(n)
}

// ==========================================
// ProductRepository - 商品仓储
// ==========================================

/// 商品仓储
/// 职责: 管理 products 表的 CRUD 与名称检索
pub struct ProductRepository {
    conn: Arc<Mutex<Connection>>,
}

impl ProductRepository {
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

    pub fn insert(&self, record: &ProductRecord) -> RepositoryResult<Product> {
        let conn = self.get_conn()?;
        insert(&conn, record)
    }

    pub fn find_by_id(&self, product_id: i64) -> RepositoryResult<Option<Product>> {
        let conn = self.get_conn()?;
        find_by_id(&conn, product_id)
    }

    pub fn find_by_name(&self, name: &str) -> RepositoryResult<Option<Product>> {
        let conn = self.get_conn()?;
        find_by_name(&conn, name)
    }

    pub fn search_by_fragment(&self, fragment: &str) -> RepositoryResult<Vec<Product>> {
        let conn = self.get_conn()?;
        search_by_fragment(&conn, fragment)
    }

    pub fn list(&self, skip: i64, limit: i64) -> RepositoryResult<Vec<Product>> {
        let conn = self.get_conn()?;
        list(&conn, skip, limit)
    }

    pub fn update(&self, product: &Product) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        update(&conn, product)
    }

    pub fn count(&self) -> RepositoryResult<i64> {
        let conn = self.get_conn()?;
        count(&conn)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup() -> Connection {
        crate::db::open_in_memory().unwrap()
    }

    fn record(name: &str, stock: i64) -> ProductRecord {
        ProductRecord {
            name: name.to_string(),
            image: None,
            price: 100.0,
            stock,
        }
    }

    #[test]
    fn test_withdraw_stock_is_conditional() {
        let conn = setup();
        let p = insert(&conn, &record("Чай", 5)).unwrap();

        assert_eq!(withdraw_stock(&conn, p.id, 3).unwrap(), 1);
        assert_eq!(stock_of(&conn, p.id).unwrap(), Some(2));

        // 库存不足: 不变更
        assert_eq!(withdraw_stock(&conn, p.id, 3).unwrap(), 0);
        assert_eq!(stock_of(&conn, p.id).unwrap(), Some(2));

        // 恰好用尽
        assert_eq!(withdraw_stock(&conn, p.id, 2).unwrap(), 1);
        assert_eq!(stock_of(&conn, p.id).unwrap(), Some(0));

        assert_eq!(restore_stock(&conn, p.id, 4).unwrap(), 1);
        assert_eq!(stock_of(&conn, p.id).unwrap(), Some(4));
    }

    #[test]
    fn test_withdraw_missing_product() {
        let conn = setup();
        assert_eq!(withdraw_stock(&conn, 42, 1).unwrap(), 0);
        assert_eq!(stock_of(&conn, 42).unwrap(), None);
    }

    #[test]
    fn test_negative_stock_rejected_by_schema() {
        let conn = setup();
        let mut p = insert(&conn, &record("Кофе", 1)).unwrap();
        p.stock = -1;
        let err = update(&conn, &p).unwrap_err();
        assert!(matches!(err, RepositoryError::CheckConstraintViolation(_)));
    }

    #[test]
    fn test_name_lookup_exact_vs_fragment() {
        let conn = setup();
        insert(&conn, &record("Чай чёрный", 1)).unwrap();
        insert(&conn, &record("Чай зелёный", 1)).unwrap();
        insert(&conn, &record("Кофе", 1)).unwrap();

        assert!(find_by_name(&conn, "чай").unwrap().is_none());
        let exact = find_by_name(&conn, "ЧАЙ ЧЁРНЫЙ").unwrap().unwrap();
        assert_eq!(exact.name, "Чай чёрный");

        let fragment = search_by_fragment(&conn, "ЧАЙ").unwrap();
        assert_eq!(fragment.len(), 2);
        assert!(search_by_fragment(&conn, "сок").unwrap().is_empty());
    }
}
