// ==========================================
// 零售订单管理系统 - 客户数据仓储
// ==========================================
// 红线: Repository 不含业务逻辑
// 约定: 模块级函数接收 &Connection，可在事务内复用；
//       ClientRepository 方法自行加锁后委托给模块级函数
// ==========================================

use crate::domain::client::Client;
use crate::repository::error::{RepositoryError, RepositoryResult};
use chrono::NaiveDate;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::sync::{Arc, Mutex};

const CLIENT_COLUMNS: &str =
    "id, first_name, last_name, middle_name, birth_date, phone, address";

/// 新客户字段（不含主键）
#[derive(Debug, Clone)]
pub struct ClientRecord {
    pub first_name: String,
    pub last_name: String,
    pub middle_name: String,
    pub birth_date: Option<NaiveDate>,
    pub phone: String,
    pub address: String,
}

fn map_row(row: &Row<'_>) -> rusqlite::Result<Client> {
    Ok(Client {
        id: row.get(0)?,
        first_name: row.get(1)?,
        last_name: row.get(2)?,
        middle_name: row.get(3)?,
        birth_date: row.get(4)?,
        phone: row.get(5)?,
        address: row.get(6)?,
    })
}

// ==========================================
// 连接级操作
// ==========================================

pub fn insert(conn: &Connection, record: &ClientRecord) -> RepositoryResult<Client> {
    conn.execute(
        r#"INSERT INTO clients (first_name, last_name, middle_name, birth_date, phone, address)
           VALUES (?1, ?2, ?3, ?4, ?5, ?6)"#,
        params![
            record.first_name,
            record.last_name,
            record.middle_name,
            record.birth_date,
            record.phone,
            record.address,
        ],
    )?;
    let id = conn.last_insert_rowid();
    find_by_id(conn, id)?.ok_or_else(|| RepositoryError::NotFound {
        entity: "Client".to_string(),
        id: id.to_string(),
    })
}

pub fn find_by_id(conn: &Connection, client_id: i64) -> RepositoryResult<Option<Client>> {
    let sql = format!("SELECT {} FROM clients WHERE id = ?1", CLIENT_COLUMNS);
    let client = conn
        .query_row(&sql, params![client_id], map_row)
        .optional()?;
    Ok(client)
}

/// 按名/姓精确匹配（大小写不敏感）；None 的条件不参与过滤
pub fn search_by_name(
    conn: &Connection,
    first_name: Option<&str>,
    last_name: Option<&str>,
) -> RepositoryResult<Vec<Client>> {
    let sql = format!(
        r#"SELECT {} FROM clients
           WHERE (?1 IS NULL OR fold_case(first_name) = fold_case(?1))
             AND (?2 IS NULL OR fold_case(last_name) = fold_case(?2))
           ORDER BY id"#,
        CLIENT_COLUMNS
    );
    let mut stmt = conn.prepare(&sql)?;
    let clients = stmt
        .query_map(params![first_name, last_name], map_row)?
        .collect::<Result<Vec<Client>, _>>()?;
    Ok(clients)
}

/// 按名/姓取第一条匹配
pub fn find_first_by_name(
    conn: &Connection,
    first_name: Option<&str>,
    last_name: Option<&str>,
) -> RepositoryResult<Option<Client>> {
    Ok(search_by_name(conn, first_name, last_name)?.into_iter().next())
}

pub fn list(conn: &Connection, skip: i64, limit: i64) -> RepositoryResult<Vec<Client>> {
    let sql = format!(
        "SELECT {} FROM clients ORDER BY id LIMIT ?1 OFFSET ?2",
        CLIENT_COLUMNS
    );
    let mut stmt = conn.prepare(&sql)?;
    let clients = stmt
        .query_map(params![limit, skip], map_row)?
        .collect::<Result<Vec<Client>, _>>()?;
    Ok(clients)
}

/// 整体更新（除主键外所有字段）
pub fn update(conn: &Connection, client: &Client) -> RepositoryResult<()> {
    let rows_affected = conn.execute(
        r#"UPDATE clients
           SET first_name = ?1, last_name = ?2, middle_name = ?3,
               birth_date = ?4, phone = ?5, address = ?6
           WHERE id = ?7"#,
        params![
            client.first_name,
            client.last_name,
            client.middle_name,
            client.birth_date,
            client.phone,
            client.address,
            client.id,
        ],
    )?;

    if rows_affected == 0 {
        return Err(RepositoryError::NotFound {
            entity: "Client".to_string(),
            id: client.id.to_string(),
        });
    }
    Ok(())
}

pub fn delete(conn: &Connection, client_id: i64) -> RepositoryResult<usize> {
    let rows = conn.execute("DELETE FROM clients WHERE id = ?1", params![client_id])?;
    Ok(rows)
}

pub fn count(conn: &Connection) -> RepositoryResult<i64> {
    let n = conn.query_row("SELECT COUNT(*) FROM clients", [], |row| row.get(0))?;
    Ok(n)
}

// ==========================================
// ClientRepository - 客户仓储
// ==========================================

/// 客户仓储
/// 职责: 管理 clients 表的 CRUD 与姓名检索
pub struct ClientRepository {
    conn: Arc<Mutex<Connection>>,
}

impl ClientRepository {
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

    pub fn insert(&self, record: &ClientRecord) -> RepositoryResult<Client> {
        let conn = self.get_conn()?;
        insert(&conn, record)
    }

    pub fn find_by_id(&self, client_id: i64) -> RepositoryResult<Option<Client>> {
        let conn = self.get_conn()?;
        find_by_id(&conn, client_id)
    }

    pub fn search_by_name(
        &self,
        first_name: Option<&str>,
        last_name: Option<&str>,
    ) -> RepositoryResult<Vec<Client>> {
        let conn = self.get_conn()?;
        search_by_name(&conn, first_name, last_name)
    }

    pub fn list(&self, skip: i64, limit: i64) -> RepositoryResult<Vec<Client>> {
        let conn = self.get_conn()?;
        list(&conn, skip, limit)
    }

    pub fn update(&self, client: &Client) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        update(&conn, client)
    }

    pub fn count(&self) -> RepositoryResult<i64> {
        let conn = self.get_conn()?;
        count(&conn)
    }
}
