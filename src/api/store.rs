// ==========================================
// 零售订单管理系统 - 存储句柄
// ==========================================
// 职责: 显式传递的共享连接 + 读/写事务边界
// 约定: 每个写请求恰好一个 IMMEDIATE 事务；闭包返回 Err 即回滚
// ==========================================

use rusqlite::{Connection, Transaction, TransactionBehavior};
use std::sync::{Arc, Mutex, MutexGuard};

use crate::api::error::{ApiError, ApiResult};

#[derive(Clone)]
pub struct Store {
    conn: Arc<Mutex<Connection>>,
}

impl Store {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    /// 共享连接（供仓储构造）
    pub fn connection(&self) -> Arc<Mutex<Connection>> {
        self.conn.clone()
    }

    fn lock(&self) -> ApiResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| ApiError::DatabaseConnectionError(format!("数据库锁获取失败: {}", e)))
    }

    /// 只读访问
    pub fn read<T, F>(&self, f: F) -> ApiResult<T>
    where
        F: FnOnce(&Connection) -> ApiResult<T>,
    {
        let conn = self.lock()?;
        f(&conn)
    }

    /// 写事务（IMMEDIATE: 首次读取前即持有写锁）
    pub fn write<T, F>(&self, f: F) -> ApiResult<T>
    where
        F: FnOnce(&Transaction<'_>) -> ApiResult<T>,
    {
        let mut conn = self.lock()?;
        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(|e| ApiError::DatabaseTransactionError(e.to_string()))?;

        let value = f(&tx)?;

        tx.commit()
            .map_err(|e| ApiError::DatabaseTransactionError(e.to_string()))?;
        Ok(value)
    }
}

impl std::fmt::Debug for Store {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Store").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;
    use crate::repository::client_repo::{self, ClientRecord};

    fn record() -> ClientRecord {
        ClientRecord {
            first_name: "Анна".to_string(),
            last_name: "Петрова".to_string(),
            middle_name: String::new(),
            birth_date: None,
            phone: String::new(),
            address: String::new(),
        }
    }

    #[test]
    fn test_write_commits_on_ok_and_rolls_back_on_err() {
        let store = Store::new(Arc::new(Mutex::new(db::open_in_memory().unwrap())));

        store
            .write(|tx| Ok(client_repo::insert(tx, &record())?))
            .unwrap();

        let result: ApiResult<()> = store.write(|tx| {
            client_repo::insert(tx, &record())?;
            Err(ApiError::ValidationError("abort".to_string()))
        });
        assert!(result.is_err());

        let count = store.read(|conn| Ok(client_repo::count(conn)?)).unwrap();
        assert_eq!(count, 1);
    }
}
