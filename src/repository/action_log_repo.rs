// ==========================================
// 零售订单管理系统 - 操作日志仓储
// ==========================================
// 红线: Repository 不做业务逻辑,只做数据映射
// ==========================================

use crate::domain::action_log::ActionLog;
use crate::repository::error::{RepositoryError, RepositoryResult};
use rusqlite::{params, Connection, Row};
use std::sync::{Arc, Mutex};

const ACTION_LOG_COLUMNS: &str =
    "action_id, action_type, action_ts, actor, order_identifier, payload_json, detail";

fn map_row(row: &Row<'_>) -> rusqlite::Result<ActionLog> {
    let payload: Option<String> = row.get(5)?;
    Ok(ActionLog {
        action_id: row.get(0)?,
        action_type: row.get(1)?,
        action_ts: row.get(2)?,
        actor: row.get(3)?,
        order_identifier: row.get(4)?,
        payload_json: payload.and_then(|s| serde_json::from_str(&s).ok()),
        detail: row.get(6)?,
    })
}

/// 插入操作日志（可在事务内调用）
pub fn insert(conn: &Connection, log: &ActionLog) -> RepositoryResult<String> {
    conn.execute(
        r#"
        INSERT INTO action_log (
            action_id, action_type, action_ts, actor,
            order_identifier, payload_json, detail
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
        "#,
        params![
            log.action_id,
            log.action_type,
            log.action_ts,
            log.actor,
            log.order_identifier,
            log.payload_json.as_ref().map(|v| v.to_string()),
            log.detail,
        ],
    )?;
    Ok(log.action_id.clone())
}

// ==========================================
// ActionLogRepository - 操作日志仓储
// ==========================================
pub struct ActionLogRepository {
    conn: Arc<Mutex<Connection>>,
}

impl ActionLogRepository {
    /// 创建新的操作日志仓储
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    /// 获取数据库连接
    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 插入操作日志
    pub fn insert(&self, log: &ActionLog) -> RepositoryResult<String> {
        let conn = self.get_conn()?;
        insert(&conn, log)
    }

    /// 查询某订单的全部日志（按时间升序）
    pub fn find_by_order(&self, identifier: &str) -> RepositoryResult<Vec<ActionLog>> {
        let conn = self.get_conn()?;
        let sql = format!(
            "SELECT {} FROM action_log WHERE order_identifier = ?1 ORDER BY action_ts, rowid",
            ACTION_LOG_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let logs = stmt
            .query_map(params![identifier], map_row)?
            .collect::<Result<Vec<ActionLog>, _>>()?;
        Ok(logs)
    }

    /// 最近 N 条日志（按时间降序）
    pub fn find_recent(&self, limit: i64) -> RepositoryResult<Vec<ActionLog>> {
        let conn = self.get_conn()?;
        let sql = format!(
            "SELECT {} FROM action_log ORDER BY action_ts DESC, rowid DESC LIMIT ?1",
            ACTION_LOG_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let logs = stmt
            .query_map(params![limit], map_row)?
            .collect::<Result<Vec<ActionLog>, _>>()?;
        Ok(logs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::action_log::ActionType;
    use serde_json::json;

    fn setup() -> ActionLogRepository {
        let conn = crate::db::open_in_memory().unwrap();
        ActionLogRepository::new(Arc::new(Mutex::new(conn)))
    }

    #[test]
    fn test_insert_and_find_by_order() {
        let repo = setup();
        let log = ActionLog::new(ActionType::CreateOrder, "u1")
            .with_order("IIP000001")
            .with_payload(json!({"movements": [{"product_id": 1, "delta": -4}]}))
            .with_detail("created");
        repo.insert(&log).unwrap();
        repo.insert(&ActionLog::new(ActionType::AddItem, "u1").with_order("IIP000002"))
            .unwrap();

        let found = repo.find_by_order("IIP000001").unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].action_type, "CreateOrder");
        assert_eq!(found[0].payload_json.as_ref().unwrap()["movements"][0]["delta"], -4);

        assert_eq!(repo.find_recent(10).unwrap().len(), 2);
    }
}
