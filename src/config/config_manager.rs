// ==========================================
// 零售订单管理系统 - 配置管理器
// ==========================================
// 职责: 配置加载、查询、覆写管理
// 存储: config_kv 表 (key-value + scope)，当前只使用 global scope
// ==========================================

use crate::db::open_sqlite_connection;
use rusqlite::{params, Connection};
use serde_json::json;
use std::collections::BTreeMap;
use std::error::Error;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

// ==========================================
// ConfigManager - 配置管理器
// ==========================================
pub struct ConfigManager {
    conn: Arc<Mutex<Connection>>,
}

impl ConfigManager {
    /// 创建新的 ConfigManager 实例
    ///
    /// # 参数
    /// - db_path: 数据库文件路径
    pub fn new(db_path: &str) -> Result<Self, Box<dyn Error>> {
        let conn = open_sqlite_connection(db_path)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// 从已有连接创建 ConfigManager
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    /// 从 config_kv 表读取配置值（scope_id='global'）
    fn get_config_value(&self, key: &str) -> Result<Option<String>, Box<dyn Error>> {
        let conn = self.conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;

        let result = conn.query_row(
            "SELECT value FROM config_kv WHERE scope_id = 'global' AND key = ?1",
            params![key],
            |row| row.get::<_, String>(0),
        );

        match result {
            Ok(value) => Ok(Some(value)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(Box::new(e)),
        }
    }

    /// 读取 global scope 的配置值（公开方法，供其他模块复用）
    pub fn get_global_config_value(&self, key: &str) -> Result<Option<String>, Box<dyn Error>> {
        self.get_config_value(key)
    }

    /// 写入 global scope 的配置值（存在则覆盖）
    pub fn set_global_config_value(&self, key: &str, value: &str) -> Result<(), Box<dyn Error>> {
        let key = key.trim();
        if key.is_empty() {
            return Err("配置键不能为空".into());
        }

        let conn = self.conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;
        conn.execute(
            "INSERT INTO config_kv (scope_id, key, value, updated_at)
             VALUES ('global', ?1, ?2, datetime('now'))
             ON CONFLICT(scope_id, key) DO UPDATE SET value = ?2, updated_at = datetime('now')",
            params![key, value],
        )?;
        tracing::info!(key, value, "配置已更新");
        Ok(())
    }

    fn get_config_or_default(&self, key: &str, default: &str) -> Result<String, Box<dyn Error>> {
        Ok(self.get_config_value(key)?.unwrap_or_else(|| default.to_string()))
    }

    /// 读取正整数配置；格式错误时回退默认值并记录 warn
    fn get_positive_i64(&self, key: &str, default: i64) -> Result<i64, Box<dyn Error>> {
        let raw = self.get_config_or_default(key, &default.to_string())?;
        match raw.trim().parse::<i64>() {
            Ok(v) if v > 0 => Ok(v),
            _ => {
                tracing::warn!(config_key = key, raw_value = %raw, default, "配置格式错误，使用默认值");
                Ok(default)
            }
        }
    }

    /// 获取所有配置的快照（JSON格式）
    pub fn get_config_snapshot(&self) -> Result<String, Box<dyn Error>> {
        let conn = self.conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;

        let mut stmt = conn.prepare(
            "SELECT key, value FROM config_kv WHERE scope_id = 'global' ORDER BY key",
        )?;

        let mut config_map: BTreeMap<String, String> = BTreeMap::new();
        let rows = stmt.query_map([], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?;

        for row in rows {
            let (key, value) = row?;
            config_map.insert(key, value);
        }

        Ok(serde_json::to_string(&json!(config_map))?)
    }

    // ===== 文件目录 =====

    /// 收据输出目录
    pub fn receipts_dir(&self) -> Result<PathBuf, Box<dyn Error>> {
        Ok(PathBuf::from(
            self.get_config_or_default(config_keys::RECEIPTS_DIR, defaults::RECEIPTS_DIR)?,
        ))
    }

    /// 商品图片上传目录
    pub fn uploads_dir(&self) -> Result<PathBuf, Box<dyn Error>> {
        Ok(PathBuf::from(
            self.get_config_or_default(config_keys::UPLOADS_DIR, defaults::UPLOADS_DIR)?,
        ))
    }

    /// 收据上的供货方
    pub fn receipt_supplier(&self) -> Result<String, Box<dyn Error>> {
        self.get_config_or_default(config_keys::RECEIPT_SUPPLIER, defaults::RECEIPT_SUPPLIER)
    }

    // ===== 分页 =====

    pub fn page_limit_default(&self) -> Result<i64, Box<dyn Error>> {
        self.get_positive_i64(config_keys::PAGE_LIMIT_DEFAULT, defaults::PAGE_LIMIT_DEFAULT)
    }

    pub fn page_limit_max(&self) -> Result<i64, Box<dyn Error>> {
        self.get_positive_i64(config_keys::PAGE_LIMIT_MAX, defaults::PAGE_LIMIT_MAX)
    }
}

// ==========================================
// 配置键常量
// ==========================================
pub mod config_keys {
    pub const RECEIPTS_DIR: &str = "receipts_dir";
    pub const UPLOADS_DIR: &str = "uploads_dir";
    pub const RECEIPT_SUPPLIER: &str = "receipt_supplier";

    // 分页
    pub const PAGE_LIMIT_DEFAULT: &str = "page_limit_default";
    pub const PAGE_LIMIT_MAX: &str = "page_limit_max";
}

mod defaults {
    pub const RECEIPTS_DIR: &str = "receipts";
    pub const UPLOADS_DIR: &str = "uploads";
    pub const RECEIPT_SUPPLIER: &str = "ИП Иванов И.И.";
    pub const PAGE_LIMIT_DEFAULT: i64 = 10;
    pub const PAGE_LIMIT_MAX: i64 = 100;
}
