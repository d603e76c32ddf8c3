// ==========================================
// 零售订单管理系统 - 应用状态
// ==========================================
// 职责: 管理应用级别的共享状态和API实例
// 约定: 存储句柄显式传入每个 API，不使用进程级单例
// ==========================================

use std::sync::{Arc, Mutex};

use rusqlite::Connection;

use crate::api::{ClientApi, LookupApi, OrderApi, ProductApi, Store};
use crate::app::auth::IdentityProvider;
use crate::config::config_manager::ConfigManager;
use crate::db;
use crate::engine::image_store::{FsImageStore, ImageStore};
use crate::engine::lifecycle::OrderLifecycle;
use crate::engine::receipt::{ReceiptPublisher, TextReceiptRenderer};
use crate::repository::action_log_repo::ActionLogRepository;

/// 应用状态
///
/// 包含所有API实例和共享资源
pub struct AppState {
    /// 数据库路径
    pub db_path: String,

    /// 共享存储句柄
    pub store: Store,

    /// 配置管理器
    pub config_manager: Arc<ConfigManager>,

    /// 订单API
    pub order_api: Arc<OrderApi>,

    /// 客户API
    pub client_api: Arc<ClientApi>,

    /// 商品API
    pub product_api: Arc<ProductApi>,

    /// 查询API
    pub lookup_api: Arc<LookupApi>,

    /// 操作日志仓储（用于审计追踪）
    pub action_log_repo: Arc<ActionLogRepository>,
}

impl AppState {
    /// 创建新的AppState实例
    ///
    /// # 说明
    /// 该方法会：
    /// 1. 打开数据库并建表（幂等），检查 schema 版本
    /// 2. 按配置创建收据渲染器与图片存储
    /// 3. 创建所有API实例
    pub fn new(db_path: String, identity: Arc<dyn IdentityProvider>) -> Result<Self, String> {
        tracing::info!("初始化AppState，数据库路径: {}", db_path);

        let conn = db::open_sqlite_connection(&db_path)
            .map_err(|e| format!("无法打开数据库: {}", e))?;
        db::ensure_schema(&conn).map_err(|e| format!("建表失败: {}", e))?;
        if let Err(e) = db::check_schema_version(&conn) {
            tracing::warn!("schema_version 读取失败(将继续启动): {}", e);
        }
        let conn = Arc::new(Mutex::new(conn));

        let config_manager = Arc::new(ConfigManager::from_connection(conn.clone()));
        let receipts_dir = config_manager
            .receipts_dir()
            .map_err(|e| format!("读取收据目录配置失败: {}", e))?;
        let uploads_dir = config_manager
            .uploads_dir()
            .map_err(|e| format!("读取上传目录配置失败: {}", e))?;

        let receipts = ReceiptPublisher::with_renderer(Arc::new(TextReceiptRenderer::new(receipts_dir)));
        let images: Arc<dyn ImageStore> = Arc::new(FsImageStore::new(uploads_dir));

        Ok(Self::from_parts(db_path, conn, identity, receipts, images))
    }

    /// 从已配置好的连接与旁路组件组装（测试/种子数据使用）
    pub fn from_parts(
        db_path: String,
        conn: Arc<Mutex<Connection>>,
        identity: Arc<dyn IdentityProvider>,
        receipts: ReceiptPublisher,
        images: Arc<dyn ImageStore>,
    ) -> Self {
        let store = Store::new(conn.clone());
        let config_manager = Arc::new(ConfigManager::from_connection(conn.clone()));
        let lifecycle = Arc::new(OrderLifecycle::new());

        let order_api = Arc::new(OrderApi::new(
            store.clone(),
            lifecycle.clone(),
            receipts.clone(),
            config_manager.clone(),
            identity.clone(),
        ));
        let client_api = Arc::new(ClientApi::new(
            store.clone(),
            lifecycle.clone(),
            receipts,
            identity.clone(),
        ));
        let product_api = Arc::new(ProductApi::new(store.clone(), lifecycle, images, identity));
        let lookup_api = Arc::new(LookupApi::new(&store, config_manager.clone()));
        let action_log_repo = Arc::new(ActionLogRepository::new(conn));

        tracing::info!("AppState初始化完成");

        Self {
            db_path,
            store,
            config_manager,
            order_api,
            client_api,
            product_api,
            lookup_api,
            action_log_repo,
        }
    }
}

/// 获取默认数据库路径
///
/// 优先级: RETAIL_ORDERS_DB_PATH 环境变量 > 用户数据目录 > 当前目录
pub fn get_default_db_path() -> String {
    use std::path::PathBuf;

    // 允许通过环境变量显式指定 DB 路径（便于调试/测试/CI）
    if let Ok(path) = std::env::var("RETAIL_ORDERS_DB_PATH") {
        let trimmed = path.trim();
        if !trimmed.is_empty() {
            return trimmed.to_string();
        }
    }

    let mut path = PathBuf::from("./retail_orders.db");

    if let Some(data_dir) = dirs::data_dir() {
        let dir = data_dir.join("retail-orders");
        // 目录创建失败时回退到当前目录
        if std::fs::create_dir_all(&dir).is_ok() {
            path = dir.join("retail_orders.db");
        }
    }

    path.to_string_lossy().to_string()
}
