// ==========================================
// 零售订单管理系统 - 主入口
// ==========================================
// 职责: 初始化日志 -> 解析数据库路径 -> 组装 AppState -> 自检
// 环境变量:
//   RETAIL_ORDERS_DB_PATH     数据库路径
//   RETAIL_ORDERS_LOG_FORMAT  json 时输出 JSON 行日志
//   RETAIL_ORDERS_USER / RETAIL_ORDERS_ROLE  当前操作人
// ==========================================

use std::sync::Arc;

use retail_orders::app::{get_default_db_path, AppState, Identity, StaticIdentityProvider};
use retail_orders::repository::RepositoryError;
use retail_orders::{db, logging, Role};

fn identity_from_env() -> StaticIdentityProvider {
    match std::env::var("RETAIL_ORDERS_USER") {
        Ok(user) if !user.trim().is_empty() => {
            let role = std::env::var("RETAIL_ORDERS_ROLE")
                .map(|r| Role::parse(&r))
                .unwrap_or(Role::User);
            StaticIdentityProvider::new(Identity::new(user.trim(), role))
        }
        _ => StaticIdentityProvider::anonymous(),
    }
}

fn main() -> anyhow::Result<()> {
    logging::init();

    tracing::info!("==================================================");
    tracing::info!("{}", retail_orders::APP_NAME);
    tracing::info!("系统版本: {}", retail_orders::VERSION);
    tracing::info!("==================================================");

    let db_path = get_default_db_path();
    tracing::info!("使用数据库: {}", db_path);

    let identity = identity_from_env();
    let state = AppState::new(db_path, Arc::new(identity)).map_err(anyhow::Error::msg)?;

    let version = state
        .store
        .read(|conn| Ok(db::read_schema_version(conn).map_err(RepositoryError::from)?))?;
    tracing::info!(
        schema_version = ?version,
        expected = db::CURRENT_SCHEMA_VERSION,
        "schema 版本"
    );

    let (clients, products, orders) = state.lookup_api.counts()?;
    tracing::info!(clients, products, orders, "数据概况");

    let config_snapshot = state
        .config_manager
        .get_config_snapshot()
        .map_err(|e| anyhow::anyhow!("读取配置快照失败: {}", e))?;
    tracing::info!(config = %config_snapshot, "当前配置");

    Ok(())
}
