// ==========================================
// 零售订单管理系统 - 查询 API
// ==========================================
// 职责: 只读查询（主键、订单编号、姓名精确匹配、商品名片段）
// 约定: 查无结果返回 None / 空列表，不报错
// ==========================================

use std::sync::Arc;

use crate::api::error::{ApiError, ApiResult};
use crate::api::store::Store;
use crate::api::validator;
use crate::config::config_manager::ConfigManager;
use crate::domain::client::Client;
use crate::domain::order::{Order, OrderDetail};
use crate::domain::product::Product;
use crate::repository::client_repo::ClientRepository;
use crate::repository::order_repo::OrderRepository;
use crate::repository::product_repo::ProductRepository;

pub struct LookupApi {
    client_repo: Arc<ClientRepository>,
    product_repo: Arc<ProductRepository>,
    order_repo: Arc<OrderRepository>,
    config: Arc<ConfigManager>,
}

impl LookupApi {
    pub fn new(store: &Store, config: Arc<ConfigManager>) -> Self {
        Self {
            client_repo: Arc::new(ClientRepository::new(store.connection())),
            product_repo: Arc::new(ProductRepository::new(store.connection())),
            order_repo: Arc::new(OrderRepository::new(store.connection())),
            config,
        }
    }

    /// 分页参数: skip < 0 按 0 处理；limit <= 0 取默认值，超过上限截断
    fn page(&self, skip: i64, limit: i64) -> ApiResult<(i64, i64)> {
        let default = self
            .config
            .page_limit_default()
            .map_err(|e| ApiError::InternalError(format!("读取分页配置失败: {}", e)))?;
        let max = self
            .config
            .page_limit_max()
            .map_err(|e| ApiError::InternalError(format!("读取分页配置失败: {}", e)))?;

        let limit = if limit <= 0 { default } else { limit };
        Ok((skip.max(0), limit.min(max)))
    }

    // ==========================================
    // 主键/编号
    // ==========================================

    pub fn get_client(&self, client_id: i64) -> ApiResult<Option<Client>> {
        Ok(self.client_repo.find_by_id(client_id)?)
    }

    pub fn get_product(&self, product_id: i64) -> ApiResult<Option<Product>> {
        Ok(self.product_repo.find_by_id(product_id)?)
    }

    pub fn get_order(&self, order_id: i64) -> ApiResult<Option<OrderDetail>> {
        Ok(self.order_repo.find_detail_by_id(order_id)?)
    }

    /// 按订单编号查询（去空白、大小写不敏感）
    pub fn get_order_by_identifier(&self, identifier: &str) -> ApiResult<Option<OrderDetail>> {
        Ok(self.order_repo.find_detail_by_identifier(identifier)?)
    }

    pub fn client_orders(&self, client_id: i64) -> ApiResult<Vec<Order>> {
        Ok(self.order_repo.list_by_client(client_id)?)
    }

    // ==========================================
    // 检索
    // ==========================================

    /// 按名/姓精确匹配（至少一个条件）
    pub fn search_clients(
        &self,
        first_name: Option<&str>,
        last_name: Option<&str>,
    ) -> ApiResult<Vec<Client>> {
        let (first, last) = validator::require_name_criteria(first_name, last_name)?;
        Ok(self.client_repo.search_by_name(first, last)?)
    }

    /// 商品名称片段检索
    pub fn search_products(&self, fragment: &str) -> ApiResult<Vec<Product>> {
        let fragment = validator::require_text("检索关键字", fragment)?;
        Ok(self.product_repo.search_by_fragment(fragment)?)
    }

    /// 商品名称精确匹配
    pub fn find_product_by_name(&self, name: &str) -> ApiResult<Option<Product>> {
        let name = validator::require_text("商品名称", name)?;
        Ok(self.product_repo.find_by_name(name)?)
    }

    // ==========================================
    // 列表
    // ==========================================

    pub fn list_clients(&self, skip: i64, limit: i64) -> ApiResult<Vec<Client>> {
        let (skip, limit) = self.page(skip, limit)?;
        Ok(self.client_repo.list(skip, limit)?)
    }

    pub fn list_products(&self, skip: i64, limit: i64) -> ApiResult<Vec<Product>> {
        let (skip, limit) = self.page(skip, limit)?;
        Ok(self.product_repo.list(skip, limit)?)
    }

    pub fn list_orders(&self, skip: i64, limit: i64) -> ApiResult<Vec<OrderDetail>> {
        let (skip, limit) = self.page(skip, limit)?;
        Ok(self.order_repo.list_details(skip, limit)?)
    }

    // ==========================================
    // 统计
    // ==========================================

    /// (客户数, 商品数, 订单数)
    pub fn counts(&self) -> ApiResult<(i64, i64, i64)> {
        Ok((
            self.client_repo.count()?,
            self.product_repo.count()?,
            self.order_repo.count()?,
        ))
    }
}
