// ==========================================
// 零售订单管理系统 - 商品 API
// ==========================================
// 职责: 商品新增/修改/换图/删除
// 红线: 仍被订单项引用的商品不可删除（否则库存不变量失效）
// 旁路: 图片删除失败只记录 warn
// ==========================================

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::api::error::{ApiError, ApiResult};
use crate::api::store::Store;
use crate::api::validator;
use crate::app::auth::IdentityProvider;
use crate::domain::product::Product;
use crate::engine::image_store::ImageStore;
use crate::engine::lifecycle::{OrderLifecycle, ProductRef};
use crate::repository::product_repo::{self, ProductRecord};

// ==========================================
// 请求类型
// ==========================================

/// 上传的图片
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageUpload {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

/// 新商品
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewProduct {
    pub name: String,
    pub price: f64,
    pub stock: i64,
    #[serde(default)]
    pub image: Option<ImageUpload>,
}

/// 商品局部更新（stock 直接重定义名义库存）
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProductPatch {
    pub name: Option<String>,
    pub price: Option<f64>,
    pub stock: Option<i64>,
}

impl ProductPatch {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.price.is_none() && self.stock.is_none()
    }

    fn apply(&self, product: &mut Product) -> ApiResult<()> {
        let name = match &self.name {
            Some(v) => Some(validator::require_text("商品名称", v)?.to_string()),
            None => None,
        };
        if let Some(price) = self.price {
            validator::require_price(price)?;
        }
        if let Some(stock) = self.stock {
            validator::require_stock(stock)?;
        }

        if let Some(v) = name {
            product.name = v;
        }
        if let Some(v) = self.price {
            product.price = v;
        }
        if let Some(v) = self.stock {
            product.stock = v;
        }
        Ok(())
    }
}

// ==========================================
// ProductApi - 商品 API
// ==========================================
pub struct ProductApi {
    store: Store,
    lifecycle: Arc<OrderLifecycle>,
    images: Arc<dyn ImageStore>,
    identity: Arc<dyn IdentityProvider>,
}

impl ProductApi {
    pub fn new(
        store: Store,
        lifecycle: Arc<OrderLifecycle>,
        images: Arc<dyn ImageStore>,
        identity: Arc<dyn IdentityProvider>,
    ) -> Self {
        Self {
            store,
            lifecycle,
            images,
            identity,
        }
    }

    /// 新增商品（可选图片）
    pub fn create_product(&self, input: NewProduct) -> ApiResult<Product> {
        let name = validator::require_text("商品名称", &input.name)?.to_string();
        validator::require_price(input.price)?;
        validator::require_stock(input.stock)?;

        let image = match &input.image {
            Some(upload) => Some(self.store_image(upload)?),
            None => None,
        };

        let record = ProductRecord {
            name,
            image: image.clone(),
            price: input.price,
            stock: input.stock,
        };
        let result = self
            .store
            .write(|tx| Ok(product_repo::insert(tx, &record)?));

        match result {
            Ok(product) => {
                info!(product_id = product.id, name = %product.name, stock = product.stock, "商品已创建");
                Ok(product)
            }
            Err(e) => {
                // 入库失败时清理已保存的图片
                if let Some(path) = image {
                    self.remove_image(&path);
                }
                Err(e)
            }
        }
    }

    /// 按主键局部更新
    pub fn update_product(&self, product_id: i64, patch: ProductPatch) -> ApiResult<Product> {
        self.update(ProductRef::Id(product_id), patch)
    }

    /// 按名称局部更新；空 patch 视为错误
    pub fn update_product_by_name(&self, name: &str, patch: ProductPatch) -> ApiResult<Product> {
        let name = validator::require_text("商品名称", name)?;
        if patch.is_empty() {
            return Err(ApiError::ValidationError("没有提供任何修改".to_string()));
        }
        self.update(ProductRef::Name(name.to_string()), patch)
    }

    fn update(&self, target: ProductRef, patch: ProductPatch) -> ApiResult<Product> {
        let product = self.store.write(|tx| {
            let mut product = self.lifecycle.resolve_product(tx, &target)?;
            patch.apply(&mut product)?;
            product_repo::update(tx, &product)?;
            Ok(product)
        })?;
        info!(product_id = product.id, stock = product.stock, "商品已更新");
        Ok(product)
    }

    /// 替换商品图片: 保存新图 -> 更新引用 -> 删除旧图
    pub fn replace_product_image(&self, name: &str, upload: ImageUpload) -> ApiResult<Product> {
        let name = validator::require_text("商品名称", name)?;
        let target = ProductRef::Name(name.to_string());

        // 先确认商品存在，避免留下孤立图片
        self.store
            .read(|conn| Ok(self.lifecycle.resolve_product(conn, &target)?))?;
        let new_path = self.store_image(&upload)?;

        let (product, old_path) = self.store.write(|tx| {
            let mut product = self.lifecycle.resolve_product(tx, &target)?;
            let old_path = product.image.replace(new_path.clone());
            product_repo::update(tx, &product)?;
            Ok((product, old_path))
        })?;

        if let Some(old) = old_path.filter(|old| *old != new_path) {
            self.remove_image(&old);
        }
        info!(product_id = product.id, image = %new_path, "商品图片已替换");
        Ok(product)
    }

    /// 删除商品（仅 admin；被订单项引用时拒绝）
    pub fn delete_product(&self, product_id: i64) -> ApiResult<Product> {
        self.delete(ProductRef::Id(product_id))
    }

    pub fn delete_product_by_name(&self, name: &str) -> ApiResult<Product> {
        let name = validator::require_text("商品名称", name)?;
        self.delete(ProductRef::Name(name.to_string()))
    }

    fn delete(&self, target: ProductRef) -> ApiResult<Product> {
        validator::require_admin(self.identity.as_ref(), "删除商品")?;

        let product = self.store.write(|tx| {
            let product = self.lifecycle.resolve_product(tx, &target)?;
            let references = product_repo::count_item_references(tx, product.id)?;
            if references > 0 {
                return Err(ApiError::BusinessRuleViolation(format!(
                    "商品「{}」仍被{}个订单项引用，不能删除",
                    product.name, references
                )));
            }
            product_repo::delete(tx, product.id)?;
            Ok(product)
        })?;

        if let Some(path) = &product.image {
            self.remove_image(path);
        }
        info!(product_id = product.id, name = %product.name, "商品已删除");
        Ok(product)
    }

    // ==========================================
    // 图片旁路
    // ==========================================

    fn store_image(&self, upload: &ImageUpload) -> ApiResult<String> {
        self.images
            .store(&upload.file_name, &upload.bytes)
            .map_err(|e| ApiError::InvalidInput(format!("图片保存失败: {}", e)))
    }

    fn remove_image(&self, path: &str) {
        if let Err(e) = self.images.remove(path) {
            warn!(path, error = %e, "图片删除失败（已忽略）");
        }
    }
}
