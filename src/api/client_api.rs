// ==========================================
// 零售订单管理系统 - 客户 API
// ==========================================
// 职责: 客户新增/修改/删除
// 红线: 删除客户必须先级联删除其订单并回补库存（OrderLifecycle::purge_client）
// 权限: 删除仅限 admin
// ==========================================

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::api::error::{ApiError, ApiResult};
use crate::api::store::Store;
use crate::api::validator;
use crate::app::auth::IdentityProvider;
use crate::domain::client::Client;
use crate::engine::lifecycle::{ClientPurge, OrderLifecycle};
use crate::engine::receipt::ReceiptPublisher;
use crate::repository::client_repo::{self, ClientRecord};

// ==========================================
// 请求类型
// ==========================================

/// 新客户 / 整体替换
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewClient {
    pub first_name: String,
    pub last_name: String,
    #[serde(default)]
    pub middle_name: String,
    /// YYYY-MM-DD
    #[serde(default)]
    pub birth_date: Option<String>,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub address: String,
}

/// 按姓名定位客户（大小写不敏感精确匹配，取第一条）
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClientNameQuery {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

impl ClientNameQuery {
    pub fn new(first_name: Option<&str>, last_name: Option<&str>) -> Self {
        Self {
            first_name: first_name.map(str::to_string),
            last_name: last_name.map(str::to_string),
        }
    }
}

/// 客户局部更新（None 表示不修改）
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClientPatch {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub middle_name: Option<String>,
    pub birth_date: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
}

impl ClientPatch {
    pub fn is_empty(&self) -> bool {
        self.first_name.is_none()
            && self.last_name.is_none()
            && self.middle_name.is_none()
            && self.birth_date.is_none()
            && self.phone.is_none()
            && self.address.is_none()
    }
}

fn to_record(input: &NewClient) -> ApiResult<ClientRecord> {
    Ok(ClientRecord {
        first_name: validator::require_text("名", &input.first_name)?.to_string(),
        last_name: validator::require_text("姓", &input.last_name)?.to_string(),
        middle_name: input.middle_name.trim().to_string(),
        birth_date: validator::parse_birth_date(input.birth_date.as_deref())?,
        phone: input.phone.trim().to_string(),
        address: input.address.trim().to_string(),
    })
}

/// 将 patch 应用到客户（先全部校验，再修改）
fn apply_patch(client: &mut Client, patch: &ClientPatch) -> ApiResult<()> {
    let first_name = match &patch.first_name {
        Some(v) => Some(validator::require_text("名", v)?.to_string()),
        None => None,
    };
    let last_name = match &patch.last_name {
        Some(v) => Some(validator::require_text("姓", v)?.to_string()),
        None => None,
    };
    let birth_date = match &patch.birth_date {
        Some(v) => Some(validator::parse_birth_date(Some(v))?),
        None => None,
    };

    if let Some(v) = first_name {
        client.first_name = v;
    }
    if let Some(v) = last_name {
        client.last_name = v;
    }
    if let Some(v) = &patch.middle_name {
        client.middle_name = v.trim().to_string();
    }
    if let Some(v) = birth_date {
        client.birth_date = v;
    }
    if let Some(v) = &patch.phone {
        client.phone = v.trim().to_string();
    }
    if let Some(v) = &patch.address {
        client.address = v.trim().to_string();
    }
    Ok(())
}

// ==========================================
// ClientApi - 客户 API
// ==========================================
pub struct ClientApi {
    store: Store,
    lifecycle: Arc<OrderLifecycle>,
    receipts: ReceiptPublisher,
    identity: Arc<dyn IdentityProvider>,
}

impl ClientApi {
    pub fn new(
        store: Store,
        lifecycle: Arc<OrderLifecycle>,
        receipts: ReceiptPublisher,
        identity: Arc<dyn IdentityProvider>,
    ) -> Self {
        Self {
            store,
            lifecycle,
            receipts,
            identity,
        }
    }

    /// 新增客户
    pub fn create_client(&self, input: NewClient) -> ApiResult<Client> {
        let record = to_record(&input)?;
        let client = self
            .store
            .write(|tx| Ok(client_repo::insert(tx, &record)?))?;
        info!(client_id = client.id, name = %client.display_name(), "客户已创建");
        Ok(client)
    }

    /// 整体替换客户信息
    pub fn update_client(&self, client_id: i64, input: NewClient) -> ApiResult<Client> {
        let record = to_record(&input)?;
        let client = self.store.write(|tx| {
            let existing = self.lifecycle.resolve_client(tx, client_id)?;
            let updated = Client {
                id: existing.id,
                first_name: record.first_name,
                last_name: record.last_name,
                middle_name: record.middle_name,
                birth_date: record.birth_date,
                phone: record.phone,
                address: record.address,
            };
            client_repo::update(tx, &updated)?;
            Ok(updated)
        })?;
        info!(client_id = client.id, "客户已更新");
        Ok(client)
    }

    /// 按姓名定位并局部更新
    ///
    /// # 错误
    /// - ValidationError: 未提供姓名条件 / 没有任何修改
    /// - ClientNotFound: 无匹配客户
    pub fn update_client_by_name(&self, query: ClientNameQuery, patch: ClientPatch) -> ApiResult<Client> {
        let (first, last) =
            validator::require_name_criteria(query.first_name.as_deref(), query.last_name.as_deref())?;
        if patch.is_empty() {
            return Err(ApiError::ValidationError("没有提供任何修改".to_string()));
        }

        let client = self.store.write(|tx| {
            let mut client = self.lifecycle.resolve_client_by_name(tx, first, last)?;
            apply_patch(&mut client, &patch)?;
            client_repo::update(tx, &client)?;
            Ok(client)
        })?;
        info!(client_id = client.id, "客户已按姓名更新");
        Ok(client)
    }

    /// 删除客户（级联订单，回补库存）
    pub fn delete_client(&self, client_id: i64) -> ApiResult<Client> {
        validator::require_admin(self.identity.as_ref(), "删除客户")?;
        let actor = self.identity.actor();

        let purge = self.store.write(|tx| {
            Ok(self.lifecycle.purge_client(tx, client_id, &actor)?)
        })?;

        Ok(self.finish_purge(purge))
    }

    /// 按姓名删除客户（第一条匹配）
    pub fn delete_client_by_name(&self, query: ClientNameQuery) -> ApiResult<Client> {
        validator::require_admin(self.identity.as_ref(), "删除客户")?;
        let (first, last) =
            validator::require_name_criteria(query.first_name.as_deref(), query.last_name.as_deref())?;
        let actor = self.identity.actor();

        let purge = self.store.write(|tx| {
            let client = self.lifecycle.resolve_client_by_name(tx, first, last)?;
            Ok(self.lifecycle.purge_client(tx, client.id, &actor)?)
        })?;

        Ok(self.finish_purge(purge))
    }

    fn finish_purge(&self, purge: ClientPurge) -> Client {
        for order in &purge.orders {
            self.receipts.discard(&order.identifier);
        }
        purge.client
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_patch_is_empty() {
        assert!(ClientPatch::default().is_empty());
        let patch = ClientPatch {
            phone: Some("123".to_string()),
            ..Default::default()
        };
        assert!(!patch.is_empty());
    }

    #[test]
    fn test_apply_patch_validates_before_mutating() {
        let mut client = Client {
            id: 1,
            first_name: "Иван".to_string(),
            last_name: "Петров".to_string(),
            middle_name: String::new(),
            birth_date: None,
            phone: String::new(),
            address: String::new(),
        };
        let bad = ClientPatch {
            phone: Some("555".to_string()),
            birth_date: Some("yesterday".to_string()),
            ..Default::default()
        };
        assert!(apply_patch(&mut client, &bad).is_err());
        assert_eq!(client.phone, "");

        let good = ClientPatch {
            last_name: Some(" Сидоров ".to_string()),
            birth_date: Some("1985-01-02".to_string()),
            ..Default::default()
        };
        apply_patch(&mut client, &good).unwrap();
        assert_eq!(client.last_name, "Сидоров");
        assert_eq!(client.birth_date, chrono::NaiveDate::from_ymd_opt(1985, 1, 2));
    }

    #[test]
    fn test_to_record_requires_names() {
        let input = NewClient {
            first_name: "Иван".to_string(),
            last_name: " ".to_string(),
            ..Default::default()
        };
        assert!(matches!(to_record(&input), Err(ApiError::ValidationError(_))));
    }
}
