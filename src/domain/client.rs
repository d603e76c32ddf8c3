// ==========================================
// 零售订单管理系统 - 客户领域模型
// ==========================================

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

// ==========================================
// Client - 客户
// ==========================================
// 一对多: 客户拥有零或多个订单；删除客户前必须先回补其订单库存
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Client {
    pub id: i64,

    // ===== 姓名 =====
    pub first_name: String,  // 名
    pub last_name: String,   // 姓
    pub middle_name: String, // 父称

    pub birth_date: Option<NaiveDate>,

    // ===== 联系方式 =====
    pub phone: String,
    pub address: String,
}

impl Client {
    /// 展示用姓名（“姓 名”），用于小票
    pub fn display_name(&self) -> String {
        format!("{} {}", self.last_name, self.first_name)
            .trim()
            .to_string()
    }
}
