// ==========================================
// 零售订单管理系统 - 订单编号生成器
// ==========================================
// 格式: <姓首字母><名首字母><父称首字母><6位序号>，如 SIV000042
// 规则: 首字母音译为拉丁字母并大写，缺失时为 X
// 约束: 纯函数，无副作用；同一 (首字母, 序号) 恒得同一编号
// ==========================================

use crate::domain::client::Client;
use crate::engine::error::{EngineError, EngineResult};

/// 编号最大长度（orders.identifier 约定）
pub const IDENTIFIER_MAX_LEN: usize = 10;

/// 序号补零宽度
pub const SEQUENCE_WIDTH: usize = 6;

/// 姓名缺失或无法音译时的占位字母
pub const FALLBACK_INITIAL: char = 'X';

/// 首次落库前使用的占位序号
pub const PLACEHOLDER_SEQUENCE: i64 = 0;

// ==========================================
// Initials - 姓名首字母
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Initials {
    pub last: char,
    pub first: char,
    pub middle: char,
}

impl Initials {
    pub fn from_names(last_name: &str, first_name: &str, middle_name: &str) -> Self {
        Self {
            last: initial_of(last_name),
            first: initial_of(first_name),
            middle: initial_of(middle_name),
        }
    }

    pub fn of(client: &Client) -> Self {
        Self::from_names(&client.last_name, &client.first_name, &client.middle_name)
    }
}

/// 取姓名首字母: 首字符音译后的第一个拉丁字母（大写）
///
/// 例如 "Иванов" -> 'I', "Жуков" -> 'Z', "" -> 'X'
pub fn initial_of(name: &str) -> char {
    name.trim()
        .chars()
        .next()
        .and_then(deunicode::deunicode_char)
        .and_then(|latin| latin.chars().find(|c| c.is_ascii_alphabetic()))
        .map(|c| c.to_ascii_uppercase())
        .unwrap_or(FALLBACK_INITIAL)
}

// ==========================================
// IdentifierGenerator - 订单编号生成器
// ==========================================
#[derive(Debug, Clone, Copy, Default)]
pub struct IdentifierGenerator;

impl IdentifierGenerator {
    pub fn new() -> Self {
        Self
    }

    /// 生成订单编号
    pub fn generate(&self, initials: Initials, sequence: i64) -> String {
        format!(
            "{}{}{}{:0width$}",
            initials.last,
            initials.first,
            initials.middle,
            sequence,
            width = SEQUENCE_WIDTH
        )
    }

    /// 占位编号（订单主键分配前使用）
    pub fn placeholder(&self, initials: Initials) -> String {
        self.generate(initials, PLACEHOLDER_SEQUENCE)
    }

    /// 生成并校验长度
    ///
    /// # 错误
    /// - `EngineError::IdentifierOverflow`: 序号过大导致超出 10 个字符
    pub fn generate_checked(&self, initials: Initials, sequence: i64) -> EngineResult<String> {
        let identifier = self.generate(initials, sequence);
        if identifier.len() > IDENTIFIER_MAX_LEN {
            return Err(EngineError::IdentifierOverflow {
                identifier,
                max_len: IDENTIFIER_MAX_LEN,
            });
        }
        Ok(identifier)
    }
}
