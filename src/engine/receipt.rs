// ==========================================
// 零售订单管理系统 - 收据旁路通道
// ==========================================
// 职责: 订单变更后（重新）生成收据文件
// 策略: 收据失败只记录 warn，不影响订单操作结果
//       （显式调用 generate_receipt 时例外，错误向上返回）
// 说明: Engine 层定义 ReceiptRenderer trait，具体格式由实现决定
// ==========================================

use crate::domain::order::OrderDetail;
use chrono::NaiveDateTime;
use serde::Serialize;
use std::error::Error;
use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// 渲染器错误类型
pub type RendererError = Box<dyn Error + Send + Sync>;

// ==========================================
// Receipt - 收据内容
// ==========================================

/// 收据行
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReceiptLine {
    pub number: usize,
    pub product_id: i64,
    pub product_name: String,
    pub quantity: i64,
    pub unit_price: f64,
    pub amount: f64,
}

/// 收据
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Receipt {
    pub identifier: String,
    pub client_name: String,
    pub supplier: String,
    pub issued_at: NaiveDateTime,
    pub lines: Vec<ReceiptLine>,
    pub total: f64,
}

impl Receipt {
    /// 由订单完整视图构造收据
    pub fn from_detail(detail: &OrderDetail, supplier: &str, issued_at: NaiveDateTime) -> Self {
        let lines: Vec<ReceiptLine> = detail
            .lines
            .iter()
            .enumerate()
            .map(|(idx, line)| ReceiptLine {
                number: idx + 1,
                product_id: line.product.id,
                product_name: line.product.name.clone(),
                quantity: line.item.quantity,
                unit_price: line.product.price,
                amount: line.amount(),
            })
            .collect();

        Self {
            identifier: detail.order.identifier.clone(),
            client_name: detail.client.display_name(),
            supplier: supplier.to_string(),
            issued_at,
            total: lines.iter().map(|l| l.amount).sum(),
            lines,
        }
    }

    /// 纯文本版式
    pub fn to_text(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(
            out,
            "Товарный чек № {} от {}",
            self.identifier,
            self.issued_at.format("%d.%m.%Y %H:%M")
        );
        let _ = writeln!(out, "Поставщик: {}", self.supplier);
        let _ = writeln!(out, "Покупатель: {}", self.client_name);
        let _ = writeln!(out);
        let _ = writeln!(
            out,
            "{:<4}{:<10}{:<32}{:>10}{:>12}{:>12}",
            "№", "Артикул", "Товар", "Кол-во", "Цена", "Сумма"
        );
        for line in &self.lines {
            let _ = writeln!(
                out,
                "{:<4}{:<10}{:<32}{:>10}{:>12.2}{:>12.2}",
                line.number,
                line.product_id,
                line.product_name,
                line.quantity,
                line.unit_price,
                line.amount
            );
        }
        let _ = writeln!(out);
        let _ = writeln!(
            out,
            "Всего наименований {}, на сумму {:.2} руб.",
            self.lines.len(),
            self.total
        );
        let _ = writeln!(out, "Отпустил _______________  Получил _______________");
        out
    }
}

// ==========================================
// 收据渲染 Trait
// ==========================================

/// 收据渲染器
///
/// # 实现说明
/// - `render` 返回 `Ok(None)` 表示渲染器主动跳过（如 NoOp）
/// - `discard` 在文件不存在时返回 `Ok(false)`
pub trait ReceiptRenderer: Send + Sync {
    fn render(&self, receipt: &Receipt) -> Result<Option<PathBuf>, RendererError>;

    fn discard(&self, identifier: &str) -> Result<bool, RendererError>;

    fn locate(&self, identifier: &str) -> Option<PathBuf>;
}

/// 空操作渲染器（测试/无需收据的场景）
#[derive(Debug, Clone, Default)]
pub struct NoOpReceiptRenderer;

impl ReceiptRenderer for NoOpReceiptRenderer {
    fn render(&self, receipt: &Receipt) -> Result<Option<PathBuf>, RendererError> {
        tracing::debug!("NoOpReceiptRenderer: 跳过收据渲染 - identifier={}", receipt.identifier);
        Ok(None)
    }

    fn discard(&self, _identifier: &str) -> Result<bool, RendererError> {
        Ok(false)
    }

    fn locate(&self, _identifier: &str) -> Option<PathBuf> {
        None
    }
}

/// 纯文本收据渲染器: <dir>/<identifier>_receipt.txt
#[derive(Debug, Clone)]
pub struct TextReceiptRenderer {
    dir: PathBuf,
}

impl TextReceiptRenderer {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, identifier: &str) -> PathBuf {
        self.dir.join(format!("{identifier}_receipt.txt"))
    }
}

impl ReceiptRenderer for TextReceiptRenderer {
    fn render(&self, receipt: &Receipt) -> Result<Option<PathBuf>, RendererError> {
        fs::create_dir_all(&self.dir)?;
        let path = self.path_for(&receipt.identifier);
        fs::write(&path, receipt.to_text())?;
        Ok(Some(path))
    }

    fn discard(&self, identifier: &str) -> Result<bool, RendererError> {
        let path = self.path_for(identifier);
        if !path.exists() {
            return Ok(false);
        }
        fs::remove_file(&path)?;
        Ok(true)
    }

    fn locate(&self, identifier: &str) -> Option<PathBuf> {
        let path = self.path_for(identifier);
        path.exists().then_some(path)
    }
}

// ==========================================
// ReceiptPublisher - 收据发布（命名的吞错策略）
// ==========================================

/// 收据旁路结果
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum ReceiptOutcome {
    Rendered(PathBuf),
    Discarded,
    Skipped,
    Failed(String),
}

impl ReceiptOutcome {
    pub fn is_failed(&self) -> bool {
        matches!(self, ReceiptOutcome::Failed(_))
    }
}

/// 可选渲染器包装
///
/// 简化 Option<Arc<dyn ReceiptRenderer>> 的使用；
/// refresh/discard 永不返回错误，失败体现在 ReceiptOutcome::Failed
#[derive(Clone)]
pub struct ReceiptPublisher {
    inner: Option<Arc<dyn ReceiptRenderer>>,
}

impl ReceiptPublisher {
    pub fn with_renderer(renderer: Arc<dyn ReceiptRenderer>) -> Self {
        Self {
            inner: Some(renderer),
        }
    }

    pub fn none() -> Self {
        Self { inner: None }
    }

    pub fn is_configured(&self) -> bool {
        self.inner.is_some()
    }

    /// 丢弃旧收据并渲染新收据
    pub fn refresh(&self, receipt: &Receipt) -> ReceiptOutcome {
        let Some(renderer) = &self.inner else {
            return ReceiptOutcome::Skipped;
        };

        if let Err(e) = renderer.discard(&receipt.identifier) {
            tracing::warn!(identifier = %receipt.identifier, error = %e, "旧收据删除失败");
        }

        match renderer.render(receipt) {
            Ok(Some(path)) => {
                tracing::debug!(identifier = %receipt.identifier, path = %path.display(), "收据已生成");
                ReceiptOutcome::Rendered(path)
            }
            Ok(None) => ReceiptOutcome::Skipped,
            Err(e) => {
                tracing::warn!(identifier = %receipt.identifier, error = %e, "收据生成失败（已忽略）");
                ReceiptOutcome::Failed(e.to_string())
            }
        }
    }

    /// 删除订单对应的收据
    pub fn discard(&self, identifier: &str) -> ReceiptOutcome {
        let Some(renderer) = &self.inner else {
            return ReceiptOutcome::Skipped;
        };

        match renderer.discard(identifier) {
            Ok(true) => ReceiptOutcome::Discarded,
            Ok(false) => ReceiptOutcome::Skipped,
            Err(e) => {
                tracing::warn!(identifier = %identifier, error = %e, "收据删除失败（已忽略）");
                ReceiptOutcome::Failed(e.to_string())
            }
        }
    }

    /// 显式生成收据，错误向上返回
    pub fn render_strict(&self, receipt: &Receipt) -> Result<Option<PathBuf>, RendererError> {
        match &self.inner {
            Some(renderer) => {
                renderer.discard(&receipt.identifier)?;
                renderer.render(receipt)
            }
            None => Ok(None),
        }
    }

    pub fn locate(&self, identifier: &str) -> Option<PathBuf> {
        self.inner.as_ref().and_then(|r| r.locate(identifier))
    }
}

impl Default for ReceiptPublisher {
    fn default() -> Self {
        Self::none()
    }
}

impl std::fmt::Debug for ReceiptPublisher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReceiptPublisher")
            .field("configured", &self.is_configured())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::client::Client;
    use crate::domain::order::{Order, OrderItem, OrderLine};
    use crate::domain::product::Product;
    use crate::domain::types::OrderStatus;
    use chrono::NaiveDate;

    // ==========================================
    // 测试数据准备
    // ==========================================

    fn issued_at() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 3, 14)
            .unwrap()
            .and_hms_opt(10, 30, 0)
            .unwrap()
    }

    fn sample_detail() -> OrderDetail {
        let product = |id: i64, name: &str, price: f64| Product {
            id,
            name: name.to_string(),
            image: None,
            price,
            stock: 10,
        };
        let item = |id: i64, product_id: i64, quantity: i64| OrderItem {
            id,
            order_id: 1,
            product_id,
            quantity,
        };
        OrderDetail {
            order: Order {
                id: 1,
                status: OrderStatus::Pending,
                client_id: 1,
                identifier: "IIP000001".to_string(),
                created_at: issued_at(),
            },
            client: Client {
                id: 1,
                first_name: "Пётр".to_string(),
                last_name: "Иванов".to_string(),
                middle_name: "Ильич".to_string(),
                birth_date: None,
                phone: String::new(),
                address: String::new(),
            },
            lines: vec![
                OrderLine {
                    item: item(1, 7, 2),
                    product: product(7, "Хлеб", 45.5),
                },
                OrderLine {
                    item: item(2, 9, 3),
                    product: product(9, "Сыр", 300.0),
                },
            ],
        }
    }

    struct FailingRenderer;

    impl ReceiptRenderer for FailingRenderer {
        fn render(&self, _receipt: &Receipt) -> Result<Option<PathBuf>, RendererError> {
            Err("disk full".into())
        }

        fn discard(&self, _identifier: &str) -> Result<bool, RendererError> {
            Err("permission denied".into())
        }

        fn locate(&self, _identifier: &str) -> Option<PathBuf> {
            None
        }
    }

    #[test]
    fn test_receipt_from_detail() {
        let receipt = Receipt::from_detail(&sample_detail(), "ИП Иванов И.И.", issued_at());

        assert_eq!(receipt.identifier, "IIP000001");
        assert_eq!(receipt.client_name, "Иванов Пётр");
        assert_eq!(receipt.lines.len(), 2);
        assert_eq!(receipt.lines[1].number, 2);
        assert!((receipt.lines[0].amount - 91.0).abs() < 1e-9);
        assert!((receipt.total - 991.0).abs() < 1e-9);

        let text = receipt.to_text();
        assert!(text.contains("Товарный чек № IIP000001 от 14.03.2026 10:30"));
        assert!(text.contains("Покупатель: Иванов Пётр"));
        assert!(text.contains("на сумму 991.00 руб."));
    }

    #[test]
    fn test_text_renderer_lifecycle() {
        let dir = tempfile::tempdir().unwrap();
        let renderer = TextReceiptRenderer::new(dir.path().join("receipts"));
        let receipt = Receipt::from_detail(&sample_detail(), "ИП", issued_at());

        assert!(renderer.locate("IIP000001").is_none());

        let path = renderer.render(&receipt).unwrap().unwrap();
        assert!(path.ends_with("IIP000001_receipt.txt"));
        assert_eq!(renderer.locate("IIP000001"), Some(path.clone()));

        assert!(renderer.discard("IIP000001").unwrap());
        assert!(!renderer.discard("IIP000001").unwrap());
        assert!(!path.exists());
    }

    #[test]
    fn test_publisher_without_renderer_skips() {
        let publisher = ReceiptPublisher::none();
        let receipt = Receipt::from_detail(&sample_detail(), "ИП", issued_at());

        assert!(!publisher.is_configured());
        assert_eq!(publisher.refresh(&receipt), ReceiptOutcome::Skipped);
        assert_eq!(publisher.discard("IIP000001"), ReceiptOutcome::Skipped);
        assert_eq!(publisher.render_strict(&receipt).unwrap(), None);
    }

    #[test]
    fn test_publisher_swallows_renderer_failures() {
        let publisher = ReceiptPublisher::with_renderer(Arc::new(FailingRenderer));
        let receipt = Receipt::from_detail(&sample_detail(), "ИП", issued_at());

        let outcome = publisher.refresh(&receipt);
        assert_eq!(outcome, ReceiptOutcome::Failed("disk full".to_string()));
        assert!(outcome.is_failed());
        assert!(publisher.discard("IIP000001").is_failed());

        // 显式生成时错误需要向上返回
        assert!(publisher.render_strict(&receipt).is_err());
    }

    #[test]
    fn test_noop_renderer_reports_skipped() {
        let publisher = ReceiptPublisher::with_renderer(Arc::new(NoOpReceiptRenderer));
        let receipt = Receipt::from_detail(&sample_detail(), "ИП", issued_at());
        assert_eq!(publisher.refresh(&receipt), ReceiptOutcome::Skipped);
    }
}
