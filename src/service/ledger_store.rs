use crate::config::AppConfig;
use crate::db::{create_pool, queries};
use crate::error::AdjudicationError;
use crate::models::{Amount, LineItem};
use crate::service::normalizer::normalize_column_name;
use std::collections::HashMap;
use std::io::Read;
use std::path::Path;

/// 账本种子 CSV 的必填列
pub const LEDGER_COLUMNS: [&str; 4] = ["billing_number", "phrase_code", "line_item_id", "amount"];

/// 精确查找键: (billing_number, amount)
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct LookupKey {
    billing_number: String,
    amount: Amount,
}

/// 账本快照 - 批次运行期间只读
///
/// 构造时建立 (billing_number, amount) 索引，查找结果保持账本原始顺序。
/// 不含内部可变状态，可被多个线程并发查找。
#[derive(Debug, Clone, Default)]
pub struct Ledger {
    items: Vec<LineItem>,
    index: HashMap<LookupKey, Vec<usize>>,
}

impl Ledger {
    pub fn new(items: Vec<LineItem>) -> Self {
        let mut index: HashMap<LookupKey, Vec<usize>> = HashMap::new();
        for (pos, item) in items.iter().enumerate() {
            index
                .entry(LookupKey {
                    billing_number: item.billing_number.clone(),
                    amount: item.amount.clone(),
                })
                .or_default()
                .push(pos);
        }
        Self { items, index }
    }

    /// 演示用种子数据
    pub fn sample() -> Self {
        Self::new(vec![
            LineItem::new("B123", "P1", "L1", Amount::from_cents(12000)),
            LineItem::new("B123", "P1", "L2", Amount::from_cents(16000)),
            LineItem::new("B124", "P2", "L1", Amount::from_cents(20000)),
            LineItem::new("B125", "P3", "L1", Amount::from_cents(15000)),
            LineItem::new("B126", "P4", "L1", Amount::from_cents(7500)),
            LineItem::new("B126", "P4", "L2", Amount::from_cents(7500)),
        ])
    }

    /// 从种子 CSV 读取账本；任何一条坏记录都会使加载失败
    pub fn from_csv_reader<R: Read>(reader: R) -> Result<Self, AdjudicationError> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(reader);

        let headers: Vec<String> = reader
            .headers()?
            .iter()
            .map(normalize_column_name)
            .collect();

        let mut positions = [0usize; 4];
        for (slot, name) in positions.iter_mut().zip(LEDGER_COLUMNS) {
            *slot = headers.iter().position(|h| h == name).ok_or_else(|| {
                AdjudicationError::LedgerSeed {
                    record: 0,
                    reason: format!("missing column '{name}'"),
                }
            })?;
        }
        let [billing_idx, phrase_idx, item_idx, amount_idx] = positions;

        let mut items = Vec::new();
        for (record_no, record) in reader.records().enumerate() {
            let record = record?;
            let record_no = record_no + 1;
            let cell = |idx: usize| record.get(idx).unwrap_or("").trim();

            let billing_number = cell(billing_idx);
            if billing_number.is_empty() {
                return Err(AdjudicationError::LedgerSeed {
                    record: record_no,
                    reason: "missing billing number".to_string(),
                });
            }
            let line_item_id = cell(item_idx);
            if line_item_id.is_empty() {
                return Err(AdjudicationError::LedgerSeed {
                    record: record_no,
                    reason: "missing line item id".to_string(),
                });
            }
            let amount = Amount::parse(cell(amount_idx)).map_err(|e| {
                AdjudicationError::LedgerSeed {
                    record: record_no,
                    reason: e.to_string(),
                }
            })?;

            items.push(LineItem::new(billing_number, cell(phrase_idx), line_item_id, amount));
        }

        Ok(Self::new(items))
    }

    pub fn from_csv_path(path: &Path) -> Result<Self, AdjudicationError> {
        let file = std::fs::File::open(path)?;
        Self::from_csv_reader(file)
    }

    /// 精确查找: billing_number 与 amount 必须完全相等，
    /// 仅当传入 phrase_code 时再按 phrase_code 过滤
    pub fn lookup(
        &self,
        billing_number: &str,
        amount: &Amount,
        phrase_code: Option<&str>,
    ) -> Vec<&LineItem> {
        let key = LookupKey {
            billing_number: billing_number.trim().to_string(),
            amount: amount.clone(),
        };
        let Some(positions) = self.index.get(&key) else {
            return Vec::new();
        };

        let phrase_code = phrase_code.map(str::trim);
        positions
            .iter()
            .map(|&pos| &self.items[pos])
            .filter(|item| phrase_code.map_or(true, |code| item.phrase_code == code))
            .collect()
    }

    pub fn items(&self) -> &[LineItem] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// 按优先级选择账本来源: 显式种子文件 > 配置种子文件 > 数据库 > 内置样例
pub async fn load_ledger(
    config: &AppConfig,
    seed_override: Option<&Path>,
) -> Result<Ledger, AdjudicationError> {
    let seed_path = seed_override.or(config.ledger.seed_csv.as_deref());

    let ledger = if let Some(path) = seed_path {
        tracing::info!("Loading ledger seed from {}", path.display());
        Ledger::from_csv_path(path)?
    } else if let Some(url) = config.database.url.as_deref() {
        let pool = create_pool(url, &config.database).await?;
        tracing::info!("Database pool created, reading table {}", config.database.ledger_table);
        let items = queries::list_line_items(&pool, &config.database.ledger_table).await?;
        pool.close().await;
        Ledger::new(items)
    } else {
        tracing::info!("No ledger source configured, using built-in sample ledger");
        Ledger::sample()
    };

    tracing::info!("Ledger snapshot ready: {} line items", ledger.len());
    Ok(ledger)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn amt(raw: &str) -> Amount {
        Amount::parse(raw).unwrap()
    }

    fn ids(items: &[&LineItem]) -> Vec<String> {
        items.iter().map(|i| i.line_item_id.clone()).collect()
    }

    #[test]
    fn lookup_matches_billing_number_and_amount_exactly() {
        let ledger = Ledger::sample();
        assert_eq!(ids(&ledger.lookup("B123", &amt("120.00"), None)), vec!["L1"]);
        assert_eq!(ids(&ledger.lookup("B123", &amt("120"), None)), vec!["L1"]);
        assert!(ledger.lookup("B123", &amt("120.01"), None).is_empty());
        assert!(ledger.lookup("b123", &amt("120.00"), None).is_empty());
        assert!(ledger.lookup("B999", &amt("120.00"), None).is_empty());
    }

    #[test]
    fn lookup_trims_keys() {
        let ledger = Ledger::sample();
        assert_eq!(ids(&ledger.lookup("  B124 ", &amt("200"), Some(" P2 "))), vec!["L1"]);
    }

    #[test]
    fn phrase_code_filters_only_when_supplied() {
        let ledger = Ledger::sample();
        assert_eq!(ids(&ledger.lookup("B126", &amt("75"), None)), vec!["L1", "L2"]);
        assert_eq!(ids(&ledger.lookup("B126", &amt("75"), Some("P4"))), vec!["L1", "L2"]);
        assert!(ledger.lookup("B126", &amt("75"), Some("P1")).is_empty());
    }

    #[test]
    fn seed_csv_loads_in_order() {
        let csv = "Billing Number,Phrase Code,Line Item ID,Amount\n\
                   B1,P1,L1,10.00\n\
                   B1, P1 ,L2,\"$1,000.50\"\n";
        let ledger = Ledger::from_csv_reader(csv.as_bytes()).unwrap();
        assert_eq!(ledger.len(), 2);
        assert_eq!(ledger.items()[1].phrase_code, "P1");
        assert_eq!(ledger.items()[1].amount, Amount::from_cents(100050));
    }

    #[test]
    fn seed_csv_rejects_missing_column_and_bad_amount() {
        let err = Ledger::from_csv_reader("billing_number,amount\nB1,1.00\n".as_bytes()).unwrap_err();
        assert!(matches!(err, AdjudicationError::LedgerSeed { record: 0, .. }));

        let csv = "billing_number,phrase_code,line_item_id,amount\nB1,P1,L1,ten\n";
        let err = Ledger::from_csv_reader(csv.as_bytes()).unwrap_err();
        assert!(matches!(err, AdjudicationError::LedgerSeed { record: 1, .. }));
    }
}
