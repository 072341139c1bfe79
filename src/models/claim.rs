use super::Amount;
use serde::{Deserialize, Serialize};

/// 规范化后的索赔记录
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Claim {
    pub billing_number: String,
    pub claim_amount: Amount,
    pub phrase_code: Option<String>,
}

impl Claim {
    pub fn new(billing_number: impl AsRef<str>, claim_amount: Amount) -> Self {
        Self {
            billing_number: billing_number.as_ref().trim().to_string(),
            claim_amount,
            phrase_code: None,
        }
    }

    /// 附带 phrase code；空白值视为未提供
    pub fn with_phrase_code(mut self, phrase_code: impl AsRef<str>) -> Self {
        let code = phrase_code.as_ref().trim();
        self.phrase_code = (!code.is_empty()).then(|| code.to_string());
        self
    }
}

/// 解析失败时保留的原始单元格
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RawClaimInput {
    pub billing_number: Option<String>,
    pub claim_amount: Option<String>,
}

/// 原始表格输入: 列名 + 行 (单元格可能缺失)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawTable {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Option<String>>>,
}

impl RawTable {
    pub fn new(columns: Vec<String>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
        }
    }

    pub fn push_row<I, S>(&mut self, cells: I)
    where
        I: IntoIterator<Item = Option<S>>,
        S: Into<String>,
    {
        self.rows.push(cells.into_iter().map(|c| c.map(Into::into)).collect());
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}
