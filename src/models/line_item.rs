use super::Amount;
use serde::Serialize;

/// 账本中的发票明细行
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LineItem {
    pub billing_number: String,
    pub phrase_code: String,
    pub line_item_id: String,
    pub amount: Amount,
}

impl LineItem {
    /// 构造时去除首尾空白，保证后续精确比较
    pub fn new(
        billing_number: impl AsRef<str>,
        phrase_code: impl AsRef<str>,
        line_item_id: impl AsRef<str>,
        amount: Amount,
    ) -> Self {
        Self {
            billing_number: billing_number.as_ref().trim().to_string(),
            phrase_code: phrase_code.as_ref().trim().to_string(),
            line_item_id: line_item_id.as_ref().trim().to_string(),
            amount,
        }
    }
}
