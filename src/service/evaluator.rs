use crate::models::{Claim, Disposition, LineItem};
use crate::service::ledger_store::Ledger;

pub const NO_MATCH_REASON: &str = "no matching line item for billing number and amount";
pub const NO_MATCH_WITH_PHRASE_REASON: &str =
    "no matching line item for billing number, amount and phrase code";
pub const AMBIGUOUS_REASON: &str = "multiple line items match the exact billing number and amount combination; ambiguous even if their sum equals the claim amount";

/// 规则评估结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Evaluation {
    pub disposition: Disposition,
    pub reason: String,
    pub matched_items: Vec<LineItem>,
}

/// 裁决规则 (纯函数，无副作用)
///
/// 仅当恰好一条明细同时匹配 billing_number、amount (以及索赔提供的 phrase_code) 时批准。
/// 多条明细的金额永远不会相加来凑成索赔金额：零条或多条匹配均拒绝。
pub fn evaluate(claim: &Claim, ledger: &Ledger) -> Evaluation {
    let matched: Vec<LineItem> = ledger
        .lookup(
            &claim.billing_number,
            &claim.claim_amount,
            claim.phrase_code.as_deref(),
        )
        .into_iter()
        .cloned()
        .collect();

    let (disposition, reason) = match matched.as_slice() {
        [item] => (
            Disposition::Approved,
            format!(
                "exactly one line item matches: {} (billing number {}, phrase code {}, amount {})",
                item.line_item_id, item.billing_number, item.phrase_code, item.amount
            ),
        ),
        [] if claim.phrase_code.is_some() => {
            (Disposition::Denied, NO_MATCH_WITH_PHRASE_REASON.to_string())
        }
        [] => (Disposition::Denied, NO_MATCH_REASON.to_string()),
        _ => (Disposition::Denied, AMBIGUOUS_REASON.to_string()),
    };

    Evaluation {
        disposition,
        reason,
        matched_items: matched,
    }
}
