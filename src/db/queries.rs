use crate::error::AdjudicationError;
use crate::models::{Amount, LineItem};
use bigdecimal::BigDecimal;
use sqlx::{FromRow, PgPool};

/// 账本表的一行
#[derive(Debug, Clone, FromRow)]
pub struct LineItemRow {
    pub billing_number: String,
    pub phrase_code: Option<String>,
    pub line_item_id: String,
    pub amount: BigDecimal,
}

/// 表名只允许 `schema.table` 形式的普通标识符
pub fn validate_table_name(table: &str) -> Result<(), AdjudicationError> {
    let valid = !table.is_empty()
        && table.split('.').count() <= 2
        && table.split('.').all(|part| {
            let mut chars = part.chars();
            matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
                && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        });
    if valid {
        Ok(())
    } else {
        Err(AdjudicationError::LedgerTable(table.to_string()))
    }
}

/// 读取全部账本明细，按 billing_number, line_item_id 排序
pub async fn list_line_items(pool: &PgPool, table: &str) -> Result<Vec<LineItem>, AdjudicationError> {
    validate_table_name(table)?;

    let sql = format!(
        r#"
        SELECT billing_number, phrase_code, line_item_id, amount
        FROM {table}
        ORDER BY billing_number, line_item_id
        "#
    );
    let rows = sqlx::query_as::<_, LineItemRow>(&sql).fetch_all(pool).await?;
    tracing::debug!("Fetched {} ledger rows from {}", rows.len(), table);

    rows.into_iter()
        .enumerate()
        .map(|(idx, row)| {
            let amount = Amount::from_decimal(row.amount).map_err(|e| AdjudicationError::LedgerSeed {
                record: idx + 1,
                reason: e.to_string(),
            })?;
            Ok(LineItem::new(
                row.billing_number,
                row.phrase_code.unwrap_or_default(),
                row.line_item_id,
                amount,
            ))
        })
        .collect()
}
