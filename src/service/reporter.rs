use crate::models::{Amount, ClaimResult, Disposition, LineItem};
use serde::Serialize;
use std::io::Write;

const UNKNOWN: &str = "UNKNOWN";

/// 对外展示的结果行
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReportRow {
    pub billing_number: String,
    pub amount: String,
    pub disposition: Disposition,
    pub reason: String,
    pub matched_items: Vec<LineItem>,
}

impl From<&ClaimResult> for ReportRow {
    fn from(result: &ClaimResult) -> Self {
        let (billing_number, amount) = match (&result.claim, &result.raw) {
            (Some(claim), _) => (claim.billing_number.clone(), format_currency(&claim.claim_amount)),
            (None, Some(raw)) => (
                raw.billing_number.clone().unwrap_or_else(|| UNKNOWN.to_string()),
                raw.claim_amount.clone().unwrap_or_else(|| UNKNOWN.to_string()),
            ),
            (None, None) => (UNKNOWN.to_string(), UNKNOWN.to_string()),
        };
        Self {
            billing_number,
            amount,
            disposition: result.disposition,
            reason: result.reason.clone(),
            matched_items: result.matched_items.clone(),
        }
    }
}

pub fn report_rows(results: &[ClaimResult]) -> Vec<ReportRow> {
    results.iter().map(ReportRow::from).collect()
}

/// 货币格式: `$1,234.50`，负数为 `-$5.00`
pub fn format_currency(amount: &Amount) -> String {
    let text = amount.to_string();
    let (negative, digits) = match text.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, text.as_str()),
    };
    let (whole, fraction) = digits.split_once('.').unwrap_or((digits, "00"));

    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (i, ch) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    format!("{}${}.{}", if negative { "-" } else { "" }, grouped, fraction)
}

fn matched_ids(items: &[LineItem]) -> String {
    items
        .iter()
        .map(|item| item.line_item_id.as_str())
        .collect::<Vec<_>>()
        .join(";")
}

/// 导出 CSV (matched_items 以 `;` 连接明细行号)
pub fn export_csv<W: Write>(rows: &[ReportRow], writer: W) -> Result<(), csv::Error> {
    let mut writer = csv::Writer::from_writer(writer);
    writer.write_record(["billing_number", "amount", "disposition", "reason", "matched_items"])?;

    for row in rows {
        writer.write_record([
            row.billing_number.as_str(),
            row.amount.as_str(),
            row.disposition.as_str(),
            row.reason.as_str(),
            matched_ids(&row.matched_items).as_str(),
        ])?;
    }

    writer.flush()?;
    Ok(())
}

/// 固定宽度文本表格，供命令行输出
pub fn render_table(rows: &[ReportRow]) -> String {
    let headers = ["Billing #", "Amount", "Disposition", "Matched", "Details"];
    let cells: Vec<[String; 5]> = rows
        .iter()
        .map(|row| {
            [
                row.billing_number.clone(),
                row.amount.clone(),
                row.disposition.to_string(),
                matched_ids(&row.matched_items),
                row.reason.clone(),
            ]
        })
        .collect();

    let mut widths = headers.map(|h| h.chars().count());
    for line in &cells {
        for (width, cell) in widths.iter_mut().zip(line) {
            *width = (*width).max(cell.chars().count());
        }
    }

    let mut out = String::new();
    let mut push_line = |values: &[&str]| {
        let padded: Vec<String> = values
            .iter()
            .zip(widths)
            .map(|(value, width)| format!("{value:<width$}"))
            .collect();
        out.push_str(padded.join("  ").trim_end());
        out.push('\n');
    };

    push_line(&headers);
    let rule: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
    push_line(&rule.iter().map(String::as_str).collect::<Vec<_>>());
    for line in &cells {
        push_line(&line.iter().map(String::as_str).collect::<Vec<_>>());
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Claim, RawClaimInput};

    #[test]
    fn currency_is_grouped_with_two_decimals() {
        assert_eq!(format_currency(&Amount::from_cents(12000)), "$120.00");
        assert_eq!(format_currency(&Amount::from_cents(123456789)), "$1,234,567.89");
        assert_eq!(format_currency(&Amount::from_cents(100000)), "$1,000.00");
        assert_eq!(format_currency(&Amount::from_cents(-500)), "-$5.00");
        assert_eq!(format_currency(&Amount::from_cents(5)), "$0.05");
    }

    #[test]
    fn error_rows_show_raw_input() {
        let result = ClaimResult::error(
            3,
            RawClaimInput {
                billing_number: Some("B9".to_string()),
                claim_amount: Some("abc".to_string()),
            },
            "could not convert claim amount 'abc' to a decimal",
        );
        let row = ReportRow::from(&result);
        assert_eq!(row.billing_number, "B9");
        assert_eq!(row.amount, "abc");
        assert_eq!(row.disposition, Disposition::Error);

        let result = ClaimResult::error(0, RawClaimInput::default(), "missing billing number");
        let row = ReportRow::from(&result);
        assert_eq!(row.billing_number, "UNKNOWN");
        assert_eq!(row.amount, "UNKNOWN");
    }

    #[test]
    fn csv_export_joins_matched_items() {
        let items = vec![
            LineItem::new("B126", "P4", "L1", Amount::from_cents(7500)),
            LineItem::new("B126", "P4", "L2", Amount::from_cents(7500)),
        ];
        let result = ClaimResult {
            row: 0,
            claim: Some(Claim::new("B126", Amount::from_cents(7500))),
            raw: None,
            disposition: Disposition::Denied,
            reason: "ambiguous, see items".to_string(),
            matched_items: items,
        };

        let mut buf = Vec::new();
        export_csv(&report_rows(&[result]), &mut buf).unwrap();
        let text = String::from_utf8(buf).unwrap();
        let mut lines = text.lines();
        assert_eq!(lines.next(), Some("billing_number,amount,disposition,reason,matched_items"));
        assert_eq!(lines.next(), Some("B126,$75.00,DENIED,\"ambiguous, see items\",L1;L2"));
    }

    #[test]
    fn table_has_header_rule_and_rows() {
        let result = ClaimResult {
            row: 0,
            claim: Some(Claim::new("B123", Amount::from_cents(12000))),
            raw: None,
            disposition: Disposition::Approved,
            reason: "ok".to_string(),
            matched_items: vec![LineItem::new("B123", "P1", "L1", Amount::from_cents(12000))],
        };
        let table = render_table(&report_rows(&[result]));
        let lines: Vec<&str> = table.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("Billing #"));
        assert!(lines[1].starts_with("---------"));
        assert!(lines[2].contains("$120.00"));
        assert!(lines[2].contains("APPROVED"));
    }
}
