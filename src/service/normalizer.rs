use crate::error::{AdjudicationError, AmountError, RowParseError, SchemaError};
use crate::models::{Amount, Claim, RawClaimInput, RawTable};
use indexmap::IndexMap;
use std::io::Read;

pub const BILLING_NUMBER: &str = "billing_number";
pub const CLAIM_AMOUNT: &str = "claim_amount";
pub const PHRASE_CODE: &str = "phrase_code";

/// 必填列，顺序即报错顺序
pub const REQUIRED_COLUMNS: [&str; 2] = [BILLING_NUMBER, CLAIM_AMOUNT];

/// 列名规范化: 去首尾空白、转小写、内部空白串替换为单个下划线
pub fn normalize_column_name(name: &str) -> String {
    name.split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join("_")
}

/// 已校验的列布局
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClaimSchema {
    billing_number: usize,
    claim_amount: usize,
    phrase_code: Option<usize>,
}

/// 索赔规范化器: 先校验表头，再逐行转换
#[derive(Debug, Clone, Default)]
pub struct ClaimNormalizer;

impl ClaimNormalizer {
    pub fn new() -> Self {
        Self
    }

    /// 校验表头；缺少必填列时整批失败
    pub fn resolve_schema(&self, columns: &[String]) -> Result<ClaimSchema, SchemaError> {
        // 同名列以第一次出现为准
        let mut positions: IndexMap<String, usize> = IndexMap::new();
        for (idx, column) in columns.iter().enumerate() {
            positions.entry(normalize_column_name(column)).or_insert(idx);
        }

        let missing: Vec<String> = REQUIRED_COLUMNS
            .iter()
            .filter(|name| !positions.contains_key(**name))
            .map(|name| name.to_string())
            .collect();
        if !missing.is_empty() {
            return Err(SchemaError { missing });
        }

        Ok(ClaimSchema {
            billing_number: positions[BILLING_NUMBER],
            claim_amount: positions[CLAIM_AMOUNT],
            phrase_code: positions.get(PHRASE_CODE).copied(),
        })
    }

    /// 将一行转换为 Claim；失败时返回行级错误与原始单元格
    pub fn normalize_row(
        &self,
        schema: &ClaimSchema,
        row: &[Option<String>],
    ) -> Result<Claim, (RowParseError, RawClaimInput)> {
        let cell = |idx: usize| {
            row.get(idx)
                .and_then(|c| c.as_deref())
                .map(str::trim)
                .filter(|c| !c.is_empty())
        };

        let billing_number = cell(schema.billing_number);
        let raw_amount = cell(schema.claim_amount);
        let raw = || RawClaimInput {
            billing_number: billing_number.map(str::to_string),
            claim_amount: raw_amount.map(str::to_string),
        };

        let Some(billing_number) = billing_number else {
            return Err((RowParseError::MissingBillingNumber, raw()));
        };
        let Some(amount_text) = raw_amount else {
            return Err((RowParseError::MissingClaimAmount, raw()));
        };

        let claim_amount = Amount::parse(amount_text).map_err(|e| {
            let err = match e {
                AmountError::Empty => RowParseError::MissingClaimAmount,
                AmountError::Invalid(_) => RowParseError::InvalidAmount {
                    raw: amount_text.to_string(),
                },
                AmountError::ExcessPrecision(_) => RowParseError::ExcessPrecision {
                    raw: amount_text.to_string(),
                },
            };
            (err, raw())
        })?;

        let mut claim = Claim::new(billing_number, claim_amount);
        if let Some(code) = schema.phrase_code.and_then(cell) {
            claim = claim.with_phrase_code(code);
        }
        Ok(claim)
    }
}

/// 读取 CSV 文本为原始表格，短行以缺失单元格补齐
///
/// 非 UTF-8 字节按替换字符解码，坏编码只影响所在行的裁决。
pub fn read_csv_table<R: Read>(reader: R) -> Result<RawTable, AdjudicationError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(reader);

    let columns: Vec<String> = reader.byte_headers()?.iter().map(decode_cell).collect();
    let mut table = RawTable::new(columns);

    for record in reader.byte_records() {
        let record = record?;
        table.push_row(record.iter().map(|cell| Some(decode_cell(cell))));
    }

    Ok(table)
}

fn decode_cell(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).into_owned()
}
