use super::{Claim, LineItem, RawClaimInput};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;

/// 裁决结论
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Disposition {
    Approved,
    Denied,
    Review,
    Error,
}

impl Disposition {
    pub fn as_str(&self) -> &'static str {
        match self {
            Disposition::Approved => "APPROVED",
            Disposition::Denied => "DENIED",
            Disposition::Review => "REVIEW",
            Disposition::Error => "ERROR",
        }
    }
}

impl fmt::Display for Disposition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 单行裁决结果，与输入行一一对应
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClaimResult {
    /// 输入行号 (从 0 开始)
    pub row: usize,
    /// 解析失败的行为 None
    pub claim: Option<Claim>,
    /// 解析失败时的原始单元格
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw: Option<RawClaimInput>,
    pub disposition: Disposition,
    pub reason: String,
    pub matched_items: Vec<LineItem>,
}

impl ClaimResult {
    pub fn error(row: usize, raw: RawClaimInput, reason: impl Into<String>) -> Self {
        Self {
            row,
            claim: None,
            raw: Some(raw),
            disposition: Disposition::Error,
            reason: reason.into(),
            matched_items: Vec::new(),
        }
    }
}

/// 批次统计
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BatchSummary {
    pub total: usize,
    pub approved: usize,
    pub denied: usize,
    pub review: usize,
    pub error: usize,
}

impl BatchSummary {
    pub fn from_results(results: &[ClaimResult]) -> Self {
        let mut summary = Self {
            total: results.len(),
            ..Self::default()
        };
        for result in results {
            match result.disposition {
                Disposition::Approved => summary.approved += 1,
                Disposition::Denied => summary.denied += 1,
                Disposition::Review => summary.review += 1,
                Disposition::Error => summary.error += 1,
            }
        }
        summary
    }
}

impl fmt::Display for BatchSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} claims: {} approved, {} denied, {} review, {} error",
            self.total, self.approved, self.denied, self.review, self.error
        )
    }
}

/// 一次批量运行的完整输出
#[derive(Debug, Clone, Serialize)]
pub struct BatchOutcome {
    pub results: Vec<ClaimResult>,
    pub summary: BatchSummary,
    pub completed_at: DateTime<Utc>,
}

impl BatchOutcome {
    pub fn new(results: Vec<ClaimResult>) -> Self {
        let summary = BatchSummary::from_results(&results);
        Self {
            results,
            summary,
            completed_at: Utc::now(),
        }
    }

    /// 结果被筛查改写后重新统计
    pub fn refresh_summary(&mut self) {
        self.summary = BatchSummary::from_results(&self.results);
    }
}
