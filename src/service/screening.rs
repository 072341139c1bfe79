use crate::models::{BatchOutcome, Claim, ClaimResult, Disposition};
use bigdecimal::ToPrimitive;
use futures::future::BoxFuture;
use futures::stream::{self, StreamExt};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// 评分器错误
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScoreError {
    #[error("scorer unavailable: {0}")]
    Unavailable(String),

    #[error("scorer rejected claim: {0}")]
    Rejected(String),
}

/// 风险评分接口
///
/// 只返回 [0, 1] 区间的数值分数，不返回自由文本。
pub trait RiskScorer: Send + Sync {
    fn score<'a>(&'a self, claim: &'a Claim) -> BoxFuture<'a, Result<f64, ScoreError>>;
}

/// 按金额占上限比例评分
#[derive(Debug, Clone)]
pub struct AmountCeilingScorer {
    ceiling: f64,
}

impl AmountCeilingScorer {
    pub fn new(ceiling: f64) -> Self {
        Self { ceiling }
    }
}

impl RiskScorer for AmountCeilingScorer {
    fn score<'a>(&'a self, claim: &'a Claim) -> BoxFuture<'a, Result<f64, ScoreError>> {
        Box::pin(async move {
            if !(self.ceiling > 0.0) {
                return Err(ScoreError::Unavailable(format!(
                    "ceiling must be positive, got {}",
                    self.ceiling
                )));
            }
            let amount = claim
                .claim_amount
                .as_decimal()
                .to_f64()
                .ok_or_else(|| ScoreError::Rejected("amount out of range".to_string()))?;
            Ok((amount.abs() / self.ceiling).clamp(0.0, 1.0))
        })
    }
}

/// 筛查策略
#[derive(Debug, Clone, PartialEq)]
pub struct ScreeningPolicy {
    /// 分数达到该阈值转为 REVIEW
    pub review_threshold: f64,
    pub timeout: Duration,
    pub concurrency: usize,
}

impl Default for ScreeningPolicy {
    fn default() -> Self {
        Self {
            review_threshold: 0.8,
            timeout: Duration::from_millis(500),
            concurrency: 8,
        }
    }
}

/// 批准结果的二次筛查
#[derive(Clone)]
pub struct Screening {
    scorer: Arc<dyn RiskScorer>,
    policy: ScreeningPolicy,
}

impl Screening {
    pub fn new(scorer: Arc<dyn RiskScorer>, policy: ScreeningPolicy) -> Self {
        Self { scorer, policy }
    }

    pub fn policy(&self) -> &ScreeningPolicy {
        &self.policy
    }

    /// 对整批结果筛查，保持原有顺序
    pub async fn screen_outcome(&self, mut outcome: BatchOutcome) -> BatchOutcome {
        let results = std::mem::take(&mut outcome.results);
        outcome.results = stream::iter(results)
            .map(|result| self.screen(result))
            .buffered(self.policy.concurrency.max(1))
            .collect::<Vec<_>>()
            .await;
        outcome.refresh_summary();
        outcome
    }

    /// 只对 APPROVED 结果评分；超时或失败一律转 REVIEW
    pub async fn screen(&self, mut result: ClaimResult) -> ClaimResult {
        if result.disposition != Disposition::Approved {
            return result;
        }
        let Some(claim) = result.claim.as_ref() else {
            return result;
        };

        let scored = tokio::time::timeout(self.policy.timeout, self.scorer.score(claim)).await;
        let review_reason = match scored {
            Ok(Ok(score)) if !(0.0..=1.0).contains(&score) => {
                Some(format!("risk scorer returned invalid score {score}"))
            }
            Ok(Ok(score)) if score >= self.policy.review_threshold => Some(format!(
                "risk score {score:.2} at or above review threshold {:.2}",
                self.policy.review_threshold
            )),
            Ok(Ok(_)) => None,
            Ok(Err(e)) => Some(format!("risk scoring failed: {e}")),
            Err(_) => Some(format!(
                "risk scoring timed out after {} ms",
                self.policy.timeout.as_millis()
            )),
        };

        if let Some(reason) = review_reason {
            tracing::warn!("Row {} flagged for review: {}", result.row, reason);
            result.disposition = Disposition::Review;
            result.reason = format!("{}; {}", result.reason, reason);
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Amount, LineItem};

    struct FixedScorer(f64);

    impl RiskScorer for FixedScorer {
        fn score<'a>(&'a self, _claim: &'a Claim) -> BoxFuture<'a, Result<f64, ScoreError>> {
            Box::pin(async move { Ok(self.0) })
        }
    }

    struct SlowScorer;

    impl RiskScorer for SlowScorer {
        fn score<'a>(&'a self, _claim: &'a Claim) -> BoxFuture<'a, Result<f64, ScoreError>> {
            Box::pin(async {
                tokio::time::sleep(Duration::from_secs(30)).await;
                Ok(0.0)
            })
        }
    }

    struct FailingScorer;

    impl RiskScorer for FailingScorer {
        fn score<'a>(&'a self, _claim: &'a Claim) -> BoxFuture<'a, Result<f64, ScoreError>> {
            Box::pin(async { Err(ScoreError::Unavailable("offline".to_string())) })
        }
    }

    fn approved(row: usize, cents: i64) -> ClaimResult {
        let item = LineItem::new("B1", "P1", "L1", Amount::from_cents(cents));
        ClaimResult {
            row,
            claim: Some(Claim::new("B1", Amount::from_cents(cents))),
            raw: None,
            disposition: Disposition::Approved,
            reason: "exactly one line item matches: L1".to_string(),
            matched_items: vec![item],
        }
    }

    fn screening(scorer: impl RiskScorer + 'static, timeout_ms: u64) -> Screening {
        Screening::new(
            Arc::new(scorer),
            ScreeningPolicy {
                review_threshold: 0.8,
                timeout: Duration::from_millis(timeout_ms),
                concurrency: 4,
            },
        )
    }

    #[tokio::test]
    async fn low_score_keeps_approval() {
        let result = screening(FixedScorer(0.1), 500).screen(approved(0, 100)).await;
        assert_eq!(result.disposition, Disposition::Approved);
    }

    #[tokio::test]
    async fn high_score_flags_review_and_keeps_matches() {
        let result = screening(FixedScorer(0.9), 500).screen(approved(0, 100)).await;
        assert_eq!(result.disposition, Disposition::Review);
        assert!(result.reason.contains("review threshold"));
        assert_eq!(result.matched_items.len(), 1);
    }

    #[tokio::test]
    async fn timeout_becomes_review() {
        let result = screening(SlowScorer, 20).screen(approved(0, 100)).await;
        assert_eq!(result.disposition, Disposition::Review);
        assert!(result.reason.contains("timed out after 20 ms"));
    }

    #[tokio::test]
    async fn scorer_failure_and_invalid_score_become_review() {
        let result = screening(FailingScorer, 500).screen(approved(0, 100)).await;
        assert_eq!(result.disposition, Disposition::Review);
        assert!(result.reason.contains("offline"));

        let result = screening(FixedScorer(f64::NAN), 500).screen(approved(0, 100)).await;
        assert_eq!(result.disposition, Disposition::Review);
        assert!(result.reason.contains("invalid score"));
    }

    #[tokio::test]
    async fn denied_results_are_not_scored() {
        let mut denied = approved(0, 100);
        denied.disposition = Disposition::Denied;
        let result = screening(FixedScorer(1.0), 500).screen(denied.clone()).await;
        assert_eq!(result, denied);
    }

    #[tokio::test]
    async fn outcome_order_and_summary_are_preserved() {
        // 阈值 0.8，上限 1000: 900.00 -> 0.9 转 REVIEW
        let outcome = BatchOutcome::new(vec![approved(0, 10_000), approved(1, 90_000), approved(2, 5_000)]);
        let screened = screening(AmountCeilingScorer::new(1000.0), 500)
            .screen_outcome(outcome)
            .await;

        let rows: Vec<_> = screened.results.iter().map(|r| r.row).collect();
        assert_eq!(rows, vec![0, 1, 2]);
        assert_eq!(screened.results[1].disposition, Disposition::Review);
        assert_eq!(screened.summary.approved, 2);
        assert_eq!(screened.summary.review, 1);
    }

    #[tokio::test]
    async fn ceiling_scorer_rejects_non_positive_ceiling() {
        let claim = Claim::new("B1", Amount::from_cents(100));
        let err = AmountCeilingScorer::new(0.0).score(&claim).await.unwrap_err();
        assert!(matches!(err, ScoreError::Unavailable(_)));
    }
}
