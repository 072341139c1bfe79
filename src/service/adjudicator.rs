use crate::config::AppConfig;
use crate::error::AdjudicationError;
use crate::models::{BatchOutcome, RawTable};
use crate::service::ledger_store::Ledger;
use crate::service::orchestrator::{BatchOrchestrator, ProgressLogger};
use crate::service::screening::{AmountCeilingScorer, Screening, ScreeningPolicy};
use std::sync::Arc;
use std::time::Duration;

/// 裁决服务：编排器 + 可选的风险筛查
///
/// HTTP 接口与命令行共用。批处理是 CPU 密集型任务，放在阻塞线程上执行。
#[derive(Clone)]
pub struct ClaimAdjudicator {
    orchestrator: Arc<BatchOrchestrator>,
    screening: Option<Screening>,
    progress_every: usize,
}

impl ClaimAdjudicator {
    pub fn new(orchestrator: BatchOrchestrator) -> Self {
        Self {
            orchestrator: Arc::new(orchestrator),
            screening: None,
            progress_every: 100,
        }
    }

    /// 根据配置构建 (线程池宽度、筛查、进度频率)
    pub fn from_config(ledger: Ledger, config: &AppConfig) -> Result<Self, AdjudicationError> {
        let ledger = Arc::new(ledger);
        let orchestrator = match config.batch.worker_threads {
            Some(threads) if threads > 0 => BatchOrchestrator::with_worker_threads(ledger, threads)?,
            _ => BatchOrchestrator::new(ledger),
        };

        let mut adjudicator = Self::new(orchestrator);
        adjudicator.progress_every = config.batch.progress_every;

        let screening = &config.screening;
        if screening.enabled {
            tracing::info!(
                "Risk screening enabled: ceiling {}, threshold {}, timeout {} ms",
                screening.amount_ceiling,
                screening.review_threshold,
                screening.timeout_ms
            );
            adjudicator = adjudicator.with_screening(Screening::new(
                Arc::new(AmountCeilingScorer::new(screening.amount_ceiling)),
                ScreeningPolicy {
                    review_threshold: screening.review_threshold,
                    timeout: Duration::from_millis(screening.timeout_ms),
                    concurrency: screening.concurrency,
                },
            ));
        }

        Ok(adjudicator)
    }

    pub fn with_screening(mut self, screening: Screening) -> Self {
        self.screening = Some(screening);
        self
    }

    pub fn ledger(&self) -> &Ledger {
        self.orchestrator.ledger()
    }

    /// 批量裁决：先同步规则评估，再对批准结果做筛查
    pub async fn adjudicate(&self, table: RawTable) -> Result<BatchOutcome, AdjudicationError> {
        let orchestrator = Arc::clone(&self.orchestrator);
        let progress_every = self.progress_every;

        let outcome = tokio::task::spawn_blocking(move || {
            let progress = ProgressLogger::new(progress_every);
            orchestrator.run(&table, &progress)
        })
        .await??;

        match &self.screening {
            Some(screening) => Ok(screening.screen_outcome(outcome).await),
            None => Ok(outcome),
        }
    }
}
