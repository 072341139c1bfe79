use crate::error::AdjudicationError;
use crate::models::{BatchOutcome, ClaimResult, RawTable};
use crate::service::evaluator::evaluate;
use crate::service::ledger_store::Ledger;
use crate::service::normalizer::{ClaimNormalizer, ClaimSchema};
use rayon::prelude::*;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// 批处理进度观察者
///
/// 每行完成后调用一次，可能来自任意工作线程，调用顺序不保证与行号一致。
pub trait BatchObserver: Sync {
    fn on_result(&self, index: usize, total: usize, result: &ClaimResult);
}

impl<F> BatchObserver for F
where
    F: Fn(usize, usize, &ClaimResult) + Sync,
{
    fn on_result(&self, index: usize, total: usize, result: &ClaimResult) {
        self(index, total, result)
    }
}

/// 不做任何事的观察者
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl BatchObserver for NoopObserver {
    fn on_result(&self, _index: usize, _total: usize, _result: &ClaimResult) {}
}

/// 进度日志 (每 N 行或第一行/最后一行)
#[derive(Debug)]
pub struct ProgressLogger {
    every: usize,
    completed: AtomicUsize,
}

impl ProgressLogger {
    pub fn new(every: usize) -> Self {
        Self {
            every: every.max(1),
            completed: AtomicUsize::new(0),
        }
    }

    pub fn completed(&self) -> usize {
        self.completed.load(Ordering::Relaxed)
    }
}

impl BatchObserver for ProgressLogger {
    fn on_result(&self, _index: usize, total: usize, _result: &ClaimResult) {
        let done = self.completed.fetch_add(1, Ordering::Relaxed) + 1;
        if done == 1 || done % self.every == 0 || done == total {
            tracing::info!("Claim progress: {}/{}", done, total);
        }
    }
}

/// 批处理编排器
///
/// 表头校验失败时整批中止；单行失败只产生该行的 ERROR 结果。
/// 行在 rayon 线程池上并行评估，通过有索引的并行迭代器收集，
/// 输出顺序始终等于输入顺序。
pub struct BatchOrchestrator {
    ledger: Arc<Ledger>,
    normalizer: ClaimNormalizer,
    pool: Option<rayon::ThreadPool>,
}

impl BatchOrchestrator {
    /// 使用 rayon 全局线程池
    pub fn new(ledger: Arc<Ledger>) -> Self {
        Self {
            ledger,
            normalizer: ClaimNormalizer::new(),
            pool: None,
        }
    }

    /// 使用独立的固定宽度线程池
    pub fn with_worker_threads(
        ledger: Arc<Ledger>,
        threads: usize,
    ) -> Result<Self, AdjudicationError> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .thread_name(|i| format!("adjudicator-{i}"))
            .build()?;
        Ok(Self {
            ledger,
            normalizer: ClaimNormalizer::new(),
            pool: Some(pool),
        })
    }

    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    /// 校验表头
    pub fn schema(&self, table: &RawTable) -> Result<ClaimSchema, AdjudicationError> {
        self.normalizer.resolve_schema(&table.columns).map_err(|e| {
            tracing::error!("Batch rejected before processing: {}", e);
            AdjudicationError::from(e)
        })
    }

    /// 批量裁决入口
    pub fn run(
        &self,
        table: &RawTable,
        observer: &dyn BatchObserver,
    ) -> Result<BatchOutcome, AdjudicationError> {
        let schema = self.schema(table)?;
        let total = table.rows.len();

        tracing::info!(
            "Batch started: {} rows against {} ledger line items",
            total,
            self.ledger.len()
        );

        let work = || {
            table
                .rows
                .par_iter()
                .enumerate()
                .map(|(index, row)| {
                    let result = self.adjudicate_row(&schema, index, row);
                    observer.on_result(index, total, &result);
                    result
                })
                .collect::<Vec<_>>()
        };
        let results = match &self.pool {
            Some(pool) => pool.install(work),
            None => work(),
        };

        let outcome = BatchOutcome::new(results);
        tracing::info!("Batch complete: {}", outcome.summary);
        Ok(outcome)
    }

    /// 单行裁决；调用方可以逐行驱动并在任意行边界停止
    pub fn adjudicate_row(
        &self,
        schema: &ClaimSchema,
        index: usize,
        row: &[Option<String>],
    ) -> ClaimResult {
        match self.normalizer.normalize_row(schema, row) {
            Ok(claim) => {
                let evaluation = evaluate(&claim, &self.ledger);
                tracing::debug!(
                    "Row {}: {} {} -> {}",
                    index,
                    claim.billing_number,
                    claim.claim_amount,
                    evaluation.disposition
                );
                ClaimResult {
                    row: index,
                    claim: Some(claim),
                    raw: None,
                    disposition: evaluation.disposition,
                    reason: evaluation.reason,
                    matched_items: evaluation.matched_items,
                }
            }
            Err((err, raw)) => {
                tracing::warn!(
                    "Row {} (billing number {}) could not be processed: {}",
                    index,
                    raw.billing_number.as_deref().unwrap_or("UNKNOWN"),
                    err
                );
                ClaimResult::error(index, raw, err.to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Disposition;
    use std::sync::Mutex;

    fn table(rows: &[[&str; 2]]) -> RawTable {
        let mut table = RawTable::new(vec!["Billing Number".into(), "Claim Amount".into()]);
        for [billing, amount] in rows {
            table.push_row([Some(*billing), Some(*amount)]);
        }
        table
    }

    #[test]
    fn malformed_row_is_isolated() {
        let orchestrator = BatchOrchestrator::new(Arc::new(Ledger::sample()));
        let input = table(&[["B123", "120.00"], ["B124", "abc"], ["B125", "150"]]);

        let outcome = orchestrator.run(&input, &NoopObserver).unwrap();
        let dispositions: Vec<_> = outcome.results.iter().map(|r| r.disposition).collect();
        assert_eq!(
            dispositions,
            vec![Disposition::Approved, Disposition::Error, Disposition::Approved]
        );

        let failed = &outcome.results[1];
        assert_eq!(failed.row, 1);
        assert!(failed.claim.is_none());
        assert_eq!(failed.raw.as_ref().unwrap().claim_amount.as_deref(), Some("abc"));
        assert!(failed.reason.contains("abc"));
        assert_eq!(outcome.summary.error, 1);
        assert_eq!(outcome.summary.approved, 2);
    }

    #[test]
    fn missing_column_aborts_without_results() {
        let orchestrator = BatchOrchestrator::new(Arc::new(Ledger::sample()));
        let mut input = RawTable::new(vec!["billing_number".into(), "amount".into()]);
        input.push_row([Some("B123"), Some("120.00")]);

        let calls = AtomicUsize::new(0);
        let observer = |_: usize, _: usize, _: &ClaimResult| {
            calls.fetch_add(1, Ordering::Relaxed);
        };
        let err = orchestrator.run(&input, &observer).unwrap_err();

        match err {
            AdjudicationError::Schema(schema) => assert_eq!(schema.missing, vec!["claim_amount"]),
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(calls.load(Ordering::Relaxed), 0);
    }

    #[test]
    fn parallel_output_keeps_input_order() {
        let orchestrator =
            BatchOrchestrator::with_worker_threads(Arc::new(Ledger::sample()), 4).unwrap();
        let amounts = ["120.00", "280.00", "75.00", "oops", "200.00"];
        let rows: Vec<[&str; 2]> = (0..500)
            .map(|i| [if i % 7 == 0 { "B999" } else { "B123" }, amounts[i % amounts.len()]])
            .collect();
        let input = table(&rows);

        let seen = Mutex::new(Vec::new());
        let observer = |index: usize, total: usize, _: &ClaimResult| {
            assert_eq!(total, 500);
            seen.lock().unwrap().push(index);
        };
        let outcome = orchestrator.run(&input, &observer).unwrap();

        assert_eq!(outcome.results.len(), 500);
        for (i, result) in outcome.results.iter().enumerate() {
            assert_eq!(result.row, i);
        }
        let mut seen = seen.into_inner().unwrap();
        seen.sort_unstable();
        assert_eq!(seen, (0..500).collect::<Vec<_>>());
    }

    #[test]
    fn progress_logger_counts_every_row() {
        let orchestrator = BatchOrchestrator::new(Arc::new(Ledger::sample()));
        let input = table(&[["B123", "120.00"], ["B126", "75.00"], ["", "1.00"]]);
        let logger = ProgressLogger::new(2);

        let outcome = orchestrator.run(&input, &logger).unwrap();
        assert_eq!(logger.completed(), 3);
        assert_eq!(outcome.results[2].disposition, Disposition::Error);
        assert_eq!(outcome.results[2].reason, "missing billing number");
    }

    #[test]
    fn empty_batch_yields_empty_outcome() {
        let orchestrator = BatchOrchestrator::new(Arc::new(Ledger::sample()));
        let outcome = orchestrator.run(&table(&[]), &NoopObserver).unwrap();
        assert!(outcome.results.is_empty());
        assert_eq!(outcome.summary.total, 0);
    }
}
