pub mod adjudicator;
pub mod evaluator;
pub mod ledger_store;
pub mod normalizer;
pub mod orchestrator;
pub mod reporter;
pub mod screening;

pub use adjudicator::ClaimAdjudicator;
pub use evaluator::{evaluate, Evaluation};
pub use ledger_store::{load_ledger, Ledger};
pub use normalizer::{read_csv_table, ClaimNormalizer, ClaimSchema};
pub use orchestrator::{BatchObserver, BatchOrchestrator, NoopObserver, ProgressLogger};
pub use screening::{AmountCeilingScorer, RiskScorer, ScoreError, Screening, ScreeningPolicy};
