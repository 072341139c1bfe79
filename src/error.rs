use thiserror::Error;

/// 输入表缺少必填列，整批中止
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("missing required columns: {}", missing.join(", "))]
pub struct SchemaError {
    pub missing: Vec<String>,
}

/// 单行解析失败，只影响该行 (结果为 ERROR)
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RowParseError {
    #[error("missing billing number")]
    MissingBillingNumber,

    #[error("missing claim amount")]
    MissingClaimAmount,

    #[error("could not convert claim amount '{raw}' to a decimal")]
    InvalidAmount { raw: String },

    #[error("claim amount '{raw}' has more than two decimal places")]
    ExcessPrecision { raw: String },
}

/// 金额解析错误 (账本与索赔共用)
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AmountError {
    #[error("empty amount")]
    Empty,

    #[error("'{0}' is not a decimal amount")]
    Invalid(String),

    #[error("'{0}' has more than two decimal places")]
    ExcessPrecision(String),
}

/// 裁决流程的顶层错误
#[derive(Debug, Error)]
pub enum AdjudicationError {
    #[error("schema error: {0}")]
    Schema(#[from] SchemaError),

    #[error("ledger seed error at record {record}: {reason}")]
    LedgerSeed { record: usize, reason: String },

    #[error("invalid ledger table name: {0}")]
    LedgerTable(String),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("worker pool error: {0}")]
    WorkerPool(#[from] rayon::ThreadPoolBuildError),

    #[error("batch task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}
