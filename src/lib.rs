pub mod api;
pub mod cli;
pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod service;

pub use config::AppConfig;
pub use db::create_pool;
pub use error::{AdjudicationError, RowParseError, SchemaError};
pub use service::{BatchOrchestrator, ClaimAdjudicator, Ledger};
