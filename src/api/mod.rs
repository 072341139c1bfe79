pub mod handlers;

pub use handlers::*;

use crate::service::ClaimAdjudicator;
use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower::ServiceBuilder;

/// 构建路由
pub fn router(adjudicator: Arc<ClaimAdjudicator>, max_body_bytes: usize) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/api/ledger", get(ledger_snapshot))
        .route("/api/claims/batch", post(batch_adjudicate))
        .route("/api/claims/batch/csv", post(batch_adjudicate_csv))
        .route("/api/claims/batch/export", post(batch_export_csv))
        .with_state(adjudicator)
        .layer(ServiceBuilder::new().layer(DefaultBodyLimit::max(max_body_bytes)))
}
