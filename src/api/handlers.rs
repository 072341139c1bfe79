use crate::error::AdjudicationError;
use crate::models::{BatchOutcome, BatchSummary, LineItem, RawTable};
use crate::service::normalizer::read_csv_table;
use crate::service::reporter::{export_csv, report_rows, ReportRow};
use crate::service::ClaimAdjudicator;
use axum::{
    extract::{Json, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;

/// 请求体: JSON 表格 (单元格可为字符串、数字、布尔或 null)
#[derive(Debug, Deserialize)]
pub struct ClaimTableRequest {
    pub columns: Vec<String>,
    #[serde(default)]
    pub rows: Vec<Vec<Value>>,
}

impl From<ClaimTableRequest> for RawTable {
    fn from(req: ClaimTableRequest) -> Self {
        let mut table = RawTable::new(req.columns);
        for row in req.rows {
            table.push_row(row.into_iter().map(cell_text));
        }
        table
    }
}

fn cell_text(value: Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        other => Some(other.to_string()),
    }
}

/// 响应体
#[derive(Debug, Serialize)]
pub struct BatchResponse {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<BatchSummary>,
    pub results: Vec<ReportRow>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub missing_columns: Vec<String>,
}

impl BatchResponse {
    fn from_outcome(outcome: &BatchOutcome) -> Self {
        Self {
            success: true,
            message: format!("Successfully adjudicated {}", outcome.summary),
            summary: Some(outcome.summary.clone()),
            results: report_rows(&outcome.results),
            missing_columns: Vec::new(),
        }
    }
}

fn error_response(err: AdjudicationError) -> Response {
    let (status, missing_columns) = match &err {
        AdjudicationError::Schema(schema) => (StatusCode::UNPROCESSABLE_ENTITY, schema.missing.clone()),
        AdjudicationError::Csv(_) => (StatusCode::BAD_REQUEST, Vec::new()),
        _ => (StatusCode::INTERNAL_SERVER_ERROR, Vec::new()),
    };
    if status.is_server_error() {
        tracing::error!("Batch failed: {}", err);
    }

    let response = BatchResponse {
        success: false,
        message: format!("Error: {}", err),
        summary: None,
        results: Vec::new(),
        missing_columns,
    };
    (status, Json(response)).into_response()
}

async fn adjudicate_table(adjudicator: &ClaimAdjudicator, table: RawTable) -> Response {
    match adjudicator.adjudicate(table).await {
        Ok(outcome) => (StatusCode::OK, Json(BatchResponse::from_outcome(&outcome))).into_response(),
        Err(e) => error_response(e),
    }
}

/// 健康检查
pub async fn health_check() -> &'static str {
    "OK"
}

/// 账本快照预览
pub async fn ledger_snapshot(State(adjudicator): State<Arc<ClaimAdjudicator>>) -> Json<Vec<LineItem>> {
    Json(adjudicator.ledger().items().to_vec())
}

/// 批量裁决 (JSON 表格)
pub async fn batch_adjudicate(
    State(adjudicator): State<Arc<ClaimAdjudicator>>,
    Json(req): Json<ClaimTableRequest>,
) -> Response {
    adjudicate_table(&adjudicator, req.into()).await
}

/// 批量裁决 (CSV 文本)
pub async fn batch_adjudicate_csv(
    State(adjudicator): State<Arc<ClaimAdjudicator>>,
    body: String,
) -> Response {
    match read_csv_table(body.as_bytes()) {
        Ok(table) => adjudicate_table(&adjudicator, table).await,
        Err(e) => error_response(e),
    }
}

/// 批量裁决并导出 CSV 报表
pub async fn batch_export_csv(
    State(adjudicator): State<Arc<ClaimAdjudicator>>,
    body: String,
) -> Response {
    let table = match read_csv_table(body.as_bytes()) {
        Ok(table) => table,
        Err(e) => return error_response(e),
    };
    let outcome = match adjudicator.adjudicate(table).await {
        Ok(outcome) => outcome,
        Err(e) => return error_response(e),
    };

    let mut buf = Vec::new();
    if let Err(e) = export_csv(&report_rows(&outcome.results), &mut buf) {
        return error_response(e.into());
    }
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/csv; charset=utf-8")],
        buf,
    )
        .into_response()
}
