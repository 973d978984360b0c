//! `GET /api/logs?limit` — tails the process's own structured log ring buffer.

use crate::state::AppState;
use axum::extract::{Query, State};
use axum::response::IntoResponse;
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
pub struct LogsQuery {
    #[serde(default = "default_limit")]
    pub limit: usize,
}

fn default_limit() -> usize {
    100
}

#[derive(Debug, Serialize)]
pub struct LogsResponse {
    pub lines: Vec<String>,
}

pub async fn logs(State(state): State<AppState>, Query(query): Query<LogsQuery>) -> impl IntoResponse {
    let lines = state.logs.tail(query.limit);
    (axum::http::StatusCode::OK, axum::Json(LogsResponse { lines }))
}
