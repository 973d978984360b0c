//! `GET /api/health` — reports job store and gateway reachability.

use crate::state::AppState;
use axum::extract::State;
use axum::response::IntoResponse;
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub job_store: &'static str,
    pub embedding_store_size: usize,
}

pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let _ = state.orchestrator.job_store().find_sorted(1, 0);
    let response = HealthResponse {
        status: "ok",
        job_store: "reachable",
        embedding_store_size: state.orchestrator.embedding_count(),
    };
    (axum::http::StatusCode::OK, axum::Json(response))
}
