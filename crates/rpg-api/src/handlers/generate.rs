//! `POST /api/zerorepo/generate` — enqueues a full pipeline run and returns immediately.

use crate::error::ApiResult;
use crate::response;
use crate::state::AppState;
use axum::extract::State;
use axum::response::IntoResponse;
use rpg_orchestrator::CancellationToken;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid_like::new_job_id;

#[derive(Debug, Deserialize)]
pub struct GenerateRequest {
    pub project_goal: String,
    #[serde(default)]
    pub domain: Option<String>,
    #[serde(default)]
    pub llm_model: Option<String>,
    #[serde(default)]
    pub max_iterations: Option<usize>,
    #[serde(default)]
    pub target_language: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct GenerateResponse {
    pub job_id: String,
    pub status: &'static str,
}

pub async fn generate(State(state): State<AppState>, axum::Json(request): axum::Json<GenerateRequest>) -> ApiResult<impl IntoResponse> {
    if request.project_goal.trim().is_empty() {
        return Err(crate::error::ApiError::BadRequest("project_goal must not be empty".to_string()));
    }

    let job_id = new_job_id();
    let language = request.target_language.unwrap_or_else(|| state.default_language.clone());
    let orchestrator = Arc::clone(&state.orchestrator);
    let cancel = CancellationToken::new();
    let goal = request.project_goal;
    let spawned_job_id = job_id.clone();

    tokio::spawn(async move {
        orchestrator.run(&spawned_job_id, &goal, &language, &cancel).await;
    });

    Ok(response::accepted(GenerateResponse { job_id, status: "pending" }))
}

/// A tiny id generator kept local to this handler so the crate doesn't need a `uuid` dependency
/// for a single call site; content-addressed job ids are assigned later by `Job::compute_revision`.
mod uuid_like {
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::time::{SystemTime, UNIX_EPOCH};

    static COUNTER: AtomicU64 = AtomicU64::new(0);

    pub fn new_job_id() -> String {
        let millis = SystemTime::now().duration_since(UNIX_EPOCH).map(|d| d.as_millis()).unwrap_or_default();
        let sequence = COUNTER.fetch_add(1, Ordering::SeqCst);
        format!("job-{millis:x}-{sequence:x}")
    }
}
