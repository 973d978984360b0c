//! `GET /api/zerorepo/jobs/{id}` and `GET /api/zerorepo/jobs?limit&skip`.

use crate::error::{ApiError, ApiResult};
use crate::response;
use crate::state::AppState;
use axum::extract::{Path, Query, State};
use axum::response::IntoResponse;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct ListJobsQuery {
    #[serde(default = "default_limit")]
    pub limit: usize,
    #[serde(default)]
    pub skip: usize,
}

fn default_limit() -> usize {
    20
}

pub async fn get_job(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<impl IntoResponse> {
    let job = state
        .orchestrator
        .job_store()
        .find_one(&id)
        .ok_or_else(|| ApiError::NotFound(format!("job '{id}' not found")))?;
    Ok(response::ok(job))
}

pub async fn list_jobs(State(state): State<AppState>, Query(query): Query<ListJobsQuery>) -> impl IntoResponse {
    let jobs = state.orchestrator.job_store().find_sorted(query.limit, query.skip);
    response::ok(jobs)
}
