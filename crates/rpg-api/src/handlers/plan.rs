//! `POST /api/zerorepo/plan` — runs only the Proposal stage synchronously and returns its
//! result without creating a job.

use crate::error::ApiResult;
use crate::response;
use crate::state::AppState;
use axum::extract::State;
use axum::response::IntoResponse;
use rpg_core::graph::RepoGraph;
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
pub struct PlanRequest {
    pub project_goal: String,
}

#[derive(Debug, Serialize)]
pub struct PlanResponse {
    pub capability_graph: RepoGraph,
    pub feature_paths: Vec<String>,
    pub metrics: PlanMetrics,
}

#[derive(Debug, Serialize)]
pub struct PlanMetrics {
    pub node_count: usize,
    pub edge_count: usize,
}

pub async fn plan(State(state): State<AppState>, axum::Json(request): axum::Json<PlanRequest>) -> ApiResult<impl IntoResponse> {
    if request.project_goal.trim().is_empty() {
        return Err(crate::error::ApiError::BadRequest("project_goal must not be empty".to_string()));
    }

    let graph = state.orchestrator.plan(&request.project_goal).await;
    let feature_paths: Vec<String> = graph
        .nodes
        .values()
        .filter_map(|node| node.meta.feature_path.clone())
        .collect();
    let metrics = PlanMetrics { node_count: graph.nodes.len(), edge_count: graph.edges.len() };

    Ok(response::ok(PlanResponse { capability_graph: graph, feature_paths, metrics }))
}
