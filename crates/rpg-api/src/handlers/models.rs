//! `GET /api/models` — lists the configured LLM provider and model.

use crate::state::AppState;
use axum::extract::State;
use axum::response::IntoResponse;
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct ModelsResponse {
    pub provider: String,
    pub model: String,
}

pub async fn models(State(state): State<AppState>) -> impl IntoResponse {
    let response = ModelsResponse {
        provider: state.orchestrator.provider_name().to_string(),
        model: state.orchestrator.model_name().to_string(),
    };
    (axum::http::StatusCode::OK, axum::Json(response))
}
