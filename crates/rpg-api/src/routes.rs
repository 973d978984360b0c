//! Route table for the HTTP job facade (§4.11, §6).

use crate::handlers;
use crate::state::AppState;
use axum::Router;
use axum::routing::{get, post};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Build the complete API router over `state`.
#[must_use]
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/api/zerorepo/generate", post(handlers::generate))
        .route("/api/zerorepo/plan", post(handlers::plan))
        .route("/api/zerorepo/jobs/:id", get(handlers::get_job))
        .route("/api/zerorepo/jobs", get(handlers::list_jobs))
        .route("/api/health", get(handlers::health))
        .route("/api/models", get(handlers::models))
        .route("/api/logs", get(handlers::logs))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logs::LogRingBuffer;
    use rpg_core::config::PipelineConfig;
    use rpg_core::job::InProcessJobStore;
    use rpg_orchestrator::{NoopSink, Orchestrator};
    use std::sync::Arc;

    fn test_state() -> AppState {
        let mut config = PipelineConfig::default();
        config.llm.provider = "deterministic".to_string();
        config.embedding.provider = "deterministic".to_string();
        config.sandbox.prefer_docker = false;
        let tmp = tempfile::tempdir().unwrap();
        let orchestrator = Orchestrator::new(config, tmp.path(), Box::new(InProcessJobStore::new()), Box::new(NoopSink)).unwrap();
        AppState::new(Arc::new(orchestrator), Arc::new(LogRingBuffer::new(10)), "python")
    }

    #[test]
    fn router_builds_without_panicking() {
        let _router = create_router(test_state());
    }
}
