//! Shared application state handed to every handler via axum's `State` extractor.

use crate::logs::LogRingBuffer;
use rpg_orchestrator::Orchestrator;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<Orchestrator>,
    pub logs: Arc<LogRingBuffer>,
    pub default_language: String,
}

impl AppState {
    #[must_use]
    pub fn new(orchestrator: Arc<Orchestrator>, logs: Arc<LogRingBuffer>, default_language: impl Into<String>) -> Self {
        Self { orchestrator, logs, default_language: default_language.into() }
    }
}
