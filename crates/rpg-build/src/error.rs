//! Error types for the Proposal and Implementation controllers.

#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error("embedding store error: {0}")]
    Embedding(#[from] anyhow::Error),
    #[error("llm gateway error: {0}")]
    Gateway(#[from] rpg_llm::GatewayError),
    #[error("graph error: {0}")]
    Graph(#[from] rpg_core::error::GraphError),
}
