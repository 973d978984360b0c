//! HTTP job facade: an `axum` router exposing the orchestrator over the REST surface (§4.11,
//! §6), generalizing the corpus's own orchestrator-over-HTTP shape
//! (`crates/orchestrator/src/api` in the closest reference repo) to this pipeline's three-stage
//! job model.

pub mod error;
pub mod handlers;
pub mod logs;
pub mod response;
pub mod routes;
pub mod state;

pub use error::{ApiError, ApiResult};
pub use logs::{LogRingBuffer, RingBufferLayer};
pub use routes::create_router;
pub use state::AppState;
