//! Standalone HTTP server for the job facade, the counterpart to `rpg-cli`'s subcommands
//! over the same orchestrator.

use rpg_api::{AppState, LogRingBuffer, RingBufferLayer};
use rpg_core::config::PipelineConfig;
use rpg_core::job::{FileJobStore, InProcessJobStore, JobStore};
use rpg_orchestrator::{NoopSink, Orchestrator};
use std::net::SocketAddr;
use std::sync::Arc;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let logs = Arc::new(LogRingBuffer::default());
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .with(RingBufferLayer::new(Arc::clone(&logs)))
        .init();

    let project_root = std::env::current_dir()?;
    let config = PipelineConfig::load(&project_root)?;

    let job_store: Box<dyn JobStore> = if config.storage.backend == "file" {
        Box::new(FileJobStore::new(config.storage.directory.clone())?)
    } else {
        Box::new(InProcessJobStore::new())
    };

    let orchestrator = Arc::new(Orchestrator::new(config, &project_root, job_store, Box::new(NoopSink))?);
    let default_language = std::env::var("RPG_TARGET_LANGUAGE").unwrap_or_else(|_| "python".to_string());
    let state = AppState::new(orchestrator, logs, default_language);

    let port: u16 = std::env::var("PORT").unwrap_or_else(|_| "8080".to_string()).parse()?;
    let host = std::env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
    let addr: SocketAddr = format!("{host}:{port}").parse()?;

    let app = rpg_api::create_router(state);
    tracing::info!(%addr, "starting rpg-api server");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app.into_make_service()).with_graceful_shutdown(shutdown_signal()).await?;
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c().await.expect("failed to install CTRL-C signal handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("received CTRL-C, shutting down"),
        _ = terminate => tracing::info!("received SIGTERM, shutting down"),
    }
}
