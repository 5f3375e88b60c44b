pub mod api;
pub mod config;
pub mod pipeline;

use std::net::SocketAddr;
use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use crate::api::{start_server, ApiContext, ServerError};
use crate::config::{ConfigError, ServiceConfig};
use crate::pipeline::processor::{build_processor, ProcessingError};

/// Errors that stop the service before or while serving.
#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Pipeline setup failed: {0}")]
    Pipeline(#[from] ProcessingError),

    #[error(transparent)]
    Server(#[from] ServerError),

    #[error("Failed to listen for shutdown signal: {0}")]
    Signal(std::io::Error),

    #[error("Startup task failed: {0}")]
    Task(String),
}

/// Initialize tracing, load configuration from the environment, wire the
/// pipeline and serve until Ctrl-C.
pub async fn run() -> Result<(), StartupError> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config::default_log_filter())),
        )
        .init();

    tracing::info!("{} starting v{}", config::APP_NAME, config::APP_VERSION);

    let config = ServiceConfig::from_env()?;

    // Blocking HTTP clients are built off the async runtime.
    let processor_config = config.clone();
    let processor = tokio::task::spawn_blocking(move || build_processor(&processor_config))
        .await
        .map_err(|e| StartupError::Task(e.to_string()))??;

    let ctx = ApiContext::new(Arc::new(processor), &config);
    let addr = SocketAddr::new(config.bind_addr, config.port);
    let mut server = start_server(ctx, addr).await?;
    tracing::info!(addr = %server.addr, "Listening");

    tokio::signal::ctrl_c().await.map_err(StartupError::Signal)?;
    server.shutdown();
    server.stopped().await;

    Ok(())
}
