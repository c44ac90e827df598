use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use thiserror::Error;
use tokio::net::TcpListener;
use tracing::{info, warn};

use crate::config::{AppConfig, ConfigError};
use crate::data::Dataset;

pub mod api;
pub mod routes;
pub mod static_files;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("server I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Serve the explorer until interrupted. Requests are handled on a single
/// thread; the dataset is shared read-only.
pub fn run_server(config: &AppConfig, dataset: Arc<Dataset>) -> Result<(), ServerError> {
    let addr = config.bind_addr()?;
    let app = routes::build_router(dataset, config);
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    runtime.block_on(serve(addr, app))?;
    Ok(())
}

pub async fn serve(addr: SocketAddr, app: Router) -> std::io::Result<()> {
    let listener = TcpListener::bind(addr).await?;
    info!("covid-explorer listening on http://{}", listener.local_addr()?);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!(error = %err, "failed to install Ctrl-C handler");
        std::future::pending::<()>().await;
    }
    info!("shutdown requested");
}
