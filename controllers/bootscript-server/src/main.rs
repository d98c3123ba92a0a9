//! Boot Script Server
//!
//! Serves iPXE boot scripts to booting nodes.
//!
//! Nodes and `BootConfiguration` resources are read from Kubernetes. When a
//! node is unknown there, an optional node provider (hardware state manager or
//! a local YAML inventory) is consulted, kept fresh by a background sync.

mod api;
mod config;
mod error;

use std::sync::Arc;

use boot_client::KubeResourceClient;
use bootscript::BootScriptController;
use kube::Client;
use tokio::sync::watch;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::config::ServerConfig;
use crate::error::ServerError;

#[tokio::main]
async fn main() -> Result<(), ServerError> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    info!("Starting Boot Script Server");

    if rustls::crypto::ring::default_provider().install_default().is_err() {
        warn!("TLS crypto provider already installed");
    }

    let config = ServerConfig::from_env()?;
    config.log();

    let kube_client = Client::try_default().await?;
    let namespace = config
        .namespace
        .clone()
        .unwrap_or_else(|| kube_client.default_namespace().to_string());
    let resource_client = Arc::new(KubeResourceClient::new(kube_client, &namespace));

    let provider_config = config.load_provider_config().await?;
    let controller = Arc::new(
        BootScriptController::from_provider_config(resource_client, config.settings.clone(), &provider_config).await?,
    );
    info!("Node provider: {}", controller.provider_type());

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let sync_worker = controller.start_background_sync(shutdown_rx);

    let listener = tokio::net::TcpListener::bind(config.listen_addr).await?;
    info!("Listening on {}", config.listen_addr);

    axum::serve(listener, api::router(Arc::clone(&controller)))
        .with_graceful_shutdown(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!("Failed to listen for shutdown signal: {}", e);
            }
            info!("Shutdown signal received");
        })
        .await?;

    let _ = shutdown_tx.send(true);
    if let Some(worker) = sync_worker {
        if let Err(e) = worker.await {
            warn!("Sync worker ended abnormally: {}", e);
        }
    }

    info!("Boot Script Server stopped");
    Ok(())
}
