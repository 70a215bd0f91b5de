//! Provisioning service binary.
//!
//! Serves the webhook and resources API and drains background runs on
//! shutdown.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::net::TcpListener;
use tokio::signal;
use tracing::{error, info, warn};

use provisioner::config::Config;
use provisioner::logging::init_tracing;
use provisioner::providers::azure::AzureResourceManager;
use provisioner::providers::github::GitHubRepositories;
use provisioner::providers::memory::InMemoryTrackingList;
use provisioner::providers::sharepoint::SharePointList;
use provisioner::server::{build_router, AppState};
use provisioner::TrackingList;

#[derive(Parser)]
#[command(name = "provisioner")]
#[command(about = "Provision Azure resource groups and GitHub repositories from tracked requests")]
#[command(version)]
struct Cli {
    /// Environment file loaded before reading configuration.
    #[arg(long, default_value = ".env")]
    env_file: PathBuf,

    /// HTTP port (overrides `API_PORT`).
    #[arg(long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = Config::from_env_file(&cli.env_file).context("Failed to load configuration")?;
    if let Some(port) = cli.port {
        config.port = port;
    }

    init_tracing(&config.logging).context("Failed to initialize tracing")?;
    info!(version = %config.app_version, "Starting provisioning service...");

    let cloud = AzureResourceManager::new(&config.azure).context("Failed to create Azure client")?;
    let repositories =
        GitHubRepositories::new(&config.github).context("Failed to create GitHub client")?;

    let tracking: Arc<dyn TrackingList> = match &config.sharepoint {
        Some(sharepoint) => {
            let list =
                SharePointList::new(sharepoint).context("Failed to create SharePoint client")?;
            info!(
                site = %sharepoint.site_url,
                list = %sharepoint.list_name,
                "Using SharePoint tracking list"
            );
            Arc::new(list)
        }
        None => {
            warn!("SHAREPOINT_SITE_URL not set - using in-memory tracking list");
            Arc::new(InMemoryTrackingList::new())
        }
    };

    let addr = format!("{}:{}", config.host, config.port);
    let state = AppState::new(config, Arc::new(cloud), Arc::new(repositories), tracking);
    let dispatcher = state.dispatcher.clone();
    let app = build_router(state);

    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {addr}"))?;
    info!(addr = %addr, "Provisioning service listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    dispatcher.shutdown().await;
    info!("Provisioning service stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            info!("Received Ctrl+C, shutting down gracefully");
        },
        () = terminate => {
            info!("Received SIGTERM, shutting down gracefully");
        },
    }
}
