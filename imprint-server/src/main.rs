//! Imprint Server - REST API for content fingerprinting and invisible watermarks
//!
//! Configuration comes from the environment (see [`Config::from_env`]).

use std::net::SocketAddr;
use std::process::ExitCode;

use imprint_server::{create_router_with_config, AppState, Config, RegistryBackend};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("imprint_server=info,imprint_core=info,tower_http=info")),
        )
        .init();

    let config = Config::from_env();

    match &config.registry {
        RegistryBackend::Memory => tracing::warn!("Registry: in-memory, entries are lost on restart"),
        RegistryBackend::File(path) => tracing::info!(path = %path.display(), "Registry: file"),
        RegistryBackend::Http { url, timeout, .. } => {
            tracing::info!(%url, timeout_secs = timeout.as_secs(), "Registry: HTTP")
        }
    }
    if config.admin_token.is_none() {
        tracing::warn!("ADMIN_TOKEN not set; admin routes are unauthenticated");
    }

    let state = match AppState::from_config(&config) {
        Ok(state) => state,
        Err(e) => {
            tracing::error!(error = %e, "Failed to initialise registry");
            return ExitCode::FAILURE;
        }
    };

    let app = create_router_with_config(state, &config);
    let addr = config.socket_addr();

    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!(%addr, error = %e, "Failed to bind");
            return ExitCode::FAILURE;
        }
    };

    tracing::info!(
        %addr,
        threshold = config.similarity_threshold,
        "Imprint server listening (Swagger UI at /docs)"
    );

    let served = axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await;

    if let Err(e) = served {
        tracing::error!(error = %e, "Server error");
        return ExitCode::FAILURE;
    }

    tracing::info!("Shut down cleanly");
    ExitCode::SUCCESS
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
