//! devicehub server
//!
//! - Device registry: configure, look up by id or OEM, update status
//! - Metric ingestion and trailing-window performance summaries
//! - Config from `devicehub.yaml` (or `DEVICEHUB_CONFIG`)
//! - Graceful shutdown on Ctrl+C / SIGTERM

use tracing_subscriber::{fmt, EnvFilter};

use devicehub_core::error::{DeviceHubError, Result};
use devicehub_server::{app_state::AppState, config, router};

const DEFAULT_CONFIG_PATH: &str = "devicehub.yaml";

#[tokio::main]
async fn main() {
    fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    if let Err(e) = run().await {
        tracing::error!(error = %e, "devicehub-server failed");
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let path = std::env::var("DEVICEHUB_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
    let cfg = config::load_from_file(&path)?;
    let listen = cfg.server.listen_addr()?;

    let state = AppState::from_config(&cfg).await?;
    let app = router::build_router(state.clone());

    tracing::info!(%listen, backend = ?cfg.storage.backend, "devicehub-server starting");
    let listener = tokio::net::TcpListener::bind(listen)
        .await
        .map_err(|e| DeviceHubError::Internal(format!("bind {listen} failed: {e}")))?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(state))
        .await
        .map_err(|e| DeviceHubError::Internal(format!("server failed: {e}")))
}

async fn shutdown_signal(state: AppState) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    state.metrics().set_draining();
    tracing::info!("signal received, starting graceful shutdown");
}
