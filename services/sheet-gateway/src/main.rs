use anyhow::{Context, Result};
use axum::serve;
use bomsheet_gateway::{create_app, AppState};
use bomsheet_utils::{init_logging, AppConfig};
use tokio::net::TcpListener;
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    let config = AppConfig::load().unwrap_or_else(|err| {
        eprintln!("Failed to load configuration ({}), using defaults", err);
        AppConfig::default()
    });

    init_logging(&config.logging)?;
    info!("Starting Bomsheet gateway");

    let addr = config.bind_address();
    let state = AppState::initialize(config)
        .await
        .context("Failed to initialize sheet storage")?;
    let app = create_app(state);

    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!("Gateway listening on {}", addr);

    serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
