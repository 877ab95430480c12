use anyhow::Result;
use std::net::SocketAddr;
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use pension_agent_server::config::Settings;
use pension_agent_server::{build_router, AppState};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,pension_agent_server=debug")),
        )
        .with_target(true)
        .with_thread_ids(true)
        .json()
        .init();

    info!("🚀 Starting pension agent server...");

    // Load configuration
    let settings = Settings::load()?;
    info!("✅ Configuration loaded");

    let addr = SocketAddr::from((
        settings.server.host.parse::<std::net::IpAddr>()?,
        settings.server.port,
    ));
    let cleanup_interval = Duration::from_secs(settings.memory.cleanup_interval_seconds.max(1));

    let state = AppState::from_settings(settings)?;

    match state.memory.probe().await {
        Ok(backend) => info!("✅ Session memory backend: {}", backend),
        Err(e) => warn!("Session memory probe failed: {}", e),
    }

    // Expire idle sessions of the local fallback store
    let local_store = state.memory.local_store().clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(cleanup_interval);
        loop {
            interval.tick().await;
            local_store.cleanup_expired();
        }
    });

    let app = build_router(state);

    info!("🎯 Server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
