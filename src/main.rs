//! WorldLock Kernel host
//!
//! Runs a world coordinator on the tokio runtime:
//! - Drives the coordinator tick from a periodic worker
//! - Logs coordinator statistics as JSON
//! - Releases every lock on Ctrl+C

use std::sync::Arc;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use worldlock_kernel::infrastructure::config::AppConfig;
use worldlock_kernel::infrastructure::state::AppState;
use worldlock_kernel::infrastructure::tick_worker::{stats_worker, tick_worker};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "worldlock_kernel=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting WorldLock Kernel");

    // Load configuration
    let config = AppConfig::from_env()?;
    tracing::info!("Configuration loaded");
    tracing::info!("  Tick interval: {} ms", config.tick_interval_ms);
    tracing::info!("  Stats interval: {} s", config.stats_interval_secs);
    tracing::info!("  Settings: {}", serde_json::to_string(&config.settings)?);

    let state = Arc::new(AppState::new(config));
    tracing::info!("World coordinator ready");

    let tick_task = {
        let coordinator = state.coordinator.clone();
        let interval = state.config.tick_interval();
        tokio::spawn(async move {
            tick_worker(coordinator, interval).await;
        })
    };

    let stats_task = {
        let coordinator = state.coordinator.clone();
        let interval = state.config.stats_interval();
        tokio::spawn(async move {
            stats_worker(coordinator, interval).await;
        })
    };

    tracing::info!("Background workers started");

    tokio::signal::ctrl_c().await?;
    tracing::info!("Shutdown signal received, stopping workers...");
    tick_task.abort();
    stats_task.abort();

    state.shutdown().await;
    tracing::info!("{}", state.coordinator.lock().await.status_report());
    tracing::info!("Workers stopped");

    Ok(())
}
