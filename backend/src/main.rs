//! # Backend Service
//!
//! Entry point: loads configuration, opens the store, wires the market
//! aggregation state, and runs the background loops until shutdown.

use lib_core::config::{core_config, init_config};
use lib_core::model::store::{create_pool, init_schema};
use lib_market::MarketState;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    init_config().map_err(|err| anyhow::anyhow!(err))?;
    let config = core_config();

    let pool = create_pool(&config.database_url).await?;
    init_schema(&pool).await?;
    info!("durable store ready at {}", config.database_url);

    let state = MarketState::new(config, pool)?;
    state.startup().await?;

    let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);
    let handles = state.spawn_background(shutdown_rx);

    tokio::signal::ctrl_c().await?;
    info!("shutdown signal received");

    // stop the loops, then flush the counters once
    let _ = shutdown_tx.send(true);
    for handle in handles {
        let _ = handle.await;
    }
    state.shutdown_flush().await;

    info!("backend stopped");
    Ok(())
}
