// src/main.rs
use std::env;
use std::sync::Arc;
use std::time::Duration;

use dotenvy::dotenv;
use tracing_subscriber::EnvFilter;

use agency_tracker::{backend, database, notify, sweep};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let pool = database::db::connection::get_db_pool().await?;
    database::db::migrate::run_migrations(&pool).await?;

    // tier-update sweep: one pass at startup, then one per interval
    let interval = env::var("SWEEP_INTERVAL_SECS")
        .ok()
        .and_then(|v| v.parse().ok())
        .map(Duration::from_secs)
        .unwrap_or(sweep::DEFAULT_SWEEP_INTERVAL);
    let sweeper = sweep::TierSweeper::new(pool.clone());
    let sweep_task = sweep::spawn(sweeper, interval);

    let port = env::var("PORT")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(3000);
    backend::run_server(pool, Arc::new(notify::LogNotifier), port).await?;

    // the interval timer is cleared on teardown
    sweep_task.abort();
    Ok(())
}
