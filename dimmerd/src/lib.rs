pub mod config;
pub mod telemetry;
pub mod wiring;

use anyhow::Context;
use tracing::info;

use crate::{config::Config, telemetry::init_tracing, wiring::start};

pub async fn run(cfg: Config) -> anyhow::Result<()> {
    init_tracing(&cfg)?;
    let running = start(&cfg).await?;
    info!(bus = %cfg.bus, simulate = cfg.simulate, "dimmerd running");

    tokio::signal::ctrl_c().await.context("wait for shutdown signal")?;
    info!("shutting down");
    running.shutdown();
    Ok(())
}
