mod engine;
mod misc;
mod server;

use crate::server::{AppState, Server};
use anyhow::{Context, Result};
use log::info;
use market_data::AppConfig;
use market_data::logger::init_logger;

#[tokio::main]
async fn main() -> Result<()> {
    init_logger();

    let config = AppConfig::from_env().context("failed to load configuration")?;
    info!(
        "Serving forecasts for {} companies (window {}, max horizon {})",
        config.companies.len(),
        config.forecast.window_size,
        config.forecast.max_horizon
    );

    let state = AppState::from_config(&config).context("failed to load risk tables")?;
    let server = Server::init(state);
    server.run(&config.server.host, config.server.port).await?;

    info!("Server has been shut down gracefully");
    Ok(())
}
