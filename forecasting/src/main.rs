use anyhow::{Context, Result};
use forecasting::evaluation::{evaluate_all, write_metrics};
use log::{info, warn};
use market_data::logger::init_logger;
use market_data::{AppConfig, CompanyRegistry};

fn main() -> Result<()> {
    init_logger();

    let config = AppConfig::from_env().context("failed to load configuration")?;
    let registry = CompanyRegistry::from_config(&config);
    if registry.is_empty() {
        warn!("No companies configured, nothing to evaluate");
    }

    let metrics = evaluate_all(&registry, config.forecast.window_size);
    write_metrics(&config.paths.metrics_file, &metrics)?;

    info!(
        "Metrics for {} of {} companies written to {}",
        metrics.len(),
        registry.len(),
        config.paths.metrics_file.display()
    );
    Ok(())
}
