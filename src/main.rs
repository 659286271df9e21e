//! # PizzaOps Main Entry Point
//!
//! Thin binary over the library: parse the command line, load configuration
//! from layered env files and variables, then hand off to the CLI runner.

use clap::Parser;
use pizzaops::cli::{self, Cli};
use pizzaops::config::ConfigLoader;
use pizzaops::telemetry;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Parse first so --help and --version work without any configuration
    let cli = Cli::parse();

    let config_loader = ConfigLoader::new();
    let config = config_loader.load()?;

    telemetry::init_tracing(&config)?;
    if let Ok(redacted_json) = config.redacted_json() {
        tracing::debug!(profile = %config.profile, config = %redacted_json, "configuration loaded");
    }

    if let Err(error) = cli::run(cli, config).await {
        log::error!("command failed: {error:#}");
        std::process::exit(1);
    }
    Ok(())
}
