//! Strategy backtester CLI application.

mod cli;

use anyhow::{Context, Result};
use clap::Parser;
use cli::{Cli, Commands};
use tradetest_config::load_config;
use tradetest_monitor::setup_logging;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = load_config(cli.config.as_deref()).context("Failed to load configuration")?;

    // Setup logging
    let log_level = cli
        .log_level
        .map(|level| level.as_str().to_string())
        .unwrap_or_else(|| config.logging.level.clone());
    let json = cli.json_logs || config.logging.is_json();
    let log_file = config.logging.file.as_deref().map(std::path::Path::new);
    let _guard = setup_logging(&log_level, json, log_file).context("Failed to set up logging")?;

    // Execute command
    match cli.command {
        Commands::Backtest(args) => cli::commands::backtest::run(args, &config).await,
        Commands::Batch(args) => cli::commands::batch::run(args, &config).await,
        Commands::Strategies => cli::commands::strategies::run().await,
        Commands::ValidateConfig => cli::commands::validate::run(&config, cli.config.as_deref()).await,
    }
}
