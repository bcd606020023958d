//! Backtest command implementation.

use anyhow::{Context, Result};
use std::path::Path;
use tradetest_backtest::BacktestEngine;
use tradetest_config::AppConfig;
use tradetest_strategies::StrategyRegistry;
use tracing::info;

use super::{engine_config, DataContext};
use crate::cli::{BacktestArgs, OutputFormat};

pub async fn run(args: BacktestArgs, config: &AppConfig) -> Result<()> {
    info!(strategy = %args.strategy, symbol = %args.symbol, "Starting backtest");

    // Create strategy
    let registry = StrategyRegistry::new();
    let mut strategy = match &args.strategy_config {
        Some(raw) => registry.create(&args.strategy, parse_strategy_config(raw)?),
        None => registry.create_default(&args.strategy),
    }
    .context("Failed to create strategy")?;

    // Load data
    let mut data = DataContext::new(&args.data, config)?;
    let series = data.load(&args.symbol).await?;

    // Run backtest
    let engine = BacktestEngine::new(engine_config(&args.data, config));
    let result = engine.run(strategy.as_mut(), &series)?;

    // Output results
    match args.output {
        OutputFormat::Json => println!("{}", result.to_json()?),
        OutputFormat::Text => println!("{}", result.summary()),
    }

    // Save if requested
    if let Some(save_path) = &args.save {
        std::fs::write(save_path, result.to_json()?)
            .with_context(|| format!("Failed to write {}", save_path.display()))?;
        info!(path = %save_path.display(), "Results saved");
    }

    if let Some(csv_path) = &args.equity_csv {
        std::fs::write(csv_path, result.equity_to_csv())
            .with_context(|| format!("Failed to write {}", csv_path.display()))?;
        info!(path = %csv_path.display(), "Equity curve saved");
    }

    Ok(())
}

/// Inline JSON, or the contents of a JSON file.
fn parse_strategy_config(raw: &str) -> Result<serde_json::Value> {
    let path = Path::new(raw);
    let text = if path.is_file() {
        std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?
    } else {
        raw.to_string()
    };
    serde_json::from_str(&text).context("Strategy configuration is not valid JSON")
}
