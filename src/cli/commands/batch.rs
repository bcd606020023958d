//! Batch command implementation.

use anyhow::{Context, Result};
use chrono::Utc;
use tradetest_backtest::{run_batch, BacktestEngine, BatchJob, BatchOutcome};
use tradetest_config::AppConfig;
use tradetest_monitor::{batch_table, SummaryRow};
use tradetest_strategies::StrategyRegistry;
use tracing::{info, warn};

use super::{engine_config, DataContext};
use crate::cli::BatchArgs;

pub async fn run(args: BatchArgs, config: &AppConfig) -> Result<()> {
    let registry = StrategyRegistry::new();
    let strategies: Vec<String> = if args.strategies.is_empty() {
        registry.names().into_iter().map(String::from).collect()
    } else {
        args.strategies.clone()
    };
    for id in &strategies {
        if !registry.exists(id) {
            anyhow::bail!("Unknown strategy '{id}'. Run `tradetest strategies` for the list.");
        }
    }

    println!("Strategies: {}", strategies.join(", "));
    println!("Symbols:    {}", args.symbols.join(", "));
    println!("Period:     {} to {}", args.data.start, args.data.end);
    println!();

    // Load each symbol once; a symbol that fails to load fails its jobs only
    let mut data = DataContext::new(&args.data, config)?;
    let mut jobs = Vec::new();
    let mut load_failures = Vec::new();
    for symbol in &args.symbols {
        match data.load(symbol).await {
            Ok(series) => {
                jobs.extend(strategies.iter().map(|id| BatchJob::new(id, series.clone())));
            }
            Err(e) => {
                warn!(symbol = %symbol, error = %e, "Skipping symbol");
                load_failures.extend(strategies.iter().map(|id| BatchOutcome {
                    strategy_id: id.clone(),
                    symbol: symbol.clone(),
                    result: Err(format!("{e:#}")),
                }));
            }
        }
    }

    info!(jobs = jobs.len(), "Running batch");
    let engine = BacktestEngine::new(engine_config(&args.data, config));
    let mut outcomes = tokio::task::spawn_blocking(move || {
        let registry = StrategyRegistry::new();
        run_batch(&engine, &jobs, |id| registry.create_default(id))
    })
    .await
    .context("Batch worker panicked")?;
    outcomes.extend(load_failures);

    // Save individual results
    std::fs::create_dir_all(&args.output_dir)
        .with_context(|| format!("Failed to create {}", args.output_dir.display()))?;
    for outcome in &outcomes {
        if let Ok(result) = &outcome.result {
            let path = args
                .output_dir
                .join(format!("{}_{}.json", outcome.strategy_id, outcome.symbol));
            std::fs::write(&path, result.to_json()?)
                .with_context(|| format!("Failed to write {}", path.display()))?;
        }
    }

    println!("{}", batch_table(&outcomes));

    let rows: Vec<SummaryRow> = outcomes.iter().filter_map(SummaryRow::from_outcome).collect();
    if !rows.is_empty() {
        let summary_path = args.output_dir.join(format!(
            "summary_{}.json",
            Utc::now().format("%Y%m%d_%H%M%S")
        ));
        std::fs::write(&summary_path, serde_json::to_string_pretty(&rows)?)
            .with_context(|| format!("Failed to write {}", summary_path.display()))?;
        println!("Summary saved to {}", summary_path.display());
    }

    Ok(())
}
