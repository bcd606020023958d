//! Parallel batch runs over independent (strategy, series) jobs.

use rayon::prelude::*;
use tracing::warn;
use tradetest_core::error::StrategyError;
use tradetest_core::traits::Strategy;
use tradetest_core::types::BarSeries;

use crate::engine::BacktestEngine;
use crate::report::BacktestResult;

/// One backtest to run: a strategy identifier and the series to run it on.
#[derive(Debug, Clone)]
pub struct BatchJob {
    pub strategy_id: String,
    pub series: BarSeries,
}

impl BatchJob {
    pub fn new(strategy_id: impl Into<String>, series: BarSeries) -> Self {
        Self {
            strategy_id: strategy_id.into(),
            series,
        }
    }
}

/// Outcome of one batch job.
#[derive(Debug, Clone)]
pub struct BatchOutcome {
    pub strategy_id: String,
    pub symbol: String,
    /// The result, or the error message if the run failed
    pub result: Result<BacktestResult, String>,
}

impl BatchOutcome {
    pub fn is_ok(&self) -> bool {
        self.result.is_ok()
    }
}

/// Run every job in parallel.
///
/// `factory` builds a fresh strategy for each job, so no strategy state is
/// shared between runs. Outcomes are returned in job order; a failing job
/// does not affect the others.
pub fn run_batch<F>(engine: &BacktestEngine, jobs: &[BatchJob], factory: F) -> Vec<BatchOutcome>
where
    F: Fn(&str) -> Result<Box<dyn Strategy>, StrategyError> + Sync,
{
    jobs.par_iter()
        .map(|job| {
            let result = factory(&job.strategy_id)
                .map_err(|e| e.to_string())
                .and_then(|mut strategy| {
                    engine
                        .run(strategy.as_mut(), &job.series)
                        .map_err(|e| e.to_string())
                });

            if let Err(e) = &result {
                warn!(
                    strategy = %job.strategy_id,
                    symbol = %job.series.symbol,
                    error = %e,
                    "Batch job failed"
                );
            }

            BatchOutcome {
                strategy_id: job.strategy_id.clone(),
                symbol: job.series.symbol.clone(),
                result,
            }
        })
        .collect()
}
