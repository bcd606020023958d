//! Backtesting engine.
//!
//! Simulates one leveraged long/short position at a time over a bar series,
//! driving a [`Strategy`](tradetest_core::traits::Strategy) bar by bar, and
//! reports performance metrics, the trade log and the equity curve.

mod batch;
mod engine;
mod report;
mod statistics;

pub use batch::{run_batch, BatchJob, BatchOutcome};
pub use engine::{BacktestEngine, EngineConfig};
pub use report::{BacktestResult, EquityPoint};
pub use statistics::{max_drawdown, percent_returns, sharpe_ratio, PerformanceMetrics};
