//! Backtest statistics.

use serde::{Deserialize, Serialize};
use tradetest_core::types::Trade;

/// Aggregate performance of a finished run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PerformanceMetrics {
    /// Final capital minus initial capital
    pub total_return: f64,
    pub total_return_pct: f64,
    pub num_trades: usize,
    /// Trades with pnl > 0
    pub winning_trades: usize,
    /// Trades with pnl <= 0
    pub losing_trades: usize,
    /// Fraction of winning trades, in [0, 1]
    pub win_rate: f64,
    pub avg_win: f64,
    pub avg_loss: f64,
    /// Largest fall of equity below its running peak (<= 0)
    pub max_drawdown: f64,
    pub max_drawdown_pct: f64,
    pub sharpe_ratio: f64,
    /// Gross profit / gross loss, 0 when nothing was lost
    pub profit_factor: f64,
    pub avg_days_held: f64,
}

impl PerformanceMetrics {
    /// Compute metrics from the trade log and the per-bar equity samples.
    pub fn calculate(
        initial_capital: f64,
        final_capital: f64,
        trades: &[Trade],
        equity: &[f64],
        annualization_factor: f64,
    ) -> Self {
        let total_return = final_capital - initial_capital;
        let total_return_pct = if initial_capital != 0.0 {
            total_return / initial_capital * 100.0
        } else {
            0.0
        };

        let (wins, losses): (Vec<f64>, Vec<f64>) = trades
            .iter()
            .map(|t| t.pnl)
            .partition(|&pnl| pnl > 0.0);

        let num_trades = trades.len();
        let win_rate = if num_trades > 0 {
            wins.len() as f64 / num_trades as f64
        } else {
            0.0
        };

        let gross_profit: f64 = wins.iter().sum();
        let gross_loss: f64 = losses.iter().filter(|&&l| l < 0.0).map(|l| -l).sum();
        let profit_factor = if gross_loss > 0.0 {
            gross_profit / gross_loss
        } else {
            0.0
        };

        let avg_days_held = if num_trades > 0 {
            trades.iter().map(|t| t.days_held as f64).sum::<f64>() / num_trades as f64
        } else {
            0.0
        };

        let (max_drawdown, max_drawdown_pct) = max_drawdown(equity);

        Self {
            total_return,
            total_return_pct,
            num_trades,
            winning_trades: wins.len(),
            losing_trades: losses.len(),
            win_rate,
            avg_win: mean(&wins),
            avg_loss: mean(&losses),
            max_drawdown,
            max_drawdown_pct,
            sharpe_ratio: sharpe_ratio(equity, annualization_factor),
            profit_factor,
            avg_days_held,
        }
    }
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Maximum drawdown as `(absolute, percent)`.
///
/// The absolute figure is the minimum of `equity - running_max`; the percent
/// is taken against the overall peak, and is 0 when that peak is not positive.
pub fn max_drawdown(equity: &[f64]) -> (f64, f64) {
    let mut peak = f64::NEG_INFINITY;
    let mut worst = 0.0_f64;

    for &value in equity {
        peak = peak.max(value);
        worst = worst.min(value - peak);
    }

    let pct = if peak > 0.0 { worst / peak * 100.0 } else { 0.0 };
    (worst, pct)
}

/// Bar-to-bar fractional changes of the equity curve.
///
/// A change from a zero previous value is undefined and skipped.
pub fn percent_returns(equity: &[f64]) -> Vec<f64> {
    equity
        .windows(2)
        .filter(|w| w[0] != 0.0)
        .map(|w| (w[1] - w[0]) / w[0])
        .collect()
}

/// Annualized Sharpe ratio of the equity curve's bar returns, risk-free rate 0.
///
/// Uses the sample standard deviation. Returns 0 with fewer than two returns
/// or when the returns do not vary.
pub fn sharpe_ratio(equity: &[f64], annualization_factor: f64) -> f64 {
    let returns = percent_returns(equity);
    if returns.len() < 2 {
        return 0.0;
    }

    let n = returns.len() as f64;
    let mean = returns.iter().sum::<f64>() / n;
    let variance = returns.iter().map(|r| (r - mean).powi(2)).sum::<f64>() / (n - 1.0);
    let std_dev = variance.sqrt();

    if !(std_dev > 0.0) {
        return 0.0;
    }
    mean / std_dev * annualization_factor.sqrt()
}
