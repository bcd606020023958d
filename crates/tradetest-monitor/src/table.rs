//! Console summary table for batch runs.

use serde::Serialize;
use tradetest_backtest::BatchOutcome;

/// One line of the batch summary, also written out as JSON.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SummaryRow {
    pub strategy: String,
    pub symbol: String,
    pub return_pct: f64,
    pub sharpe_ratio: f64,
    pub num_trades: usize,
    pub win_rate: f64,
    pub max_drawdown_pct: f64,
}

impl SummaryRow {
    /// Row for a successful outcome, `None` for a failed one.
    pub fn from_outcome(outcome: &BatchOutcome) -> Option<Self> {
        let result = outcome.result.as_ref().ok()?;
        let m = &result.metrics;
        Some(Self {
            strategy: result.strategy_name.clone(),
            symbol: outcome.symbol.clone(),
            return_pct: m.total_return_pct,
            sharpe_ratio: m.sharpe_ratio,
            num_trades: m.num_trades,
            win_rate: m.win_rate,
            max_drawdown_pct: m.max_drawdown_pct,
        })
    }
}

/// Render batch outcomes as a fixed-width table. Failed runs are listed
/// after the table with their error.
pub fn batch_table(outcomes: &[BatchOutcome]) -> String {
    let rows: Vec<SummaryRow> = outcomes.iter().filter_map(SummaryRow::from_outcome).collect();

    let name_width = rows
        .iter()
        .map(|r| r.strategy.len())
        .chain(std::iter::once("Strategy".len()))
        .max()
        .unwrap_or_default();

    let mut s = String::new();
    let header = format!(
        "{:<nw$}  {:<8}  {:>10}  {:>8}  {:>7}  {:>9}  {:>10}\n",
        "Strategy",
        "Symbol",
        "Return %",
        "Sharpe",
        "Trades",
        "Win Rate",
        "Max DD %",
        nw = name_width
    );
    s.push_str(&header);
    s.push_str(&"─".repeat(header.trim_end().chars().count()));
    s.push('\n');

    for r in &rows {
        s.push_str(&format!(
            "{:<nw$}  {:<8}  {:>9.2}%  {:>8.2}  {:>7}  {:>8.1}%  {:>9.2}%\n",
            r.strategy,
            r.symbol,
            r.return_pct,
            r.sharpe_ratio,
            r.num_trades,
            r.win_rate * 100.0,
            r.max_drawdown_pct,
            nw = name_width
        ));
    }

    let failures: Vec<&BatchOutcome> = outcomes.iter().filter(|o| !o.is_ok()).collect();
    if !failures.is_empty() {
        s.push_str("\nFailed:\n");
        for o in failures {
            if let Err(e) = &o.result {
                s.push_str(&format!("  {} / {}: {}\n", o.strategy_id, o.symbol, e));
            }
        }
    }

    s
}
