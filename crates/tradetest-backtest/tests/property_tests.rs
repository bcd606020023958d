//! Property-based tests for the engine and the metrics.

use proptest::prelude::*;
use tradetest_backtest::{max_drawdown, BacktestEngine, BacktestResult, EngineConfig};
use tradetest_core::error::StrategyError;
use tradetest_core::traits::{ExitContext, Strategy as TradingStrategy};
use tradetest_core::types::{Bar, BarSeries, SeriesWindow, Signal, Timeframe};
use tradetest_strategies::StrategyRegistry;

fn series_from(closes: &[f64]) -> BarSeries {
    let bars = closes
        .iter()
        .enumerate()
        .map(|(i, &c)| Bar::new(i as i64 * 86_400_000, c, c * 1.01, c * 0.99, c, 50_000.0))
        .collect();
    BarSeries::from_bars("PROP", Timeframe::Daily, bars)
}

fn walk(steps: Vec<f64>) -> Vec<f64> {
    let mut price = 100.0;
    steps
        .into_iter()
        .map(|step| {
            price *= 1.0 + step;
            price
        })
        .collect()
}

/// Random walk of positive prices.
fn price_path() -> impl Strategy<Value = Vec<f64>> {
    prop::collection::vec(-0.04f64..0.04, 30..260).prop_map(walk)
}

/// Trades on a fixed script of signals and exit bars.
#[derive(Debug, Clone)]
struct Script {
    closes: Vec<f64>,
    signals: Vec<i8>,
    exits: Vec<bool>,
    size: u64,
    leverage: f64,
}

impl TradingStrategy for Script {
    fn name(&self) -> &str {
        "Script"
    }

    fn calculate_indicators(&self, series: BarSeries) -> Result<BarSeries, StrategyError> {
        Ok(series)
    }

    fn generate_signals(&self, mut series: BarSeries) -> Result<BarSeries, StrategyError> {
        series.set_signals(self.signals.iter().map(|&s| Signal::from_i8(s)).collect())?;
        Ok(series)
    }

    fn get_leverage(&self, _window: &SeriesWindow<'_>) -> Result<f64, StrategyError> {
        Ok(self.leverage)
    }

    fn calculate_position_size(
        &self,
        _symbol: &str,
        _price: f64,
        _portfolio_value: f64,
        _window: &SeriesWindow<'_>,
    ) -> Result<u64, StrategyError> {
        Ok(self.size)
    }

    fn check_exit_conditions(
        &mut self,
        _ctx: &ExitContext<'_>,
        window: &SeriesWindow<'_>,
    ) -> Result<bool, StrategyError> {
        Ok(self.exits[window.len() - 1])
    }
}

/// Price path with signals and exit flags of the same length.
fn script() -> impl Strategy<Value = Script> {
    (30usize..200)
        .prop_flat_map(|len| {
            (
                prop::collection::vec(-0.04f64..0.04, len).prop_map(walk),
                prop::collection::vec(-1i8..=1, len),
                prop::collection::vec(any::<bool>(), len),
                1u64..20,
                1.0f64..10.0,
            )
        })
        .prop_map(|(closes, signals, exits, size, leverage)| Script {
            closes,
            signals,
            exits,
            size,
            leverage,
        })
}

fn run_script(script: &Script) -> BacktestResult {
    let mut strategy = script.clone();
    BacktestEngine::default()
        .run(&mut strategy, &series_from(&script.closes))
        .unwrap()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn drawdown_is_never_positive(equity in prop::collection::vec(1.0f64..1e6, 0..200)) {
        let (abs, pct) = max_drawdown(&equity);
        prop_assert!(abs <= 0.0);
        prop_assert!(pct <= 0.0 && pct > -100.0);
    }

    #[test]
    fn scripted_trades_keep_metrics_in_range(script in script()) {
        let result = run_script(&script);
        let m = &result.metrics;

        prop_assert_eq!(result.equity_curve.len(), script.closes.len());
        prop_assert_eq!(m.num_trades, result.trades.len());
        if script.signals.iter().any(|&s| s != 0) {
            prop_assert!(!result.trades.is_empty());
        }
        prop_assert!((0.0..=1.0).contains(&m.win_rate));
        prop_assert_eq!(m.winning_trades + m.losing_trades, m.num_trades);
        prop_assert!(m.max_drawdown <= 0.0);
        prop_assert!(result.trades.iter().all(|t| t.leverage == script.leverage));
    }

    #[test]
    fn cash_is_pnl_less_entry_commissions(script in script()) {
        let result = run_script(&script);
        let commission = EngineConfig::default().commission;

        let pnl: f64 = result.trades.iter().map(|t| t.pnl).sum();
        let entry_commissions: f64 = result
            .trades
            .iter()
            .map(|t| t.size as f64 * t.entry_price * commission)
            .sum();
        let expected = result.initial_capital + pnl - entry_commissions;

        prop_assert!(
            (result.final_capital - expected).abs() < 1e-6 * result.initial_capital,
            "final {} vs expected {}",
            result.final_capital,
            expected
        );
        // Liquidating at the last close carries no commission
        let last_equity = result.equity_curve.last().map_or(f64::NAN, |p| p.equity);
        prop_assert!((last_equity - result.final_capital).abs() < 1e-6 * result.initial_capital);
    }

    #[test]
    fn scripted_runs_are_deterministic(script in script()) {
        let a = run_script(&script);
        let b = run_script(&script);

        prop_assert_eq!(&a.trades, &b.trades);
        prop_assert_eq!(&a.equity_curve, &b.equity_curve);
        prop_assert_eq!(a.final_capital, b.final_capital);
    }

    #[test]
    fn bundled_strategies_run_cleanly(closes in price_path(), idx in 0usize..3) {
        let registry = StrategyRegistry::new();
        let id = registry.names()[idx];
        let mut strategy = registry.create_default(id).unwrap();

        let result = BacktestEngine::default()
            .run(strategy.as_mut(), &series_from(&closes))
            .unwrap();
        let m = &result.metrics;

        prop_assert_eq!(result.equity_curve.len(), closes.len());
        prop_assert!(m.sharpe_ratio.is_finite());
        prop_assert!((m.total_return - (result.final_capital - result.initial_capital)).abs() < 1e-6);
    }
}
