//! Backtesting engine.

use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, info};
use tradetest_core::error::{BacktestError, StrategyError};
use tradetest_core::traits::{ExitContext, Strategy};
use tradetest_core::types::{Bar, BarSeries, Position, SeriesWindow, Side, Trade};

use crate::report::{BacktestResult, EquityPoint};
use crate::statistics::PerformanceMetrics;

/// Engine configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Starting cash
    pub initial_capital: f64,
    /// Commission as a fraction of traded notional, charged per side
    pub commission: f64,
    /// Periods per year for the Sharpe ratio (252 for daily bars)
    pub annualization_factor: f64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            initial_capital: 100_000.0,
            commission: 0.001,
            annualization_factor: 252.0,
        }
    }
}

impl EngineConfig {
    pub fn validate(&self) -> Result<(), BacktestError> {
        if !(self.initial_capital > 0.0) || !self.initial_capital.is_finite() {
            return Err(BacktestError::InvalidConfig(
                "initial_capital must be positive".into(),
            ));
        }
        if !(self.commission >= 0.0) || !self.commission.is_finite() {
            return Err(BacktestError::InvalidConfig(
                "commission must be a non-negative fraction".into(),
            ));
        }
        if !(self.annualization_factor > 0.0) {
            return Err(BacktestError::InvalidConfig(
                "annualization_factor must be positive".into(),
            ));
        }
        Ok(())
    }
}

/// Cash, the open position and the records produced during one run.
struct Ledger {
    cash: f64,
    position: Option<Position>,
    trades: Vec<Trade>,
    equity: Vec<EquityPoint>,
}

impl Ledger {
    fn new(cash: f64, bars: usize) -> Self {
        Self {
            cash,
            position: None,
            trades: Vec::new(),
            equity: Vec::with_capacity(bars),
        }
    }

    /// Return margin and leveraged P&L to cash, less the exit commission.
    fn close(&mut self, position: Position, bar: &Bar, exit_commission: f64) {
        self.cash += position.market_value(bar.close) - exit_commission;
        let trade = Trade::from_close(&position, bar.timestamp, bar.close, exit_commission);

        debug!(
            symbol = %position.symbol,
            side = %trade.side,
            entry_price = trade.entry_price,
            exit_price = trade.exit_price,
            size = trade.size,
            leverage = trade.leverage,
            pnl = trade.pnl,
            cash = self.cash,
            "Closed position"
        );

        self.trades.push(trade);
    }

    fn portfolio_value(&self, price: f64) -> f64 {
        match &self.position {
            Some(position) => self.cash + position.market_value(price),
            None => self.cash,
        }
    }
}

/// Backtesting engine.
///
/// Runs are synchronous and independent; the engine holds only configuration
/// and can be shared between threads.
#[derive(Debug, Clone, Default)]
pub struct BacktestEngine {
    config: EngineConfig,
}

impl BacktestEngine {
    /// Create a new backtest engine.
    pub fn new(config: EngineConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Run `strategy` over `series`.
    ///
    /// Bars are processed in the order given. Any strategy error aborts the
    /// run and no partial result is returned.
    pub fn run(
        &self,
        strategy: &mut dyn Strategy,
        series: &BarSeries,
    ) -> Result<BacktestResult, BacktestError> {
        if series.is_empty() {
            return Err(BacktestError::EmptySeries);
        }
        self.config.validate()?;

        let symbol = series.symbol.clone();
        info!(
            strategy = strategy.name(),
            symbol = %symbol,
            bars = series.len(),
            "Starting backtest"
        );

        let data = strategy.calculate_indicators(series.clone())?;
        let data = strategy.generate_signals(data)?;
        if data.len() != series.len() {
            return Err(StrategyError::ContractViolation(format!(
                "series has {} bars after signal generation, expected {}",
                data.len(),
                series.len()
            ))
            .into());
        }

        let commission = self.config.commission;
        let mut ledger = Ledger::new(self.config.initial_capital, data.len());

        for (i, bar) in data.iter().enumerate() {
            let window = data.window(i);

            // Exit check
            if let Some(position) = ledger.position.take() {
                let ctx = ExitContext {
                    symbol: &symbol,
                    current_price: bar.close,
                    entry_price: position.entry_price,
                    days_held: position.days_held(bar.timestamp),
                    side: position.side,
                };

                if strategy.check_exit_conditions(&ctx, &window)? {
                    let exit_commission = position.notional(bar.close) * commission;
                    ledger.close(position, bar, exit_commission);
                    strategy.close_position(&symbol)?;
                } else {
                    ledger.position = Some(position);
                }
            }

            // Entry check
            let signal = data.signal(i);
            if ledger.position.is_none() {
                if let Some(side) = signal.side() {
                    self.try_enter(strategy, &mut ledger, &window, bar, side)?;
                }
            }

            ledger.equity.push(EquityPoint {
                timestamp: bar.datetime(),
                equity: ledger.portfolio_value(bar.close),
            });
        }

        // Liquidate at the final close without exit commission
        let mut forced_close = false;
        if let (Some(position), Some(last)) = (ledger.position.take(), data.last()) {
            ledger.close(position, last, 0.0);
            forced_close = true;
        }

        let result = self.build_result(strategy.name(), &data, ledger, forced_close);

        info!(
            strategy = %result.strategy_name,
            symbol = %result.symbol,
            trades = result.metrics.num_trades,
            final_capital = result.final_capital,
            total_return_pct = result.metrics.total_return_pct,
            "Backtest complete"
        );

        Ok(result)
    }

    fn try_enter(
        &self,
        strategy: &mut dyn Strategy,
        ledger: &mut Ledger,
        window: &SeriesWindow<'_>,
        bar: &Bar,
        side: Side,
    ) -> Result<(), BacktestError> {
        let symbol = window.symbol();
        let price = bar.close;

        let leverage = strategy.get_leverage(window)?;
        if !leverage.is_finite() || leverage < 1.0 {
            return Err(StrategyError::ContractViolation(format!(
                "leverage must be a finite value >= 1.0, got {leverage}"
            ))
            .into());
        }

        // Entries only happen flat, so cash is the whole portfolio value. After
        // an exit on this bar it is the settled cash, not the bar-start value
        let size = strategy.calculate_position_size(symbol, price, ledger.cash, window)?;
        if size == 0 {
            return Ok(());
        }

        let trade_value = size as f64 * price;
        let margin = trade_value / leverage;
        let entry_commission = trade_value * self.config.commission;

        if ledger.cash < margin + entry_commission {
            debug!(
                symbol,
                size,
                required = margin + entry_commission,
                cash = ledger.cash,
                "Insufficient cash, entry skipped"
            );
            return Ok(());
        }

        ledger.cash -= margin + entry_commission;
        let position = Position::new(symbol, side, price, bar.timestamp, size, leverage);

        debug!(
            symbol,
            side = %side,
            price,
            size,
            leverage,
            margin,
            commission = entry_commission,
            "Opened position"
        );

        strategy.open_position(&position)?;
        ledger.position = Some(position);
        Ok(())
    }

    fn build_result(
        &self,
        strategy_name: &str,
        data: &BarSeries,
        ledger: Ledger,
        forced_close: bool,
    ) -> BacktestResult {
        let equity: Vec<f64> = ledger.equity.iter().map(|p| p.equity).collect();
        let metrics = PerformanceMetrics::calculate(
            self.config.initial_capital,
            ledger.cash,
            &ledger.trades,
            &equity,
            self.config.annualization_factor,
        );

        let date = |bar: Option<&Bar>| {
            bar.map(|b| b.date().format("%Y-%m-%d").to_string())
                .unwrap_or_default()
        };

        let mut metadata = serde_json::Map::new();
        metadata.insert("commission".into(), json!(self.config.commission));
        metadata.insert("bars".into(), json!(data.len()));
        metadata.insert("timeframe".into(), json!(data.timeframe.as_str()));
        metadata.insert(
            "annualization_factor".into(),
            json!(self.config.annualization_factor),
        );
        metadata.insert("forced_close".into(), json!(forced_close));

        BacktestResult {
            strategy_name: strategy_name.to_string(),
            symbol: data.symbol.clone(),
            start_date: date(data.first()),
            end_date: date(data.last()),
            initial_capital: self.config.initial_capital,
            final_capital: ledger.cash,
            metrics,
            trades: ledger.trades,
            equity_curve: ledger.equity,
            metadata,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tradetest_core::types::Timeframe;
    use tradetest_strategies::StrategyRegistry;

    fn generate_test_data() -> BarSeries {
        let bars: Vec<Bar> = (0..300)
            .map(|i| {
                let price = 100.0 + (i as f64 * 0.2).sin() * 10.0 + i as f64 * 0.05;
                Bar::new(
                    i as i64 * 86_400_000,
                    price,
                    price + 2.0,
                    price - 2.0,
                    price + 1.0,
                    1_000_000.0 * (1.0 + (i % 7) as f64 * 0.3),
                )
            })
            .collect();
        BarSeries::from_bars("TEST", Timeframe::Daily, bars)
    }

    #[test]
    fn test_config_validation() {
        assert!(EngineConfig::default().validate().is_ok());

        let bad = EngineConfig {
            initial_capital: 0.0,
            ..Default::default()
        };
        assert!(matches!(bad.validate(), Err(BacktestError::InvalidConfig(_))));

        let bad = EngineConfig {
            commission: -0.1,
            ..Default::default()
        };
        assert!(bad.validate().is_err());
    }

    #[test]
    fn test_bundled_strategies_run() {
        let engine = BacktestEngine::default();
        let registry = StrategyRegistry::new();
        let data = generate_test_data();

        for id in registry.names() {
            let mut strategy = registry.create_default(id).unwrap();
            let result = engine.run(strategy.as_mut(), &data).unwrap();

            assert_eq!(result.equity_curve.len(), data.len());
            assert_eq!(result.metadata["bars"], 300);
            assert_eq!(result.start_date, "1970-01-01");
        }
    }

    #[test]
    fn test_empty_series_rejected() {
        let engine = BacktestEngine::default();
        let mut strategy = StrategyRegistry::new()
            .create_default("rsi_mean_reversion")
            .unwrap();
        let empty = BarSeries::new("TEST", Timeframe::Daily);

        let err = engine.run(strategy.as_mut(), &empty).unwrap_err();
        assert!(matches!(err, BacktestError::EmptySeries));
    }
}
