//! Strategy trait definitions.

use crate::error::StrategyError;
use crate::types::{BarSeries, Position, SeriesWindow, Side};

/// Facts about the open position passed to [`Strategy::check_exit_conditions`].
#[derive(Debug, Clone, Copy)]
pub struct ExitContext<'a> {
    pub symbol: &'a str,
    pub current_price: f64,
    pub entry_price: f64,
    /// Whole days since the entry bar
    pub days_held: i64,
    pub side: Side,
}

impl ExitContext<'_> {
    /// Price move in the position's favour, as a fraction of entry.
    pub fn profit_pct(&self) -> f64 {
        if self.entry_price == 0.0 {
            return 0.0;
        }
        self.side.price_delta(self.entry_price, self.current_price) / self.entry_price
    }
}

/// Strategy parameter set.
pub trait StrategyConfig: Send + Sync {
    /// Reject parameter combinations the strategy cannot run with.
    fn validate(&self) -> Result<(), StrategyError>;
}

/// Core strategy trait.
///
/// A strategy annotates a bar series with indicators and entry signals,
/// and is then consulted bar by bar by the backtest engine for leverage,
/// sizing and exits. Any error returned from a hook aborts the run.
///
/// Strategies may keep per-symbol state (trailing stops and the like) that
/// is mutated through the hooks, so an instance must not be shared between
/// concurrent runs.
pub trait Strategy: Send {
    /// Display name of this strategy.
    fn name(&self) -> &str;

    fn description(&self) -> &str {
        ""
    }

    /// Add derived indicator columns. Receives a working copy of the series.
    fn calculate_indicators(&self, series: BarSeries) -> Result<BarSeries, StrategyError>;

    /// Attach one signal per bar. A signal at bar `i` may only depend on
    /// bars `0..=i`.
    fn generate_signals(&self, series: BarSeries) -> Result<BarSeries, StrategyError>;

    /// Leverage for an entry at the last bar of `window`. Must be >= 1.0.
    fn get_leverage(&self, _window: &SeriesWindow<'_>) -> Result<f64, StrategyError> {
        Ok(1.0)
    }

    /// Number of units to enter; zero skips the signal.
    fn calculate_position_size(
        &self,
        symbol: &str,
        price: f64,
        portfolio_value: f64,
        window: &SeriesWindow<'_>,
    ) -> Result<u64, StrategyError>;

    /// Whether the open position should be closed at the current bar.
    /// Called every bar after the entry bar while a position is open.
    fn check_exit_conditions(
        &mut self,
        ctx: &ExitContext<'_>,
        window: &SeriesWindow<'_>,
    ) -> Result<bool, StrategyError>;

    /// Notification that the engine opened `position`.
    fn open_position(&mut self, _position: &Position) -> Result<(), StrategyError> {
        Ok(())
    }

    /// Notification that the engine closed the position in `symbol`.
    fn close_position(&mut self, _symbol: &str) -> Result<(), StrategyError> {
        Ok(())
    }
}
