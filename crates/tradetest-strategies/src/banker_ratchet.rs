//! The Banker Ratchet: leveraged liquidity-grab strategy.
//!
//! Looks for price sweeping a recent swing level and snapping back, in the
//! direction of the 200 EMA trend, while trading at a discount (longs) or
//! premium (shorts) to VWAP near the volume point of control. Positions are
//! managed with a ratchet stop: fixed at first, then breakeven, then trailing.

use serde::{Deserialize, Serialize};
use tracing::debug;
use tradetest_core::{
    error::StrategyError,
    traits::{ExitContext, HlcIndicator, Indicator, MultiOutputIndicator, Strategy, StrategyConfig},
    types::{BarSeries, Position, SeriesWindow, Signal},
};
use tradetest_indicators::{
    Atr, BollingerBands, Ema, Macd, PointOfControl, SwingPoints, Vwap,
};

use crate::rsi_mean_reversion::rsi_column;
use crate::stops::{StopBook, TrailingStop};

/// Configuration for the Banker Ratchet strategy.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BankerRatchetConfig {
    pub base_leverage: f64,
    pub ema_period: usize,
    pub bb_period: usize,
    pub bb_std: f64,
    /// Minimum Bollinger band width relative to the middle band
    pub min_bb_width: f64,
    pub rsi_period: usize,
    pub rsi_oversold: f64,
    pub rsi_overbought: f64,
    pub macd_fast: usize,
    pub macd_slow: usize,
    pub macd_signal: usize,
    pub swing_lookback: usize,
    pub poc_lookback: usize,
    /// Maximum distance from the point of control, as a fraction of price
    pub poc_proximity: f64,
    /// Wick tolerance around the swing level
    pub liquidity_grab_tolerance: f64,
    pub atr_period: usize,
    /// Fraction of portfolio value risked per trade
    pub risk_per_trade: f64,
    /// Fraction of leveraged portfolio value one position may use
    pub max_position_fraction: f64,
    pub initial_stop_pct: f64,
    pub breakeven_activation_pct: f64,
    pub trailing_distance_pct: f64,
}

impl Default for BankerRatchetConfig {
    fn default() -> Self {
        Self {
            base_leverage: 5.0,
            ema_period: 200,
            bb_period: 20,
            bb_std: 2.0,
            min_bb_width: 0.02,
            rsi_period: 14,
            rsi_oversold: 45.0,
            rsi_overbought: 55.0,
            macd_fast: 12,
            macd_slow: 26,
            macd_signal: 9,
            swing_lookback: 5,
            poc_lookback: 50,
            poc_proximity: 0.03,
            liquidity_grab_tolerance: 0.005,
            atr_period: 14,
            risk_per_trade: 0.02,
            max_position_fraction: 0.5,
            initial_stop_pct: 0.02,
            breakeven_activation_pct: 0.02,
            trailing_distance_pct: 0.01,
        }
    }
}

impl StrategyConfig for BankerRatchetConfig {
    fn validate(&self) -> Result<(), StrategyError> {
        if !(self.base_leverage >= 1.0) {
            return Err(StrategyError::InvalidConfig(
                "Base leverage must be at least 1".into(),
            ));
        }
        if self.bb_period < 2 || self.rsi_period < 2 {
            return Err(StrategyError::InvalidConfig(
                "Bollinger and RSI periods must be at least 2".into(),
            ));
        }
        if self.macd_fast == 0 || self.macd_slow <= self.macd_fast || self.macd_signal == 0 {
            return Err(StrategyError::InvalidConfig("Invalid MACD periods".into()));
        }
        if self.ema_period == 0
            || self.swing_lookback == 0
            || self.poc_lookback == 0
            || self.atr_period == 0
        {
            return Err(StrategyError::InvalidConfig(
                "Indicator periods must be positive".into(),
            ));
        }
        if self.initial_stop_pct <= 0.0 || self.initial_stop_pct >= 1.0 {
            return Err(StrategyError::InvalidConfig(
                "Initial stop must be between 0 and 1".into(),
            ));
        }
        if self.bb_std <= 0.0 {
            return Err(StrategyError::InvalidConfig(
                "Bollinger multiplier must be positive".into(),
            ));
        }
        Ok(())
    }
}

/// The Banker Ratchet strategy.
pub struct BankerRatchetStrategy {
    config: BankerRatchetConfig,
    stops: StopBook,
}

impl BankerRatchetStrategy {
    pub fn new(config: BankerRatchetConfig) -> Self {
        Self {
            config,
            stops: StopBook::new(),
        }
    }

    pub fn config(&self) -> &BankerRatchetConfig {
        &self.config
    }

    /// Current stop for `symbol`, if a position is being tracked.
    pub fn stop_for(&self, symbol: &str) -> Option<&TrailingStop> {
        self.stops.get(symbol)
    }

    fn near_poc(&self, close: f64, poc: f64) -> bool {
        poc.is_nan() || (close - poc).abs() / close < self.config.poc_proximity
    }
}

impl Default for BankerRatchetStrategy {
    fn default() -> Self {
        Self::new(BankerRatchetConfig::default())
    }
}

impl Strategy for BankerRatchetStrategy {
    fn name(&self) -> &str {
        "The Banker Ratchet"
    }

    fn description(&self) -> &str {
        "Leveraged liquidity grabs at swing levels with a ratchet trailing stop"
    }

    fn calculate_indicators(&self, mut series: BarSeries) -> Result<BarSeries, StrategyError> {
        let c = &self.config;
        let closes = series.closes();
        let highs = series.highs();
        let lows = series.lows();
        let volumes = series.volumes();

        series.insert_column("ema_200", Ema::from_first(c.ema_period).calculate(&closes));
        series.insert_column(
            "vwap",
            Vwap::new().calculate(&highs, &lows, &closes, &volumes),
        );

        let bands = BollingerBands::with_params(c.bb_period, c.bb_std).calculate(&closes);
        series.insert_column("bb_upper", bands.iter().map(|b| b.upper).collect());
        series.insert_column("bb_middle", bands.iter().map(|b| b.middle).collect());
        series.insert_column("bb_lower", bands.iter().map(|b| b.lower).collect());
        series.insert_column("bb_width", bands.iter().map(|b| b.bandwidth).collect());

        series.insert_column("rsi", rsi_column(&closes, c.rsi_period));

        let macd = Macd::with_params(c.macd_fast, c.macd_slow, c.macd_signal).calculate(&closes);
        series.insert_column("macd_line", macd.iter().map(|m| m.macd).collect());
        series.insert_column("macd_signal_line", macd.iter().map(|m| m.signal).collect());
        series.insert_column("macd_histogram", macd.iter().map(|m| m.histogram).collect());

        let swings = SwingPoints::new(c.swing_lookback).calculate(&highs, &lows);
        series.insert_column("swing_high", swings.highs);
        series.insert_column("swing_low", swings.lows);

        series.insert_column(
            "poc",
            PointOfControl::new(c.poc_lookback).calculate(&highs, &lows, &closes, &volumes),
        );
        series.insert_column(
            "atr",
            Atr::simple(c.atr_period).calculate_hlc(&highs, &lows, &closes),
        );

        Ok(series)
    }

    fn generate_signals(&self, mut series: BarSeries) -> Result<BarSeries, StrategyError> {
        let c = &self.config;
        let signals = {
            let ema = series.require_column("ema_200")?;
            let vwap = series.require_column("vwap")?;
            let rsi = series.require_column("rsi")?;
            let bb_width = series.require_column("bb_width")?;
            let hist = series.require_column("macd_histogram")?;
            let swing_high = series.require_column("swing_high")?;
            let swing_low = series.require_column("swing_low")?;
            let poc = series.require_column("poc")?;
            let bars = series.bars();

            let mut signals = vec![Signal::Hold; bars.len()];
            for i in 1..bars.len() {
                let bar = &bars[i];
                if ema[i].is_nan() || vwap[i].is_nan() || rsi[i].is_nan() {
                    continue;
                }
                // Only trade high-energy regimes
                if bb_width[i].is_nan() || bb_width[i] < c.min_bb_width {
                    continue;
                }

                if bar.close > ema[i] {
                    let level = swing_low[i];
                    if level.is_nan() {
                        continue;
                    }
                    let tolerance = level * c.liquidity_grab_tolerance;
                    let grab = bar.low <= level + tolerance && bar.close > level;
                    let bounce = bar.low <= level * 1.01 && bar.is_bullish();

                    if (grab || bounce)
                        && bar.close < vwap[i]
                        && self.near_poc(bar.close, poc[i])
                        && rsi[i] < c.rsi_oversold
                        && hist[i] > hist[i - 1]
                    {
                        signals[i] = Signal::Long;
                    }
                } else if bar.close < ema[i] {
                    let level = swing_high[i];
                    if level.is_nan() {
                        continue;
                    }
                    let tolerance = level * c.liquidity_grab_tolerance;
                    let grab = bar.high >= level - tolerance && bar.close < level;
                    let rejection = bar.high >= level * 0.99 && bar.is_bearish();

                    if (grab || rejection)
                        && bar.close > vwap[i]
                        && self.near_poc(bar.close, poc[i])
                        && rsi[i] > c.rsi_overbought
                        && hist[i] < hist[i - 1]
                    {
                        signals[i] = Signal::Short;
                    }
                }
            }
            signals
        };

        series.set_signals(signals)?;
        Ok(series)
    }

    /// Base leverage, cut to 4x when ATR exceeds 3% of price and 3x above 5%.
    fn get_leverage(&self, window: &SeriesWindow<'_>) -> Result<f64, StrategyError> {
        let base = self.config.base_leverage;
        let (Some(atr), Some(bar)) = (window.last_value("atr"), window.last()) else {
            return Ok(base);
        };
        if bar.close == 0.0 || bar.close.is_nan() {
            return Ok(base);
        }

        let atr_pct = atr / bar.close;
        let leverage = if atr_pct > 0.05 {
            3.0
        } else if atr_pct > 0.03 {
            4.0
        } else {
            base
        };
        Ok(leverage)
    }

    fn calculate_position_size(
        &self,
        _symbol: &str,
        price: f64,
        portfolio_value: f64,
        window: &SeriesWindow<'_>,
    ) -> Result<u64, StrategyError> {
        if price <= 0.0 || portfolio_value <= 0.0 {
            return Ok(0);
        }

        let risk_amount = portfolio_value * self.config.risk_per_trade;
        let stop_distance = price * self.config.initial_stop_pct;
        if stop_distance <= 0.0 {
            return Ok(0);
        }

        let leverage = self.get_leverage(window)?;
        let contracts = (risk_amount / stop_distance).floor();
        let max_contracts =
            (portfolio_value * self.config.max_position_fraction * leverage / price).floor();

        Ok(contracts.min(max_contracts) as u64)
    }

    fn check_exit_conditions(
        &mut self,
        ctx: &ExitContext<'_>,
        _window: &SeriesWindow<'_>,
    ) -> Result<bool, StrategyError> {
        if ctx.entry_price <= 0.0 || ctx.current_price <= 0.0 {
            return Ok(true);
        }

        let c = &self.config;
        let stop = self.stops.get_or_insert_with(ctx.symbol, || {
            TrailingStop::new(ctx.side, ctx.entry_price, c.initial_stop_pct)
        });
        let hit = stop.ratchet(
            ctx.current_price,
            c.breakeven_activation_pct,
            c.trailing_distance_pct,
        );

        if hit {
            debug!(
                symbol = ctx.symbol,
                stop_price = stop.stop_price,
                price = ctx.current_price,
                "Ratchet stop hit"
            );
        }
        Ok(hit)
    }

    fn open_position(&mut self, position: &Position) -> Result<(), StrategyError> {
        self.stops.insert(
            &position.symbol,
            TrailingStop::new(
                position.side,
                position.entry_price,
                self.config.initial_stop_pct,
            ),
        );
        Ok(())
    }

    fn close_position(&mut self, symbol: &str) -> Result<(), StrategyError> {
        self.stops.remove(symbol);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tradetest_core::types::{Bar, Side, Timeframe};

    const HOUR: i64 = 3_600_000;

    fn bars(len: usize) -> BarSeries {
        let bars = (0..len)
            .map(|i| {
                let c = 100.0 + (i as f64 * 0.3).sin() * 8.0;
                Bar::new(i as i64 * HOUR, c - 0.5, c + 2.0, c - 2.0, c, 1_000.0 + i as f64)
            })
            .collect();
        BarSeries::from_bars("BTCUSDT", Timeframe::Hour1, bars)
    }

    fn ctx(side: Side, price: f64) -> ExitContext<'static> {
        ExitContext {
            symbol: "BTCUSDT",
            current_price: price,
            entry_price: 100.0,
            days_held: 0,
            side,
        }
    }

    #[test]
    fn test_indicator_columns_present() {
        let strategy = BankerRatchetStrategy::default();
        let data = strategy.calculate_indicators(bars(120)).unwrap();

        for name in [
            "ema_200", "vwap", "bb_width", "rsi", "macd_histogram", "swing_high", "swing_low",
            "poc", "atr",
        ] {
            assert_eq!(data.column(name).map(|c| c.len()), Some(120), "{name}");
        }
        // Swing levels only known after the confirmation delay
        assert!(data.value("swing_high", 9).is_none());
        assert!(data.value("poc", 49).is_none());
        assert!(data.value("poc", 50).is_some());
    }

    #[test]
    fn test_signals_cover_every_bar() {
        let strategy = BankerRatchetStrategy::default();
        let data = strategy.calculate_indicators(bars(300)).unwrap();
        let data = strategy.generate_signals(data).unwrap();

        assert_eq!(data.signals().map(|s| s.len()), Some(300));
        assert_eq!(data.signal(0), Signal::Hold);
    }

    /// Three bars with hand-set indicator columns; the last bar is the setup.
    fn setup(last: Bar, columns: &[(&str, [f64; 3])]) -> BarSeries {
        let mut data: BarSeries = vec![
            Bar::new(0, 100.0, 101.0, 99.0, 100.0, 1_000.0),
            Bar::new(HOUR, 100.0, 101.0, 99.0, 100.0, 1_000.0),
            last,
        ]
        .into_iter()
        .collect();
        for (name, values) in columns {
            data.insert_column(*name, values.to_vec());
        }
        data
    }

    fn long_setup(rsi: f64, bb_width: f64) -> BarSeries {
        // Wick to 97.9 sweeps the 98 swing low, bullish close back above it,
        // under VWAP and next to the point of control in an uptrend
        setup(
            Bar::new(2 * HOUR, 99.0, 101.0, 97.9, 100.0, 1_000.0),
            &[
                ("ema_200", [95.0; 3]),
                ("vwap", [102.0; 3]),
                ("rsi", [50.0, 50.0, rsi]),
                ("bb_width", [0.05, 0.05, bb_width]),
                ("macd_histogram", [-1.0, -0.5, -0.2]),
                ("swing_high", [110.0; 3]),
                ("swing_low", [98.0; 3]),
                ("poc", [100.5; 3]),
            ],
        )
    }

    fn short_setup(hist: f64) -> BarSeries {
        // Wick to 102.1 runs the 102 swing high, bearish close back below it,
        // above VWAP in a downtrend
        setup(
            Bar::new(2 * HOUR, 101.0, 102.1, 99.0, 100.0, 1_000.0),
            &[
                ("ema_200", [105.0; 3]),
                ("vwap", [98.0; 3]),
                ("rsi", [50.0, 50.0, 60.0]),
                ("bb_width", [0.05; 3]),
                ("macd_histogram", [1.0, 0.5, hist]),
                ("swing_high", [102.0; 3]),
                ("swing_low", [90.0; 3]),
                ("poc", [99.5; 3]),
            ],
        )
    }

    #[test]
    fn test_liquidity_grab_long() {
        let strategy = BankerRatchetStrategy::default();

        let data = strategy.generate_signals(long_setup(40.0, 0.05)).unwrap();
        assert_eq!(data.signal(2), Signal::Long);
        assert_eq!(data.signal(1), Signal::Hold);

        // Not oversold
        let data = strategy.generate_signals(long_setup(50.0, 0.05)).unwrap();
        assert_eq!(data.signal(2), Signal::Hold);

        // Bands too tight
        let data = strategy.generate_signals(long_setup(40.0, 0.01)).unwrap();
        assert_eq!(data.signal(2), Signal::Hold);
    }

    #[test]
    fn test_liquidity_grab_short() {
        let strategy = BankerRatchetStrategy::default();

        let data = strategy.generate_signals(short_setup(0.2)).unwrap();
        assert_eq!(data.signal(2), Signal::Short);

        // Momentum still rising
        let data = strategy.generate_signals(short_setup(0.8)).unwrap();
        assert_eq!(data.signal(2), Signal::Hold);
    }

    #[test]
    fn test_missing_column_is_an_error() {
        let strategy = BankerRatchetStrategy::default();
        let result = strategy.generate_signals(bars(10));
        assert!(matches!(result, Err(StrategyError::MissingColumn(_))));
    }

    #[test]
    fn test_leverage_tiers() {
        let strategy = BankerRatchetStrategy::default();
        let mut data: BarSeries = vec![Bar::new(0, 100.0, 101.0, 99.0, 100.0, 1.0)]
            .into_iter()
            .collect();

        assert_eq!(strategy.get_leverage(&data.window(0)).unwrap(), 5.0);

        data.insert_column("atr", vec![2.0]);
        assert_eq!(strategy.get_leverage(&data.window(0)).unwrap(), 5.0);
        data.insert_column("atr", vec![4.0]);
        assert_eq!(strategy.get_leverage(&data.window(0)).unwrap(), 4.0);
        data.insert_column("atr", vec![6.0]);
        assert_eq!(strategy.get_leverage(&data.window(0)).unwrap(), 3.0);
    }

    #[test]
    fn test_position_size_risk_based_and_capped() {
        let strategy = BankerRatchetStrategy::default();
        let data: BarSeries = vec![Bar::new(0, 100.0, 101.0, 99.0, 100.0, 1.0)]
            .into_iter()
            .collect();
        let window = data.window(0);

        // Risk 2,000 over a 2.0 stop distance: 1,000 contracts,
        // capped at 100,000 * 0.5 * 5 / 100 = 2,500
        assert_eq!(
            strategy
                .calculate_position_size("X", 100.0, 100_000.0, &window)
                .unwrap(),
            1_000
        );
        // Cheap contract: 100,000 at risk limit, cap is 250,000
        assert_eq!(
            strategy
                .calculate_position_size("X", 1.0, 100_000.0, &window)
                .unwrap(),
            100_000
        );
        assert_eq!(
            strategy
                .calculate_position_size("X", 100.0, 0.0, &window)
                .unwrap(),
            0
        );
    }

    #[test]
    fn test_ratchet_exit_and_cleanup() {
        let mut strategy = BankerRatchetStrategy::default();
        let data = bars(2);
        let window = data.window(1);

        assert!(!strategy.check_exit_conditions(&ctx(Side::Long, 101.0), &window).unwrap());
        assert!(!strategy.check_exit_conditions(&ctx(Side::Long, 104.0), &window).unwrap());
        let stop = strategy.stop_for("BTCUSDT").map(|s| s.stop_price);
        assert!((stop.unwrap() - 102.96).abs() < 1e-9);

        assert!(strategy.check_exit_conditions(&ctx(Side::Long, 102.9), &window).unwrap());

        strategy.close_position("BTCUSDT").unwrap();
        assert!(strategy.stop_for("BTCUSDT").is_none());
    }

    #[test]
    fn test_short_initial_stop() {
        let mut strategy = BankerRatchetStrategy::default();
        let data = bars(2);
        let window = data.window(1);

        let position = Position::new("BTCUSDT", Side::Short, 100.0, 0, 5, 5.0);
        strategy.open_position(&position).unwrap();

        assert!(!strategy.check_exit_conditions(&ctx(Side::Short, 101.5), &window).unwrap());
        assert!(strategy.check_exit_conditions(&ctx(Side::Short, 102.5), &window).unwrap());
    }
}
