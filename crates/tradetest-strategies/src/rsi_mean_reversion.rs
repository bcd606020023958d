//! RSI mean reversion strategy.
//!
//! Fades RSI extremes in the direction of the long-term trend: buys
//! oversold dips above the 200-bar SMA and sells overbought rallies below
//! it, both only on above-average volume.

use serde::{Deserialize, Serialize};
use tradetest_core::{
    error::StrategyError,
    traits::{ExitContext, Indicator, Strategy, StrategyConfig},
    types::{BarSeries, SeriesWindow, Side, Signal},
};
use tradetest_indicators::{Rsi, Sma};

/// RSI value used before the indicator has warmed up.
pub(crate) const NEUTRAL_RSI: f64 = 50.0;

/// Full-length RSI column with neutral warm-up values.
pub(crate) fn rsi_column(closes: &[f64], period: usize) -> Vec<f64> {
    let values = Rsi::new(period).calculate(closes);
    let mut column = vec![NEUTRAL_RSI; closes.len() - values.len()];
    column.extend(values);
    column
}

/// Configuration for the RSI mean reversion strategy.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RsiMeanReversionConfig {
    pub rsi_period: usize,
    /// Long entry below this RSI
    pub rsi_oversold: f64,
    /// Short entry above this RSI
    pub rsi_overbought: f64,
    /// Long profit exit above this RSI
    pub rsi_exit_long: f64,
    /// Short profit exit below this RSI
    pub rsi_exit_short: f64,
    /// Long loss exit below this RSI
    pub rsi_deep_oversold: f64,
    /// Short loss exit above this RSI
    pub rsi_deep_overbought: f64,
    /// Trend filter SMA period
    pub sma_period: usize,
    pub volume_ma_period: usize,
    /// Volume must be at least this multiple of its average
    pub volume_multiplier: f64,
    /// Fraction of portfolio value per trade
    pub allocation: f64,
    pub min_position_value: f64,
    pub max_position_value: f64,
    pub stop_loss_pct: f64,
    pub max_holding_days: i64,
}

impl Default for RsiMeanReversionConfig {
    fn default() -> Self {
        Self {
            rsi_period: 14,
            rsi_oversold: 30.0,
            rsi_overbought: 70.0,
            rsi_exit_long: 60.0,
            rsi_exit_short: 40.0,
            rsi_deep_oversold: 20.0,
            rsi_deep_overbought: 80.0,
            sma_period: 200,
            volume_ma_period: 20,
            volume_multiplier: 1.2,
            allocation: 0.10,
            min_position_value: 1000.0,
            max_position_value: 10000.0,
            stop_loss_pct: 0.03,
            max_holding_days: 10,
        }
    }
}

impl StrategyConfig for RsiMeanReversionConfig {
    fn validate(&self) -> Result<(), StrategyError> {
        if self.rsi_period < 2 {
            return Err(StrategyError::InvalidConfig(
                "RSI period must be at least 2".into(),
            ));
        }
        if self.rsi_oversold >= self.rsi_overbought {
            return Err(StrategyError::InvalidConfig(
                "Oversold must be less than overbought".into(),
            ));
        }
        if self.rsi_overbought > 100.0 || self.rsi_oversold < 0.0 {
            return Err(StrategyError::InvalidConfig(
                "RSI thresholds must be between 0 and 100".into(),
            ));
        }
        if self.sma_period == 0 || self.volume_ma_period == 0 {
            return Err(StrategyError::InvalidConfig(
                "Moving average periods must be positive".into(),
            ));
        }
        if self.min_position_value > self.max_position_value {
            return Err(StrategyError::InvalidConfig(
                "Minimum position value exceeds maximum".into(),
            ));
        }
        if !(0.0..1.0).contains(&self.stop_loss_pct) {
            return Err(StrategyError::InvalidConfig(
                "Stop loss must be between 0 and 1".into(),
            ));
        }
        Ok(())
    }
}

/// RSI mean reversion strategy.
pub struct RsiMeanReversionStrategy {
    config: RsiMeanReversionConfig,
}

impl RsiMeanReversionStrategy {
    pub fn new(config: RsiMeanReversionConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &RsiMeanReversionConfig {
        &self.config
    }
}

impl Default for RsiMeanReversionStrategy {
    fn default() -> Self {
        Self::new(RsiMeanReversionConfig::default())
    }
}

impl Strategy for RsiMeanReversionStrategy {
    fn name(&self) -> &str {
        "RSI Mean Reversion"
    }

    fn description(&self) -> &str {
        "Fades RSI extremes with a 200-bar trend filter and volume confirmation"
    }

    fn calculate_indicators(&self, mut series: BarSeries) -> Result<BarSeries, StrategyError> {
        let closes = series.closes();
        let volumes = series.volumes();

        series.insert_column("rsi", rsi_column(&closes, self.config.rsi_period));
        series.insert_column(
            "sma_200",
            Sma::new(self.config.sma_period).calculate(&closes),
        );
        series.insert_column(
            "volume_ma",
            Sma::new(self.config.volume_ma_period).calculate(&volumes),
        );

        Ok(series)
    }

    fn generate_signals(&self, mut series: BarSeries) -> Result<BarSeries, StrategyError> {
        let signals = {
            let rsi = series.require_column("rsi")?;
            let sma = series.require_column("sma_200")?;
            let volume_ma = series.require_column("volume_ma")?;

            series
                .iter()
                .enumerate()
                .map(|(i, bar)| {
                    if sma[i].is_nan() {
                        return Signal::Hold;
                    }
                    let high_volume = bar.volume >= self.config.volume_multiplier * volume_ma[i];
                    if !high_volume {
                        Signal::Hold
                    } else if rsi[i] < self.config.rsi_oversold && bar.close > sma[i] {
                        Signal::Long
                    } else if rsi[i] > self.config.rsi_overbought && bar.close < sma[i] {
                        Signal::Short
                    } else {
                        Signal::Hold
                    }
                })
                .collect::<Vec<_>>()
        };

        series.set_signals(signals)?;
        Ok(series)
    }

    fn calculate_position_size(
        &self,
        _symbol: &str,
        price: f64,
        portfolio_value: f64,
        _window: &SeriesWindow<'_>,
    ) -> Result<u64, StrategyError> {
        if price <= 0.0 || portfolio_value <= 0.0 {
            return Ok(0);
        }

        let value = (portfolio_value * self.config.allocation)
            .min(self.config.max_position_value)
            .max(self.config.min_position_value);

        Ok((value / price).floor() as u64)
    }

    fn check_exit_conditions(
        &mut self,
        ctx: &ExitContext<'_>,
        window: &SeriesWindow<'_>,
    ) -> Result<bool, StrategyError> {
        if ctx.entry_price <= 0.0 || ctx.current_price <= 0.0 {
            return Ok(true);
        }
        if ctx.days_held >= self.config.max_holding_days {
            return Ok(true);
        }

        let Some(rsi) = window.last_value("rsi") else {
            return Ok(false);
        };

        let c = &self.config;
        let exit = match ctx.side {
            Side::Long => {
                rsi > c.rsi_exit_long
                    || rsi < c.rsi_deep_oversold
                    || ctx.current_price <= ctx.entry_price * (1.0 - c.stop_loss_pct)
            }
            Side::Short => {
                rsi < c.rsi_exit_short
                    || rsi > c.rsi_deep_overbought
                    || ctx.current_price >= ctx.entry_price * (1.0 + c.stop_loss_pct)
            }
        };

        Ok(exit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tradetest_core::types::{Bar, Timeframe};

    const DAY: i64 = 86_400_000;

    fn series(closes: &[f64], volume: f64) -> BarSeries {
        closes
            .iter()
            .enumerate()
            .map(|(i, &c)| Bar::new(i as i64 * DAY, c, c + 1.0, c - 1.0, c, volume))
            .collect()
    }

    fn ctx(side: Side, entry: f64, price: f64, days: i64) -> ExitContext<'static> {
        ExitContext {
            symbol: "TEST",
            current_price: price,
            entry_price: entry,
            days_held: days,
            side,
        }
    }

    #[test]
    fn test_config_validation() {
        assert!(RsiMeanReversionConfig::default().validate().is_ok());

        let config = RsiMeanReversionConfig {
            rsi_oversold: 80.0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rsi_column_is_full_length() {
        let closes: Vec<f64> = (0..30).map(|i| 100.0 + i as f64).collect();
        let column = rsi_column(&closes, 14);

        assert_eq!(column.len(), 30);
        assert_eq!(column[13], NEUTRAL_RSI);
        assert_eq!(column[14], 100.0);
        assert_eq!(rsi_column(&closes[..5], 14), vec![NEUTRAL_RSI; 5]);
    }

    #[test]
    fn test_signals_require_indicators() {
        let strategy = RsiMeanReversionStrategy::default();
        let result = strategy.generate_signals(series(&[1.0, 2.0], 100.0));

        assert!(matches!(result, Err(StrategyError::MissingColumn(_))));
    }

    #[test]
    fn test_short_series_all_hold() {
        let strategy = RsiMeanReversionStrategy::default();
        let data = series(&[100.0; 50], 1000.0);
        let data = strategy.calculate_indicators(data).unwrap();
        let data = strategy.generate_signals(data).unwrap();

        assert_eq!(data.signals().map(|s| s.len()), Some(50));
        assert!((0..50).all(|i| data.signal(i) == Signal::Hold));
    }

    #[test]
    fn test_oversold_dip_above_trend_goes_long() {
        let config = RsiMeanReversionConfig {
            sma_period: 15,
            volume_ma_period: 3,
            rsi_period: 3,
            ..Default::default()
        };
        let strategy = RsiMeanReversionStrategy::new(config);

        let mut bars: Vec<Bar> = (0..20)
            .map(|i| {
                let c = 100.0 + i as f64 * 2.0;
                Bar::new(i * DAY, c, c + 1.0, c - 1.0, c, 1000.0)
            })
            .collect();
        // Sharp two-bar drop on heavy volume, still above the 15-bar SMA
        for (offset, close) in [(20, 130.0), (21, 128.0)] {
            bars.push(Bar::new(offset * DAY, close, close + 1.0, close - 1.0, close, 5000.0));
        }
        let data = BarSeries::from_bars("TEST", Timeframe::Daily, bars);

        let data = strategy.calculate_indicators(data).unwrap();
        let data = strategy.generate_signals(data).unwrap();

        assert!(data.value("rsi", 21).unwrap() < 30.0);
        assert_eq!(data.signal(21), Signal::Long);
    }

    #[test]
    fn test_position_size_clamped() {
        let strategy = RsiMeanReversionStrategy::default();
        let data = series(&[100.0], 0.0);
        let window = data.window(0);

        // 10% of 5,000 is raised to the 1,000 floor
        assert_eq!(
            strategy
                .calculate_position_size("TEST", 100.0, 5_000.0, &window)
                .unwrap(),
            10
        );
        // 10% of 1,000,000 is capped at 10,000
        assert_eq!(
            strategy
                .calculate_position_size("TEST", 100.0, 1_000_000.0, &window)
                .unwrap(),
            100
        );
        assert_eq!(
            strategy
                .calculate_position_size("TEST", 0.0, 1_000_000.0, &window)
                .unwrap(),
            0
        );
    }

    #[test]
    fn test_exit_rules() {
        let mut strategy = RsiMeanReversionStrategy::default();
        let mut data = series(&[100.0, 100.0], 0.0);
        data.insert_column("rsi", vec![50.0, 45.0]);
        let window = data.window(1);

        // Neutral RSI, small move: hold
        assert!(!strategy
            .check_exit_conditions(&ctx(Side::Long, 100.0, 99.0, 2), &window)
            .unwrap());
        // Time stop
        assert!(strategy
            .check_exit_conditions(&ctx(Side::Long, 100.0, 101.0, 10), &window)
            .unwrap());
        // 3% stop loss
        assert!(strategy
            .check_exit_conditions(&ctx(Side::Long, 100.0, 97.0, 1), &window)
            .unwrap());
        assert!(strategy
            .check_exit_conditions(&ctx(Side::Short, 100.0, 103.0, 1), &window)
            .unwrap());

        data.insert_column("rsi", vec![50.0, 65.0]);
        let window = data.window(1);
        assert!(strategy
            .check_exit_conditions(&ctx(Side::Long, 100.0, 100.0, 1), &window)
            .unwrap());
        assert!(!strategy
            .check_exit_conditions(&ctx(Side::Short, 100.0, 100.0, 1), &window)
            .unwrap());
    }
}
