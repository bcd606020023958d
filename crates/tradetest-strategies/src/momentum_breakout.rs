//! Momentum breakout strategy (long only).
//!
//! Enters when price clears the prior 20-bar high by a margin while the
//! trend is strong (ADX), above both the 50 and 200 SMA, on a volume surge
//! and without having already run too far. Exits on a profit target, a time
//! limit, a close under the 10 EMA, or a tiered trailing stop.

use serde::{Deserialize, Serialize};
use tracing::debug;
use tradetest_core::{
    error::StrategyError,
    traits::{ExitContext, HlcIndicator, Indicator, Strategy, StrategyConfig},
    types::{BarSeries, Position, SeriesWindow, Side, Signal},
};
use tradetest_indicators::{Adx, Atr, Ema, PercentChange, RollingMax, Sma};

use crate::stops::{StopBook, TrailingStop};

/// Configuration for the momentum breakout strategy.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MomentumBreakoutConfig {
    pub breakout_period: usize,
    /// Close must exceed the prior high by this fraction
    pub breakout_pct: f64,
    pub adx_period: usize,
    pub adx_threshold: f64,
    pub sma_fast_period: usize,
    pub sma_slow_period: usize,
    pub volume_avg_period: usize,
    pub volume_multiplier: f64,
    pub ema_exit_period: usize,
    pub atr_period: usize,
    pub profit_target_pct: f64,
    pub initial_stop_pct: f64,
    /// Positions held longer than this are closed
    pub max_hold_days: i64,
    pub chase_lookback: usize,
    /// Skip entries after a move larger than this over `chase_lookback` bars
    pub chase_threshold: f64,
    /// Dollar risk per trade, spread over two ATRs
    pub risk_amount: f64,
    pub min_position_value: f64,
    pub max_position_value: f64,
}

impl Default for MomentumBreakoutConfig {
    fn default() -> Self {
        Self {
            breakout_period: 20,
            breakout_pct: 0.02,
            adx_period: 14,
            adx_threshold: 25.0,
            sma_fast_period: 50,
            sma_slow_period: 200,
            volume_avg_period: 50,
            volume_multiplier: 2.0,
            ema_exit_period: 10,
            atr_period: 14,
            profit_target_pct: 0.15,
            initial_stop_pct: 0.05,
            max_hold_days: 30,
            chase_lookback: 5,
            chase_threshold: 0.10,
            risk_amount: 1000.0,
            min_position_value: 2000.0,
            max_position_value: 15000.0,
        }
    }
}

impl StrategyConfig for MomentumBreakoutConfig {
    fn validate(&self) -> Result<(), StrategyError> {
        let periods = [
            self.breakout_period,
            self.adx_period,
            self.sma_fast_period,
            self.sma_slow_period,
            self.volume_avg_period,
            self.ema_exit_period,
            self.atr_period,
            self.chase_lookback,
        ];
        if periods.contains(&0) {
            return Err(StrategyError::InvalidConfig(
                "Indicator periods must be positive".into(),
            ));
        }
        if self.sma_fast_period >= self.sma_slow_period {
            return Err(StrategyError::InvalidConfig(
                "Fast SMA period must be less than slow SMA period".into(),
            ));
        }
        if self.min_position_value > self.max_position_value {
            return Err(StrategyError::InvalidConfig(
                "Minimum position value exceeds maximum".into(),
            ));
        }
        if self.risk_amount <= 0.0 {
            return Err(StrategyError::InvalidConfig(
                "Risk amount must be positive".into(),
            ));
        }
        Ok(())
    }
}

/// Momentum breakout strategy.
pub struct MomentumBreakoutStrategy {
    config: MomentumBreakoutConfig,
    /// Highest price since entry, per symbol
    peaks: StopBook,
}

impl MomentumBreakoutStrategy {
    pub fn new(config: MomentumBreakoutConfig) -> Self {
        Self {
            config,
            peaks: StopBook::new(),
        }
    }

    pub fn config(&self) -> &MomentumBreakoutConfig {
        &self.config
    }

    /// Stop level for the current profit tier.
    fn stop_price(&self, entry_price: f64, profit_pct: f64, peak: f64, atr: Option<f64>) -> f64 {
        if profit_pct < 0.05 {
            entry_price * (1.0 - self.config.initial_stop_pct)
        } else if profit_pct < 0.10 {
            entry_price
        } else {
            match atr {
                Some(atr) => peak - 2.0 * atr,
                None => peak * 0.95,
            }
        }
    }
}

impl Default for MomentumBreakoutStrategy {
    fn default() -> Self {
        Self::new(MomentumBreakoutConfig::default())
    }
}

impl Strategy for MomentumBreakoutStrategy {
    fn name(&self) -> &str {
        "Momentum Breakout"
    }

    fn description(&self) -> &str {
        "Buys volume-confirmed breakouts above the 20-bar high in strong uptrends"
    }

    fn calculate_indicators(&self, mut series: BarSeries) -> Result<BarSeries, StrategyError> {
        let c = &self.config;
        let closes = series.closes();
        let highs = series.highs();
        let lows = series.lows();
        let volumes = series.volumes();

        let volume_avg = Sma::new(c.volume_avg_period).calculate(&volumes);
        let offset = volumes.len() - volume_avg.len();
        let volume_ratio: Vec<f64> = volume_avg
            .iter()
            .zip(&volumes[offset..])
            .map(|(&avg, &v)| if avg == 0.0 { f64::NAN } else { v / avg })
            .collect();

        series.insert_column(
            "high_20",
            RollingMax::new(c.breakout_period).calculate(&highs),
        );
        series.insert_column("sma_50", Sma::new(c.sma_fast_period).calculate(&closes));
        series.insert_column("sma_200", Sma::new(c.sma_slow_period).calculate(&closes));
        series.insert_column("volume_avg", volume_avg);
        series.insert_column("volume_ratio", volume_ratio);
        series.insert_column(
            "atr",
            Atr::simple(c.atr_period).calculate_hlc(&highs, &lows, &closes),
        );
        series.insert_column(
            "adx",
            Adx::new(c.adx_period).calculate_hlc(&highs, &lows, &closes),
        );
        series.insert_column(
            "ema_10",
            Ema::from_first(c.ema_exit_period).calculate(&closes),
        );
        series.insert_column(
            "price_change_5d",
            PercentChange::new(c.chase_lookback).calculate(&closes),
        );

        Ok(series)
    }

    fn generate_signals(&self, mut series: BarSeries) -> Result<BarSeries, StrategyError> {
        let c = &self.config;
        let signals = {
            let high_20 = series.require_column("high_20")?;
            let sma_50 = series.require_column("sma_50")?;
            let sma_200 = series.require_column("sma_200")?;
            let volume_ratio = series.require_column("volume_ratio")?;
            let adx = series.require_column("adx")?;
            let change = series.require_column("price_change_5d")?;

            series
                .iter()
                .enumerate()
                .map(|(i, bar)| {
                    if i == 0 {
                        return Signal::Hold;
                    }
                    // NaN warm-up values fail every comparison
                    let breakout = bar.close > high_20[i - 1] * (1.0 + c.breakout_pct);
                    let strong_trend = adx[i] > c.adx_threshold;
                    let above_mas = bar.close > sma_50[i] && bar.close > sma_200[i];
                    let high_volume = volume_ratio[i] >= c.volume_multiplier;
                    let not_chasing = change[i].abs() <= c.chase_threshold;

                    if breakout && strong_trend && above_mas && high_volume && not_chasing {
                        Signal::Long
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
        _portfolio_value: f64,
        window: &SeriesWindow<'_>,
    ) -> Result<u64, StrategyError> {
        let c = &self.config;
        if price <= 0.0 || window.is_empty() {
            return Ok(0);
        }

        let atr = match window.last_value("atr") {
            Some(atr) if atr > 0.0 => atr,
            _ => return Ok((c.min_position_value / price).floor() as u64),
        };

        let mut shares = (c.risk_amount / (2.0 * atr)).floor();
        let value = shares * price;
        if value < c.min_position_value {
            shares = (c.min_position_value / price).floor();
        } else if value > c.max_position_value {
            shares = (c.max_position_value / price).floor();
        }

        Ok(shares.max(1.0) as u64)
    }

    fn check_exit_conditions(
        &mut self,
        ctx: &ExitContext<'_>,
        window: &SeriesWindow<'_>,
    ) -> Result<bool, StrategyError> {
        if window.is_empty() || ctx.side != Side::Long {
            return Ok(false);
        }

        let tracker = self.peaks.get_or_insert_with(ctx.symbol, || {
            TrailingStop::new(Side::Long, ctx.entry_price, 0.0)
        });
        tracker.observe(ctx.current_price);
        let peak = tracker.extreme;

        let profit_pct = ctx.profit_pct();
        if profit_pct >= self.config.profit_target_pct {
            debug!(symbol = ctx.symbol, profit_pct, "Profit target reached");
            return Ok(true);
        }
        if ctx.days_held > self.config.max_hold_days {
            return Ok(true);
        }
        if let Some(ema) = window.last_value("ema_10") {
            if ctx.current_price < ema {
                return Ok(true);
            }
        }

        let stop = self.stop_price(
            ctx.entry_price,
            profit_pct,
            peak,
            window.last_value("atr"),
        );
        Ok(ctx.current_price < stop)
    }

    fn open_position(&mut self, position: &Position) -> Result<(), StrategyError> {
        self.peaks.insert(
            &position.symbol,
            TrailingStop::new(Side::Long, position.entry_price, 0.0),
        );
        Ok(())
    }

    fn close_position(&mut self, symbol: &str) -> Result<(), StrategyError> {
        self.peaks.remove(symbol);
        Ok(())
    }
}
