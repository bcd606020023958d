//! Price level indicators: rolling extremes, VWAP, swing points and the
//! volume-profile point of control.
//!
//! Apart from the rolling extremes these return one value per input bar,
//! using NaN where no level exists yet.

use tradetest_core::traits::Indicator;

/// Highest value over the last `period` inputs.
#[derive(Debug, Clone)]
pub struct RollingMax {
    period: usize,
}

impl RollingMax {
    pub fn new(period: usize) -> Self {
        assert!(period > 0, "Period must be greater than 0");
        Self { period }
    }
}

impl Indicator for RollingMax {
    type Output = f64;

    fn calculate(&self, data: &[f64]) -> Vec<f64> {
        data.windows(self.period)
            .map(|w| w.iter().copied().fold(f64::NEG_INFINITY, f64::max))
            .collect()
    }

    fn period(&self) -> usize {
        self.period
    }

    fn name(&self) -> &str {
        "MAX"
    }
}

/// Lowest value over the last `period` inputs.
#[derive(Debug, Clone)]
pub struct RollingMin {
    period: usize,
}

impl RollingMin {
    pub fn new(period: usize) -> Self {
        assert!(period > 0, "Period must be greater than 0");
        Self { period }
    }
}

impl Indicator for RollingMin {
    type Output = f64;

    fn calculate(&self, data: &[f64]) -> Vec<f64> {
        data.windows(self.period)
            .map(|w| w.iter().copied().fold(f64::INFINITY, f64::min))
            .collect()
    }

    fn period(&self) -> usize {
        self.period
    }

    fn name(&self) -> &str {
        "MIN"
    }
}

/// Cumulative volume-weighted average of the typical price.
#[derive(Debug, Clone, Default)]
pub struct Vwap;

impl Vwap {
    pub fn new() -> Self {
        Self
    }

    pub fn calculate(&self, high: &[f64], low: &[f64], close: &[f64], volume: &[f64]) -> Vec<f64> {
        let len = high.len().min(low.len()).min(close.len()).min(volume.len());
        let mut pv = 0.0;
        let mut vol = 0.0;

        (0..len)
            .map(|i| {
                let typical = (high[i] + low[i] + close[i]) / 3.0;
                pv += typical * volume[i];
                vol += volume[i];
                if vol > 0.0 {
                    pv / vol
                } else {
                    f64::NAN
                }
            })
            .collect()
    }
}

/// Most recent confirmed swing levels, forward-filled.
#[derive(Debug, Clone, Default)]
pub struct SwingLevels {
    pub highs: Vec<f64>,
    pub lows: Vec<f64>,
}

/// Swing high/low detector.
///
/// A bar is a swing high when its high is the maximum of the `2 * lookback + 1`
/// bars centred on it. The level only becomes visible `lookback` bars later,
/// once the right-hand side of the window has printed.
#[derive(Debug, Clone)]
pub struct SwingPoints {
    lookback: usize,
}

impl SwingPoints {
    pub fn new(lookback: usize) -> Self {
        assert!(lookback > 0, "Lookback must be greater than 0");
        Self { lookback }
    }

    pub fn lookback(&self) -> usize {
        self.lookback
    }

    pub fn calculate(&self, high: &[f64], low: &[f64]) -> SwingLevels {
        let len = high.len().min(low.len());
        let lb = self.lookback;
        let mut levels = SwingLevels {
            highs: vec![f64::NAN; len],
            lows: vec![f64::NAN; len],
        };

        let mut last_high = f64::NAN;
        let mut last_low = f64::NAN;

        for i in 0..len {
            if i >= 2 * lb {
                let pivot = i - lb;
                let window = (i - 2 * lb)..=i;

                let max = high[window.clone()]
                    .iter()
                    .copied()
                    .fold(f64::NEG_INFINITY, f64::max);
                if high[pivot] == max {
                    last_high = high[pivot];
                }

                let min = low[window].iter().copied().fold(f64::INFINITY, f64::min);
                if low[pivot] == min {
                    last_low = low[pivot];
                }
            }
            levels.highs[i] = last_high;
            levels.lows[i] = last_low;
        }

        levels
    }
}

/// Volume-profile point of control.
///
/// For each bar, the `lookback` bars before it are bucketed by typical price
/// into equal-width bins between the window's lowest low and highest high.
/// The result is the midpoint of the bin carrying the most volume.
#[derive(Debug, Clone)]
pub struct PointOfControl {
    lookback: usize,
    edges: usize,
}

impl PointOfControl {
    pub fn new(lookback: usize) -> Self {
        assert!(lookback > 0, "Lookback must be greater than 0");
        Self { lookback, edges: 20 }
    }

    pub fn calculate(&self, high: &[f64], low: &[f64], close: &[f64], volume: &[f64]) -> Vec<f64> {
        let len = high.len().min(low.len()).min(close.len()).min(volume.len());
        (0..len)
            .map(|i| {
                if i < self.lookback {
                    return f64::NAN;
                }
                let range = (i - self.lookback)..i;
                self.profile(
                    &high[range.clone()],
                    &low[range.clone()],
                    &close[range.clone()],
                    &volume[range],
                )
            })
            .collect()
    }

    fn profile(&self, high: &[f64], low: &[f64], close: &[f64], volume: &[f64]) -> f64 {
        let lo = low.iter().copied().fold(f64::INFINITY, f64::min);
        let hi = high.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let total_volume: f64 = volume.iter().sum();
        let last_close = close.last().copied().unwrap_or(f64::NAN);

        if !(hi - lo > 0.0) || !(total_volume > 0.0) {
            return last_close;
        }

        let bins = self.edges - 1;
        let step = (hi - lo) / bins as f64;
        let edge = |k: usize| lo + step * k as f64;

        let mut bin_volume = vec![0.0; bins];
        for j in 0..high.len() {
            let typical = (high[j] + low[j] + close[j]) / 3.0;
            // Number of edges at or below the price, shifted to a bin index
            let above = (0..self.edges).take_while(|&k| edge(k) <= typical).count();
            let bin = above.saturating_sub(1).min(bins - 1);
            bin_volume[bin] += volume[j];
        }

        let mut max_bin = 0;
        for (k, &v) in bin_volume.iter().enumerate() {
            if v > bin_volume[max_bin] {
                max_bin = k;
            }
        }

        (edge(max_bin) + edge((max_bin + 1).min(self.edges - 1))) / 2.0
    }
}
