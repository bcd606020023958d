//! Volatility indicators.

use serde::{Deserialize, Serialize};
use tradetest_core::traits::{HlcIndicator, Indicator, MultiOutputIndicator};
use tradetest_core::types::Bar;

use crate::moving_average::{wilder_smooth, Sma};

/// Rolling standard deviation.
#[derive(Debug, Clone)]
pub struct StdDev {
    period: usize,
    /// Divide by `n - 1` instead of `n`
    sample: bool,
}

impl StdDev {
    /// Population standard deviation.
    pub fn new(period: usize) -> Self {
        assert!(period > 1, "Period must be greater than 1");
        Self {
            period,
            sample: false,
        }
    }

    /// Sample standard deviation (Bessel corrected).
    pub fn sample(period: usize) -> Self {
        Self {
            sample: true,
            ..Self::new(period)
        }
    }
}

impl Indicator for StdDev {
    type Output = f64;

    fn calculate(&self, data: &[f64]) -> Vec<f64> {
        let n = self.period as f64;
        let divisor = if self.sample { n - 1.0 } else { n };

        data.windows(self.period)
            .map(|window| {
                let mean = window.iter().sum::<f64>() / n;
                let ss: f64 = window.iter().map(|x| (x - mean).powi(2)).sum();
                (ss / divisor).sqrt()
            })
            .collect()
    }

    fn period(&self) -> usize {
        self.period
    }

    fn name(&self) -> &str {
        "StdDev"
    }
}

/// Average True Range.
///
/// The first true range is the bar's own high-low range; later ones include
/// the gap from the previous close.
#[derive(Debug, Clone)]
pub struct Atr {
    period: usize,
    wilder: bool,
}

impl Atr {
    /// ATR with Wilder smoothing.
    pub fn new(period: usize) -> Self {
        assert!(period > 0, "Period must be greater than 0");
        Self {
            period,
            wilder: true,
        }
    }

    /// ATR as a plain rolling mean of true range.
    pub fn simple(period: usize) -> Self {
        Self {
            wilder: false,
            ..Self::new(period)
        }
    }

    fn true_ranges(high: &[f64], low: &[f64], close: &[f64]) -> Vec<f64> {
        let len = high.len().min(low.len()).min(close.len());
        (0..len)
            .map(|i| {
                let bar = Bar::new(0, 0.0, high[i], low[i], close[i], 0.0);
                bar.true_range(i.checked_sub(1).map(|p| close[p]))
            })
            .collect()
    }
}

impl HlcIndicator for Atr {
    fn calculate_hlc(&self, high: &[f64], low: &[f64], close: &[f64]) -> Vec<f64> {
        let tr = Self::true_ranges(high, low, close);
        if self.wilder {
            wilder_smooth(&tr, self.period)
        } else {
            Sma::new(self.period).calculate(&tr)
        }
    }

    fn period(&self) -> usize {
        self.period
    }

    fn name(&self) -> &str {
        "ATR"
    }
}

/// Bollinger Bands output for one bar.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct BollingerOutput {
    pub upper: f64,
    /// SMA
    pub middle: f64,
    pub lower: f64,
    /// (upper - lower) / middle
    pub bandwidth: f64,
}

/// Bollinger Bands: SMA +/- k sample standard deviations.
#[derive(Debug, Clone)]
pub struct BollingerBands {
    period: usize,
    std_dev_multiplier: f64,
}

impl BollingerBands {
    /// Standard parameters (20, 2.0).
    pub fn new() -> Self {
        Self::with_params(20, 2.0)
    }

    pub fn with_params(period: usize, std_dev_multiplier: f64) -> Self {
        assert!(period > 1, "Period must be greater than 1");
        assert!(
            std_dev_multiplier > 0.0,
            "Std dev multiplier must be positive"
        );
        Self {
            period,
            std_dev_multiplier,
        }
    }
}

impl Default for BollingerBands {
    fn default() -> Self {
        Self::new()
    }
}

impl MultiOutputIndicator for BollingerBands {
    type Outputs = BollingerOutput;

    fn calculate(&self, data: &[f64]) -> Vec<BollingerOutput> {
        let middle = Sma::new(self.period).calculate(data);
        let std = StdDev::sample(self.period).calculate(data);

        middle
            .into_iter()
            .zip(std)
            .map(|(middle, sd)| {
                let upper = middle + sd * self.std_dev_multiplier;
                let lower = middle - sd * self.std_dev_multiplier;
                let bandwidth = if middle != 0.0 {
                    (upper - lower) / middle
                } else {
                    0.0
                };
                BollingerOutput {
                    upper,
                    middle,
                    lower,
                    bandwidth,
                }
            })
            .collect()
    }

    fn period(&self) -> usize {
        self.period
    }

    fn name(&self) -> &str {
        "BB"
    }
}
