//! Momentum indicators.

use serde::{Deserialize, Serialize};
use tradetest_core::traits::{Indicator, MultiOutputIndicator};

use crate::moving_average::{wilder_smooth, Ema};

/// Relative Strength Index (RSI) with Wilder smoothing.
#[derive(Debug, Clone)]
pub struct Rsi {
    period: usize,
}

impl Rsi {
    pub fn new(period: usize) -> Self {
        assert!(period > 0, "Period must be greater than 0");
        Self { period }
    }
}

impl Indicator for Rsi {
    type Output = f64;

    fn calculate(&self, data: &[f64]) -> Vec<f64> {
        if data.len() <= self.period {
            return vec![];
        }

        let (gains, losses): (Vec<f64>, Vec<f64>) = data
            .windows(2)
            .map(|w| {
                let change = w[1] - w[0];
                (change.max(0.0), (-change).max(0.0))
            })
            .unzip();

        wilder_smooth(&gains, self.period)
            .into_iter()
            .zip(wilder_smooth(&losses, self.period))
            .map(|(gain, loss)| {
                if loss == 0.0 {
                    if gain == 0.0 {
                        50.0
                    } else {
                        100.0
                    }
                } else {
                    100.0 - 100.0 / (1.0 + gain / loss)
                }
            })
            .collect()
    }

    fn period(&self) -> usize {
        self.period + 1
    }

    fn name(&self) -> &str {
        "RSI"
    }
}

/// MACD output for one bar.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct MacdOutput {
    /// Fast EMA - slow EMA
    pub macd: f64,
    /// EMA of the MACD line
    pub signal: f64,
    /// MACD - signal
    pub histogram: f64,
}

/// Moving Average Convergence Divergence.
///
/// All three EMAs are seeded from their first input, so there is one output
/// per input bar.
#[derive(Debug, Clone)]
pub struct Macd {
    fast_period: usize,
    slow_period: usize,
    signal_period: usize,
}

impl Macd {
    /// Standard parameters (12, 26, 9).
    pub fn new() -> Self {
        Self::with_params(12, 26, 9)
    }

    pub fn with_params(fast_period: usize, slow_period: usize, signal_period: usize) -> Self {
        assert!(
            fast_period > 0 && slow_period > fast_period && signal_period > 0,
            "Invalid MACD periods"
        );
        Self {
            fast_period,
            slow_period,
            signal_period,
        }
    }
}

impl Default for Macd {
    fn default() -> Self {
        Self::new()
    }
}

impl MultiOutputIndicator for Macd {
    type Outputs = MacdOutput;

    fn calculate(&self, data: &[f64]) -> Vec<MacdOutput> {
        let fast = Ema::from_first(self.fast_period).calculate(data);
        let slow = Ema::from_first(self.slow_period).calculate(data);
        let line: Vec<f64> = fast.iter().zip(&slow).map(|(f, s)| f - s).collect();
        let signal = Ema::from_first(self.signal_period).calculate(&line);

        line.into_iter()
            .zip(signal)
            .map(|(macd, signal)| MacdOutput {
                macd,
                signal,
                histogram: macd - signal,
            })
            .collect()
    }

    fn period(&self) -> usize {
        1
    }

    fn name(&self) -> &str {
        "MACD"
    }
}

/// Fractional change over `periods` bars: `(x[i] - x[i - n]) / x[i - n]`.
#[derive(Debug, Clone)]
pub struct PercentChange {
    periods: usize,
}

impl PercentChange {
    pub fn new(periods: usize) -> Self {
        assert!(periods > 0, "Periods must be greater than 0");
        Self { periods }
    }
}

impl Indicator for PercentChange {
    type Output = f64;

    fn calculate(&self, data: &[f64]) -> Vec<f64> {
        data.windows(self.periods + 1)
            .map(|w| {
                let past = w[0];
                if past == 0.0 {
                    f64::NAN
                } else {
                    (w[self.periods] - past) / past
                }
            })
            .collect()
    }

    fn period(&self) -> usize {
        self.periods + 1
    }

    fn name(&self) -> &str {
        "PCT_CHANGE"
    }
}
