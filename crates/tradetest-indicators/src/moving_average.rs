//! Moving average indicators.

use tradetest_core::traits::Indicator;

/// Simple Moving Average (SMA).
#[derive(Debug, Clone)]
pub struct Sma {
    period: usize,
}

impl Sma {
    pub fn new(period: usize) -> Self {
        assert!(period > 0, "Period must be greater than 0");
        Self { period }
    }
}

impl Indicator for Sma {
    type Output = f64;

    fn calculate(&self, data: &[f64]) -> Vec<f64> {
        if data.len() < self.period {
            return vec![];
        }

        let period = self.period as f64;
        let mut result = Vec::with_capacity(data.len() - self.period + 1);
        let mut sum: f64 = data[..self.period].iter().sum();
        result.push(sum / period);

        for i in self.period..data.len() {
            sum += data[i] - data[i - self.period];
            result.push(sum / period);
        }

        result
    }

    fn period(&self) -> usize {
        self.period
    }

    fn name(&self) -> &str {
        "SMA"
    }
}

/// How the first EMA value is obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EmaSeed {
    /// SMA of the first `period` values; output starts at index `period - 1`.
    Sma,
    /// The first value itself; output covers every input.
    First,
}

/// Exponential Moving Average (EMA) with multiplier `2 / (period + 1)`.
#[derive(Debug, Clone)]
pub struct Ema {
    period: usize,
    multiplier: f64,
    seed: EmaSeed,
}

impl Ema {
    /// EMA seeded with the SMA of the first `period` values.
    pub fn new(period: usize) -> Self {
        assert!(period > 0, "Period must be greater than 0");
        Self {
            period,
            multiplier: 2.0 / (period as f64 + 1.0),
            seed: EmaSeed::Sma,
        }
    }

    /// EMA seeded with the first value, producing one output per input.
    pub fn from_first(period: usize) -> Self {
        Self {
            seed: EmaSeed::First,
            ..Self::new(period)
        }
    }

    fn smooth(&self, start: f64, rest: &[f64], out: &mut Vec<f64>) {
        let mut ema = start;
        out.push(ema);
        for &value in rest {
            ema = value * self.multiplier + ema * (1.0 - self.multiplier);
            out.push(ema);
        }
    }
}

impl Indicator for Ema {
    type Output = f64;

    fn calculate(&self, data: &[f64]) -> Vec<f64> {
        let mut result = Vec::with_capacity(data.len());
        match self.seed {
            EmaSeed::First => {
                if let Some((&first, rest)) = data.split_first() {
                    self.smooth(first, rest, &mut result);
                }
            }
            EmaSeed::Sma => {
                if data.len() >= self.period {
                    let seed = data[..self.period].iter().sum::<f64>() / self.period as f64;
                    self.smooth(seed, &data[self.period..], &mut result);
                }
            }
        }
        result
    }

    fn period(&self) -> usize {
        match self.seed {
            EmaSeed::Sma => self.period,
            EmaSeed::First => 1,
        }
    }

    fn name(&self) -> &str {
        "EMA"
    }
}

/// Wilder smoothing: SMA seed, then `avg = (avg * (n - 1) + x) / n`.
pub(crate) fn wilder_smooth(values: &[f64], period: usize) -> Vec<f64> {
    if period == 0 || values.len() < period {
        return vec![];
    }

    let n = period as f64;
    let mut result = Vec::with_capacity(values.len() - period + 1);
    let mut avg = values[..period].iter().sum::<f64>() / n;
    result.push(avg);

    for &value in &values[period..] {
        avg = (avg * (n - 1.0) + value) / n;
        result.push(avg);
    }

    result
}
