//! Trend strength indicators.

use tradetest_core::traits::HlcIndicator;

use crate::moving_average::wilder_smooth;

/// Average Directional Index (Wilder).
///
/// Needs `2 * period` bars for its first value: `period` smoothed
/// directional movements, then `period` DX values smoothed again.
#[derive(Debug, Clone)]
pub struct Adx {
    period: usize,
}

impl Adx {
    pub fn new(period: usize) -> Self {
        assert!(period > 0, "Period must be greater than 0");
        Self { period }
    }
}

impl HlcIndicator for Adx {
    fn calculate_hlc(&self, high: &[f64], low: &[f64], close: &[f64]) -> Vec<f64> {
        let len = high.len().min(low.len()).min(close.len());
        if len < self.period * 2 {
            return vec![];
        }

        let mut plus_dm = Vec::with_capacity(len - 1);
        let mut minus_dm = Vec::with_capacity(len - 1);
        let mut tr = Vec::with_capacity(len - 1);

        for i in 1..len {
            let up = high[i] - high[i - 1];
            let down = low[i - 1] - low[i];
            plus_dm.push(if up > down && up > 0.0 { up } else { 0.0 });
            minus_dm.push(if down > up && down > 0.0 { down } else { 0.0 });

            let hl = high[i] - low[i];
            let hc = (high[i] - close[i - 1]).abs();
            let lc = (low[i] - close[i - 1]).abs();
            tr.push(hl.max(hc).max(lc));
        }

        let tr = wilder_smooth(&tr, self.period);
        let plus = wilder_smooth(&plus_dm, self.period);
        let minus = wilder_smooth(&minus_dm, self.period);

        let dx: Vec<f64> = tr
            .iter()
            .zip(plus.iter().zip(&minus))
            .map(|(&atr, (&p, &m))| {
                if atr == 0.0 {
                    return 0.0;
                }
                let plus_di = 100.0 * p / atr;
                let minus_di = 100.0 * m / atr;
                let sum = plus_di + minus_di;
                if sum == 0.0 {
                    0.0
                } else {
                    100.0 * (plus_di - minus_di).abs() / sum
                }
            })
            .collect();

        wilder_smooth(&dx, self.period)
    }

    fn period(&self) -> usize {
        self.period * 2
    }

    fn name(&self) -> &str {
        "ADX"
    }
}
