//! Indicator trait definitions.

use crate::error::IndicatorError;

/// Batch indicator over a single input column (typically closes).
///
/// Outputs are shorter than the input by the warm-up period; the last output
/// corresponds to the last input.
pub trait Indicator: Send + Sync {
    type Output;

    fn calculate(&self, data: &[f64]) -> Vec<Self::Output>;

    /// Minimum data points required for one output.
    fn period(&self) -> usize;

    fn name(&self) -> &str;

    fn validate_data(&self, data: &[f64]) -> Result<(), IndicatorError> {
        if data.len() < self.period() {
            return Err(IndicatorError::InsufficientData {
                required: self.period(),
                available: data.len(),
            });
        }
        Ok(())
    }
}

/// Indicator producing several related values per point (bands, MACD lines).
pub trait MultiOutputIndicator: Send + Sync {
    type Outputs;

    fn calculate(&self, data: &[f64]) -> Vec<Self::Outputs>;

    fn period(&self) -> usize;

    fn name(&self) -> &str;
}

/// Indicator computed from high, low and close columns (ATR, ADX).
pub trait HlcIndicator: Send + Sync {
    fn calculate_hlc(&self, high: &[f64], low: &[f64], close: &[f64]) -> Vec<f64>;

    fn period(&self) -> usize;

    fn name(&self) -> &str;
}

#[cfg(test)]
mod tests {
    use super::*;

    struct WindowSum {
        period: usize,
    }

    impl Indicator for WindowSum {
        type Output = f64;

        fn calculate(&self, data: &[f64]) -> Vec<f64> {
            data.windows(self.period).map(|w| w.iter().sum()).collect()
        }

        fn period(&self) -> usize {
            self.period
        }

        fn name(&self) -> &str {
            "sum"
        }
    }

    #[test]
    fn test_indicator_validation() {
        let indicator = WindowSum { period: 5 };

        assert!(indicator.validate_data(&[1.0, 2.0, 3.0]).is_err());
        assert!(indicator.validate_data(&[1.0, 2.0, 3.0, 4.0, 5.0]).is_ok());
        assert_eq!(indicator.calculate(&[1.0, 2.0, 3.0, 4.0, 5.0]), vec![15.0]);
    }
}
