//! Data source trait definitions.

use crate::error::DataError;
use crate::types::{Bar, Timeframe};
use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// Supplier of historical bars.
#[async_trait]
pub trait DataSource: Send + Sync {
    /// Fetch historical bars for `[start, end]`, ordered oldest to newest.
    async fn get_historical_bars(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Bar>, DataError>;

    fn name(&self) -> &str;
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Fixed(Vec<Bar>);

    #[async_trait]
    impl DataSource for Fixed {
        async fn get_historical_bars(
            &self,
            _symbol: &str,
            _timeframe: Timeframe,
            start: DateTime<Utc>,
            end: DateTime<Utc>,
        ) -> Result<Vec<Bar>, DataError> {
            let bars: Vec<Bar> = self
                .0
                .iter()
                .filter(|b| b.datetime() >= start && b.datetime() <= end)
                .copied()
                .collect();
            if bars.is_empty() {
                return Err(DataError::NoDataAvailable);
            }
            Ok(bars)
        }

        fn name(&self) -> &str {
            "fixed"
        }
    }

    #[tokio::test]
    async fn test_range_filtering() {
        let source = Fixed(vec![
            Bar::new(0, 1.0, 1.0, 1.0, 1.0, 0.0),
            Bar::new(86_400_000, 2.0, 2.0, 2.0, 2.0, 0.0),
        ]);
        let start = DateTime::from_timestamp_millis(1).unwrap();
        let end = DateTime::from_timestamp_millis(86_400_000).unwrap();

        let bars = source
            .get_historical_bars("X", Timeframe::Daily, start, end)
            .await
            .unwrap();
        assert_eq!(bars.len(), 1);
        assert_eq!(source.name(), "fixed");
    }
}
