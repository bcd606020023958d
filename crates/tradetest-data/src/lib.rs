//! Data sources for the backtester.

mod cache;
mod csv_source;

pub use cache::BarCache;
pub use csv_source::CsvDataSource;

use chrono::{DateTime, Utc};
use tracing::{info, warn};
use tradetest_core::error::DataError;
use tradetest_core::traits::DataSource;
use tradetest_core::types::{BarSeries, Timeframe};

/// Fetch a bar series, going through `cache` when one is given.
///
/// Fresh data is written back to the cache; a failed cache write is logged
/// and does not fail the load.
pub async fn load_series(
    source: &dyn DataSource,
    cache: Option<&mut BarCache>,
    symbol: &str,
    timeframe: Timeframe,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> Result<BarSeries, DataError> {
    if let Some(bars) = cache
        .as_deref()
        .and_then(|c| c.get(symbol, timeframe, start, end))
    {
        return Ok(BarSeries::from_bars(symbol, timeframe, bars));
    }

    let bars = source
        .get_historical_bars(symbol, timeframe, start, end)
        .await?;
    info!(
        symbol,
        source = source.name(),
        bars = bars.len(),
        "Loaded historical bars"
    );

    if let Some(cache) = cache {
        if let Err(e) = cache.put(symbol, timeframe, start, end, bars.clone()) {
            warn!(symbol, error = %e, "Cache write failed");
        }
    }

    Ok(BarSeries::from_bars(symbol, timeframe, bars))
}
