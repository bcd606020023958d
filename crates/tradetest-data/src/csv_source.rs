//! CSV data source.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use csv::{ReaderBuilder, WriterBuilder};
use serde::{Deserialize, Serialize};
use tracing::debug;
use tradetest_core::error::DataError;
use tradetest_core::traits::DataSource;
use tradetest_core::types::{Bar, Timeframe};

/// CSV record format.
#[derive(Debug, Deserialize)]
struct CsvRecord {
    #[serde(
        alias = "Date",
        alias = "Datetime",
        alias = "datetime",
        alias = "timestamp",
        alias = "Timestamp"
    )]
    date: String,
    #[serde(alias = "Open")]
    open: f64,
    #[serde(alias = "High")]
    high: f64,
    #[serde(alias = "Low")]
    low: f64,
    #[serde(alias = "Close")]
    close: f64,
    #[serde(alias = "Volume", default)]
    volume: f64,
}

/// Row layout written by [`write_bars`].
#[derive(Debug, Serialize)]
struct CsvRow {
    date: String,
    open: f64,
    high: f64,
    low: f64,
    close: f64,
    volume: f64,
}

/// CSV data source for historical data.
///
/// Points either at a single file, which then serves every symbol, or at a
/// directory holding one file per symbol.
#[derive(Debug, Clone)]
pub struct CsvDataSource {
    path: PathBuf,
}

impl CsvDataSource {
    /// Create a new CSV data source.
    pub fn new(path: impl AsRef<Path>) -> Result<Self, DataError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(DataError::SymbolNotFound(path.display().to_string()));
        }
        Ok(Self {
            path: path.to_path_buf(),
        })
    }

    /// File holding the bars for `symbol`.
    ///
    /// In directory mode tries `{SYMBOL}.csv`, `{symbol}.csv` and
    /// `{SYMBOL}_daily.csv`, in that order.
    pub fn resolve(&self, symbol: &str) -> Result<PathBuf, DataError> {
        if self.path.is_file() {
            return Ok(self.path.clone());
        }

        let upper = symbol.to_uppercase();
        let candidates = [
            format!("{upper}.csv"),
            format!("{}.csv", symbol.to_lowercase()),
            format!("{upper}_daily.csv"),
        ];

        candidates
            .iter()
            .map(|name| self.path.join(name))
            .find(|p| p.is_file())
            .ok_or_else(|| DataError::SymbolNotFound(symbol.to_string()))
    }

    /// Load every bar for `symbol`, sorted oldest first.
    pub fn load_all(&self, symbol: &str) -> Result<Vec<Bar>, DataError> {
        let path = self.resolve(symbol)?;
        debug!(symbol, path = %path.display(), "Loading CSV bars");
        read_bars(&path)
    }
}

#[async_trait]
impl DataSource for CsvDataSource {
    async fn get_historical_bars(
        &self,
        symbol: &str,
        _timeframe: Timeframe,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Bar>, DataError> {
        let source = self.clone();
        let owned_symbol = symbol.to_string();
        let bars = tokio::task::spawn_blocking(move || source.load_all(&owned_symbol))
            .await
            .map_err(|e| DataError::Io(std::io::Error::other(e)))??;

        let bars: Vec<Bar> = bars
            .into_iter()
            .filter(|b| {
                let t = b.datetime();
                t >= start && t <= end
            })
            .collect();

        if bars.is_empty() {
            return Err(DataError::NoDataAvailable);
        }
        Ok(bars)
    }

    fn name(&self) -> &str {
        "csv"
    }
}

/// Read a bar file, sorted by timestamp.
pub(crate) fn read_bars(path: &Path) -> Result<Vec<Bar>, DataError> {
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(|e| DataError::ParseError(e.to_string()))?;

    let mut bars = Vec::new();

    for result in reader.deserialize() {
        let record: CsvRecord = result.map_err(|e| DataError::ParseError(e.to_string()))?;
        let timestamp = parse_timestamp(&record.date)?;

        bars.push(Bar::new(
            timestamp,
            record.open,
            record.high,
            record.low,
            record.close,
            record.volume,
        ));
    }

    bars.sort_by_key(|b| b.timestamp);

    Ok(bars)
}

/// Write bars with RFC 3339 dates in the layout [`read_bars`] accepts.
pub(crate) fn write_bars(path: &Path, bars: &[Bar]) -> Result<(), DataError> {
    let mut writer = WriterBuilder::new()
        .from_path(path)
        .map_err(|e| DataError::CacheError(e.to_string()))?;

    for bar in bars {
        writer
            .serialize(CsvRow {
                date: bar.datetime().to_rfc3339(),
                open: bar.open,
                high: bar.high,
                low: bar.low,
                close: bar.close,
                volume: bar.volume,
            })
            .map_err(|e| DataError::CacheError(e.to_string()))?;
    }

    writer.flush()?;
    Ok(())
}

/// Parse various timestamp formats into Unix milliseconds.
fn parse_timestamp(date_str: &str) -> Result<i64, DataError> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(date_str) {
        return Ok(dt.timestamp_millis());
    }
    // pandas writes tz-aware indexes as "2024-01-15 00:00:00-05:00"
    if let Ok(dt) = DateTime::parse_from_str(date_str, "%Y-%m-%d %H:%M:%S%:z") {
        return Ok(dt.timestamp_millis());
    }

    for format in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(date_str, format) {
            return Ok(dt.and_utc().timestamp_millis());
        }
    }

    for format in ["%Y-%m-%d", "%Y/%m/%d", "%m/%d/%Y", "%d-%m-%Y"] {
        if let Ok(d) = NaiveDate::parse_from_str(date_str, format) {
            return Ok(d.and_time(chrono::NaiveTime::MIN).and_utc().timestamp_millis());
        }
    }

    if let Ok(ts) = date_str.parse::<i64>() {
        // Assume milliseconds above 10 digits
        return Ok(if ts > 10_000_000_000 { ts } else { ts * 1000 });
    }

    Err(DataError::ParseError(format!(
        "Could not parse date: {}",
        date_str
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    const SAMPLE: &str = "\
Date,Open,High,Low,Close,Volume
2024-01-03,101,103,100,102,2000
2024-01-02,100,102,99,101,1000
2024-01-04,102,104,101,103,3000
";

    fn day(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
            .and_utc()
    }

    #[test]
    fn test_parse_timestamp() {
        let jan15 = day(2024, 1, 15).timestamp_millis();

        assert_eq!(parse_timestamp("2024-01-15").unwrap(), jan15);
        assert_eq!(parse_timestamp("01/15/2024").unwrap(), jan15);
        assert_eq!(parse_timestamp("2024-01-15T00:00:00+00:00").unwrap(), jan15);
        assert_eq!(
            parse_timestamp("2024-01-15 10:30:00").unwrap(),
            jan15 + 37_800_000
        );
        assert_eq!(
            parse_timestamp("2024-01-15 00:00:00-05:00").unwrap(),
            jan15 + 5 * 3_600_000
        );
        assert_eq!(parse_timestamp("1705312800000").unwrap(), 1_705_312_800_000); // Unix ms
        assert_eq!(parse_timestamp("1705312800").unwrap(), 1_705_312_800_000); // Unix sec
        assert!(parse_timestamp("yesterday").is_err());
    }

    #[test]
    fn test_read_sorts_and_accepts_lowercase_headers() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("x.csv");
        fs::write(&path, SAMPLE.to_lowercase()).unwrap();

        let bars = read_bars(&path).unwrap();
        assert_eq!(bars.len(), 3);
        assert!(bars.windows(2).all(|w| w[0].timestamp < w[1].timestamp));
        assert_eq!(bars[0].close, 101.0);
    }

    #[test]
    fn test_write_then_read_preserves_bars() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bars.csv");
        let bars = vec![
            Bar::new(0, 1.0, 2.0, 0.5, 1.5, 10.0),
            Bar::new(86_400_000, 1.5, 2.5, 1.0, 2.0, 20.0),
        ];

        write_bars(&path, &bars).unwrap();
        assert_eq!(read_bars(&path).unwrap(), bars);
    }

    #[test]
    fn test_directory_resolution() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("SPY.csv"), SAMPLE).unwrap();
        fs::write(dir.path().join("qqq.csv"), SAMPLE).unwrap();
        fs::write(dir.path().join("IWM_daily.csv"), SAMPLE).unwrap();

        let source = CsvDataSource::new(dir.path()).unwrap();
        assert!(source.resolve("spy").unwrap().ends_with("SPY.csv"));
        assert!(source.resolve("QQQ").unwrap().ends_with("qqq.csv"));
        assert!(source.resolve("IWM").unwrap().ends_with("IWM_daily.csv"));
        assert!(matches!(
            source.resolve("DIA"),
            Err(DataError::SymbolNotFound(_))
        ));
    }

    #[test]
    fn test_missing_path() {
        assert!(CsvDataSource::new("/definitely/not/here.csv").is_err());
    }

    #[tokio::test]
    async fn test_range_filter() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("AAPL.csv");
        fs::write(&path, SAMPLE).unwrap();
        let source = CsvDataSource::new(&path).unwrap();

        let bars = source
            .get_historical_bars("AAPL", Timeframe::Daily, day(2024, 1, 3), day(2024, 1, 4))
            .await
            .unwrap();
        assert_eq!(bars.len(), 2);
        assert_eq!(bars[0].datetime(), day(2024, 1, 3));

        let err = source
            .get_historical_bars("AAPL", Timeframe::Daily, day(2025, 1, 1), day(2025, 2, 1))
            .await
            .unwrap_err();
        assert!(matches!(err, DataError::NoDataAvailable));
    }
}
