//! Data caching.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use tracing::{debug, warn};
use tradetest_core::error::DataError;
use tradetest_core::types::{Bar, Timeframe};

use crate::csv_source::{read_bars, write_bars};

/// Bar cache: an in-memory map backed by one CSV file per request under
/// `cache_dir`, named `{symbol}_{start}_{end}_{interval}.csv`.
#[derive(Debug)]
pub struct BarCache {
    memory: HashMap<String, Vec<Bar>>,
    cache_dir: PathBuf,
}

impl BarCache {
    /// Create a new cache, creating `cache_dir` if needed.
    pub fn new(cache_dir: impl Into<PathBuf>) -> Result<Self, DataError> {
        let cache_dir = cache_dir.into();
        fs::create_dir_all(&cache_dir)?;
        Ok(Self {
            memory: HashMap::new(),
            cache_dir,
        })
    }

    /// Generate cache key.
    fn cache_key(
        symbol: &str,
        timeframe: Timeframe,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> String {
        format!(
            "{}_{}_{}_{}",
            symbol,
            start.date_naive(),
            end.date_naive(),
            timeframe
        )
    }

    /// Path of the cache file for a request.
    pub fn path_for(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> PathBuf {
        let key = Self::cache_key(symbol, timeframe, start, end);
        self.cache_dir.join(format!("{key}.csv"))
    }

    /// Get cached bars, from memory first and then from disk.
    ///
    /// An unreadable or empty cache file counts as a miss.
    pub fn get(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Option<Vec<Bar>> {
        let key = Self::cache_key(symbol, timeframe, start, end);
        if let Some(bars) = self.memory.get(&key) {
            return Some(bars.clone());
        }

        let path = self.path_for(symbol, timeframe, start, end);
        if !path.is_file() {
            return None;
        }

        match read_bars(&path) {
            Ok(bars) if !bars.is_empty() => {
                debug!(path = %path.display(), bars = bars.len(), "Cache hit");
                Some(bars)
            }
            Ok(_) => None,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Cache read failed, fetching fresh data");
                None
            }
        }
    }

    /// Store bars in memory and on disk.
    pub fn put(
        &mut self,
        symbol: &str,
        timeframe: Timeframe,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        bars: Vec<Bar>,
    ) -> Result<(), DataError> {
        let path = self.path_for(symbol, timeframe, start, end);
        let key = Self::cache_key(symbol, timeframe, start, end);

        // Memory keeps the bars even if the disk write fails
        let written = write_bars(&path, &bars);
        self.memory.insert(key, bars);
        written
    }

    /// Symbol part of a cache key. Dates and interval never contain `_`,
    /// so the symbol is everything before the last three separators.
    fn key_symbol(key: &str) -> Option<&str> {
        key.rsplitn(4, '_').nth(3)
    }

    /// Clear cache for a symbol. Returns the number of files removed.
    ///
    /// Only entries for exactly `symbol` go: clearing `BTC` keeps `BTC_USD`.
    pub fn clear(&mut self, symbol: &str) -> Result<usize, DataError> {
        self.memory.retain(|k, _| Self::key_symbol(k) != Some(symbol));
        self.remove_files(|name| {
            let key = name.strip_suffix(".csv").unwrap_or(name);
            Self::key_symbol(key) == Some(symbol)
        })
    }

    /// Clear all cached data. Returns the number of files removed.
    pub fn clear_all(&mut self) -> Result<usize, DataError> {
        self.memory.clear();
        self.remove_files(|_| true)
    }

    /// Get cache directory.
    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    fn remove_files(&self, matches: impl Fn(&str) -> bool) -> Result<usize, DataError> {
        let mut removed = 0;
        for entry in fs::read_dir(&self.cache_dir)? {
            let path = entry?.path();
            let is_csv = path.extension().is_some_and(|ext| ext == "csv");
            let name = path.file_name().and_then(|n| n.to_str()).unwrap_or_default();

            if is_csv && matches(name) {
                fs::remove_file(&path)?;
                removed += 1;
            }
        }
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bars() -> Vec<Bar> {
        vec![
            Bar::new(1_704_153_600_000, 100.0, 101.0, 99.0, 100.5, 1000.0),
            Bar::new(1_704_240_000_000, 100.5, 102.0, 100.0, 101.5, 1200.0),
        ]
    }

    fn range() -> (DateTime<Utc>, DateTime<Utc>) {
        (
            DateTime::from_timestamp_millis(1_704_067_200_000).unwrap(),
            DateTime::from_timestamp_millis(1_704_931_200_000).unwrap(),
        )
    }

    #[test]
    fn test_file_naming() {
        let dir = tempfile::tempdir().unwrap();
        let cache = BarCache::new(dir.path()).unwrap();
        let (start, end) = range();

        let path = cache.path_for("AAPL", Timeframe::Daily, start, end);
        assert_eq!(
            path.file_name().unwrap(),
            "AAPL_2024-01-01_2024-01-11_1d.csv"
        );
    }

    #[test]
    fn test_put_get_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let (start, end) = range();

        let mut cache = BarCache::new(dir.path()).unwrap();
        assert!(cache.get("AAPL", Timeframe::Daily, start, end).is_none());
        cache
            .put("AAPL", Timeframe::Daily, start, end, bars())
            .unwrap();

        // A fresh cache only sees the file
        let reopened = BarCache::new(dir.path()).unwrap();
        assert_eq!(
            reopened.get("AAPL", Timeframe::Daily, start, end).unwrap(),
            bars()
        );
        assert!(reopened.get("AAPL", Timeframe::Hour1, start, end).is_none());
    }

    #[test]
    fn test_corrupt_file_is_a_miss() {
        let dir = tempfile::tempdir().unwrap();
        let (start, end) = range();
        let cache = BarCache::new(dir.path()).unwrap();

        fs::write(
            cache.path_for("AAPL", Timeframe::Daily, start, end),
            "date,open\nnot-a-date,abc\n",
        )
        .unwrap();
        assert!(cache.get("AAPL", Timeframe::Daily, start, end).is_none());
    }

    #[test]
    fn test_clear_symbol_and_all() {
        let dir = tempfile::tempdir().unwrap();
        let (start, end) = range();
        let mut cache = BarCache::new(dir.path().join("nested")).unwrap();

        cache.put("AAPL", Timeframe::Daily, start, end, bars()).unwrap();
        cache.put("MSFT", Timeframe::Daily, start, end, bars()).unwrap();
        fs::write(cache.cache_dir().join("notes.txt"), "keep").unwrap();

        assert_eq!(cache.clear("AAPL").unwrap(), 1);
        assert!(cache.get("AAPL", Timeframe::Daily, start, end).is_none());
        assert!(cache.get("MSFT", Timeframe::Daily, start, end).is_some());

        assert_eq!(cache.clear_all().unwrap(), 1);
        assert!(cache.get("MSFT", Timeframe::Daily, start, end).is_none());
        assert!(cache.cache_dir().join("notes.txt").exists());
    }

    #[test]
    fn test_clear_matches_whole_symbol() {
        let dir = tempfile::tempdir().unwrap();
        let (start, end) = range();
        let mut cache = BarCache::new(dir.path()).unwrap();

        cache.put("BTC", Timeframe::Daily, start, end, bars()).unwrap();
        cache.put("BTC_USD", Timeframe::Daily, start, end, bars()).unwrap();
        cache.put("BTC_USD", Timeframe::Hour1, start, end, bars()).unwrap();

        assert_eq!(cache.clear("BTC").unwrap(), 1);
        assert!(cache.get("BTC", Timeframe::Daily, start, end).is_none());
        assert!(cache.get("BTC_USD", Timeframe::Daily, start, end).is_some());
        assert!(cache.path_for("BTC_USD", Timeframe::Hour1, start, end).is_file());

        // Underscored symbols clear as a whole too
        assert_eq!(cache.clear("BTC_USD").unwrap(), 2);
        assert!(cache.get("BTC_USD", Timeframe::Daily, start, end).is_none());
        assert_eq!(
            BarCache::key_symbol("BTC_USD_2024-01-01_2024-01-11_1d"),
            Some("BTC_USD")
        );
        assert_eq!(BarCache::key_symbol("notes"), None);
    }
}
