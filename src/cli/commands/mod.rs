//! CLI command implementations.

pub mod backtest;
pub mod batch;
pub mod strategies;
pub mod validate;

use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use tradetest_backtest::EngineConfig;
use tradetest_config::AppConfig;
use tradetest_core::types::{BarSeries, Timeframe};
use tradetest_data::{load_series, BarCache, CsvDataSource};

use crate::cli::DataArgs;

/// Market data access resolved from command line and configuration.
pub struct DataContext {
    source: CsvDataSource,
    cache: Option<BarCache>,
    timeframe: Timeframe,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
}

impl DataContext {
    pub fn new(args: &DataArgs, config: &AppConfig) -> Result<Self> {
        let source = CsvDataSource::new(&args.data)
            .with_context(|| format!("Data path '{}' does not exist", args.data.display()))?;

        let cache = if config.data.use_cache && !args.no_cache {
            let dir = &config.data.cache_dir;
            Some(
                BarCache::new(dir)
                    .with_context(|| format!("Failed to open cache at {}", dir.display()))?,
            )
        } else {
            None
        };

        let timeframe: Timeframe = args.timeframe.parse().map_err(anyhow::Error::msg)?;
        let start = parse_date(&args.start)?.and_time(NaiveTime::MIN).and_utc();
        let end = parse_date(&args.end)?
            .and_hms_opt(23, 59, 59)
            .context("Invalid end date")?
            .and_utc();
        if start > end {
            anyhow::bail!("Start date {} is after end date {}", args.start, args.end);
        }

        Ok(Self {
            source,
            cache,
            timeframe,
            start,
            end,
        })
    }

    pub async fn load(&mut self, symbol: &str) -> Result<BarSeries> {
        load_series(
            &self.source,
            self.cache.as_mut(),
            symbol,
            self.timeframe,
            self.start,
            self.end,
        )
        .await
        .with_context(|| format!("Failed to load data for {symbol}"))
    }
}

/// Configured engine settings with command line overrides applied.
pub fn engine_config(args: &DataArgs, config: &AppConfig) -> EngineConfig {
    let mut engine = config.backtest.clone();
    if let Some(capital) = args.capital {
        engine.initial_capital = capital;
    }
    if let Some(commission) = args.commission {
        engine.commission = commission;
    }
    engine
}

fn parse_date(value: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .with_context(|| format!("Invalid date '{value}', expected YYYY-MM-DD"))
}
