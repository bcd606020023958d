//! OHLCV (Open, High, Low, Close, Volume) data types.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::{Signal, Timeframe};
use crate::error::StrategyError;

/// A single OHLCV observation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    /// Unix timestamp in milliseconds
    pub timestamp: i64,
    /// Opening price
    pub open: f64,
    /// Highest price
    pub high: f64,
    /// Lowest price
    pub low: f64,
    /// Closing price
    pub close: f64,
    /// Trading volume
    pub volume: f64,
}

impl Bar {
    /// Create a new bar.
    pub fn new(timestamp: i64, open: f64, high: f64, low: f64, close: f64, volume: f64) -> Self {
        Self {
            timestamp,
            open,
            high,
            low,
            close,
            volume,
        }
    }

    /// Typical price (HLC average).
    #[inline]
    pub fn typical_price(&self) -> f64 {
        (self.high + self.low + self.close) / 3.0
    }

    /// Distance from the lower of open/close down to the low.
    #[inline]
    pub fn lower_wick(&self) -> f64 {
        self.open.min(self.close) - self.low
    }

    /// Distance from the high down to the higher of open/close.
    #[inline]
    pub fn upper_wick(&self) -> f64 {
        self.high - self.open.max(self.close)
    }

    /// Check if the bar is bullish (close > open).
    #[inline]
    pub fn is_bullish(&self) -> bool {
        self.close > self.open
    }

    /// Check if the bar is bearish (close < open).
    #[inline]
    pub fn is_bearish(&self) -> bool {
        self.close < self.open
    }

    /// The timestamp as a UTC datetime. Out-of-range timestamps map to the epoch.
    pub fn datetime(&self) -> DateTime<Utc> {
        DateTime::from_timestamp_millis(self.timestamp).unwrap_or_default()
    }

    /// Calendar date of the bar (UTC).
    pub fn date(&self) -> NaiveDate {
        self.datetime().date_naive()
    }

    /// True range against the previous close.
    pub fn true_range(&self, prev_close: Option<f64>) -> f64 {
        match prev_close {
            Some(pc) => {
                let hl = self.high - self.low;
                let hc = (self.high - pc).abs();
                let lc = (self.low - pc).abs();
                hl.max(hc).max(lc)
            }
            None => self.high - self.low,
        }
    }
}

/// Ordered bar sequence plus the derived columns and signals a strategy
/// attaches to it.
///
/// Bars are kept in the order given. Callers guarantee strictly increasing
/// timestamps; nothing in here re-sorts.
#[derive(Debug, Clone, Default)]
pub struct BarSeries {
    /// Symbol identifier
    pub symbol: String,
    /// Timeframe of the bars
    pub timeframe: Timeframe,
    bars: Vec<Bar>,
    columns: BTreeMap<String, Vec<f64>>,
    signals: Option<Vec<Signal>>,
}

impl BarSeries {
    /// Create a new empty bar series.
    pub fn new(symbol: impl Into<String>, timeframe: Timeframe) -> Self {
        Self {
            symbol: symbol.into(),
            timeframe,
            ..Default::default()
        }
    }

    /// Create a series from already ordered bars.
    pub fn from_bars(symbol: impl Into<String>, timeframe: Timeframe, bars: Vec<Bar>) -> Self {
        Self {
            symbol: symbol.into(),
            timeframe,
            bars,
            ..Default::default()
        }
    }

    /// Append a bar. Existing derived columns are extended with `NaN`.
    pub fn push(&mut self, bar: Bar) {
        self.bars.push(bar);
        for values in self.columns.values_mut() {
            values.push(f64::NAN);
        }
        if let Some(signals) = self.signals.as_mut() {
            signals.push(Signal::Hold);
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.bars.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    pub fn bars(&self) -> &[Bar] {
        &self.bars
    }

    /// Get a bar by index (0 = oldest).
    pub fn get(&self, index: usize) -> Option<&Bar> {
        self.bars.get(index)
    }

    pub fn first(&self) -> Option<&Bar> {
        self.bars.first()
    }

    pub fn last(&self) -> Option<&Bar> {
        self.bars.last()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Bar> {
        self.bars.iter()
    }

    /// Whether timestamps are strictly increasing.
    pub fn is_chronological(&self) -> bool {
        self.bars.windows(2).all(|w| w[0].timestamp < w[1].timestamp)
    }

    pub fn closes(&self) -> Vec<f64> {
        self.bars.iter().map(|b| b.close).collect()
    }

    pub fn opens(&self) -> Vec<f64> {
        self.bars.iter().map(|b| b.open).collect()
    }

    pub fn highs(&self) -> Vec<f64> {
        self.bars.iter().map(|b| b.high).collect()
    }

    pub fn lows(&self) -> Vec<f64> {
        self.bars.iter().map(|b| b.low).collect()
    }

    pub fn volumes(&self) -> Vec<f64> {
        self.bars.iter().map(|b| b.volume).collect()
    }

    /// Attach a derived column.
    ///
    /// Indicator outputs are usually shorter than the series because of their
    /// warm-up period; they are right-aligned so the last value lines up with
    /// the last bar, and the head is filled with `NaN`. Extra leading values
    /// beyond the series length are dropped.
    pub fn insert_column(&mut self, name: impl Into<String>, values: Vec<f64>) {
        let len = self.bars.len();
        let aligned = if values.len() >= len {
            values[values.len() - len..].to_vec()
        } else {
            let mut padded = vec![f64::NAN; len - values.len()];
            padded.extend(values);
            padded
        };
        self.columns.insert(name.into(), aligned);
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.columns.contains_key(name)
    }

    pub fn column(&self, name: &str) -> Option<&[f64]> {
        self.columns.get(name).map(Vec::as_slice)
    }

    /// Like [`column`](Self::column) but reports a missing column as an error.
    pub fn require_column(&self, name: &str) -> Result<&[f64], StrategyError> {
        self.column(name)
            .ok_or_else(|| StrategyError::MissingColumn(name.to_string()))
    }

    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.keys().map(String::as_str)
    }

    /// Value of a column at an index, `None` if missing, out of range or `NaN`.
    pub fn value(&self, name: &str, index: usize) -> Option<f64> {
        self.columns
            .get(name)
            .and_then(|values| values.get(index))
            .copied()
            .filter(|v| !v.is_nan())
    }

    /// Attach per-bar signals. The length must match the bar count.
    pub fn set_signals(&mut self, signals: Vec<Signal>) -> Result<(), StrategyError> {
        if signals.len() != self.bars.len() {
            return Err(StrategyError::ContractViolation(format!(
                "{} signals for {} bars",
                signals.len(),
                self.bars.len()
            )));
        }
        self.signals = Some(signals);
        Ok(())
    }

    pub fn signals(&self) -> Option<&[Signal]> {
        self.signals.as_deref()
    }

    /// Signal at an index; `Hold` when no signals were generated.
    pub fn signal(&self, index: usize) -> Signal {
        self.signals
            .as_ref()
            .and_then(|s| s.get(index))
            .copied()
            .unwrap_or_default()
    }

    /// View of bars `0..=index`.
    pub fn window(&self, index: usize) -> SeriesWindow<'_> {
        SeriesWindow {
            series: self,
            end: (index + 1).min(self.bars.len()),
        }
    }
}

impl FromIterator<Bar> for BarSeries {
    fn from_iter<T: IntoIterator<Item = Bar>>(iter: T) -> Self {
        Self::from_bars(String::new(), Timeframe::Daily, iter.into_iter().collect())
    }
}

/// Read-only view of a series up to and including the current bar.
///
/// Handed to the per-bar strategy hooks; later bars are not reachable
/// through it.
#[derive(Debug, Clone, Copy)]
pub struct SeriesWindow<'a> {
    series: &'a BarSeries,
    end: usize,
}

impl<'a> SeriesWindow<'a> {
    pub fn symbol(&self) -> &'a str {
        &self.series.symbol
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.end
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.end == 0
    }

    pub fn bars(&self) -> &'a [Bar] {
        &self.series.bars[..self.end]
    }

    /// The current bar.
    pub fn last(&self) -> Option<&'a Bar> {
        self.bars().last()
    }

    pub fn column(&self, name: &str) -> Option<&'a [f64]> {
        self.series.column(name).map(|values| &values[..self.end])
    }

    /// Column value at the current bar, `None` if missing or `NaN`.
    pub fn last_value(&self, name: &str) -> Option<f64> {
        self.end
            .checked_sub(1)
            .and_then(|index| self.series.value(name, index))
    }

    pub fn closes(&self) -> Vec<f64> {
        self.bars().iter().map(|b| b.close).collect()
    }
}
