//! Core types and traits for the strategy backtester.
//!
//! This crate provides the foundational building blocks including:
//! - Market data types (Bar, BarSeries, SeriesWindow)
//! - Position and trade records
//! - Trading signals
//! - Core traits for strategies, indicators, and data sources

pub mod error;
pub mod traits;
pub mod types;

pub use error::{BacktestError, DataError, IndicatorError, StrategyError};
pub use traits::*;
pub use types::*;
