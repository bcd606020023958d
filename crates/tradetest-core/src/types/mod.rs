//! Core data types for the backtester.

mod ohlcv;
mod position;
mod signal;
mod timeframe;

pub use ohlcv::{Bar, BarSeries, SeriesWindow};
pub use position::{Position, Side, Trade};
pub use signal::Signal;
pub use timeframe::Timeframe;
