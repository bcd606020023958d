//! Technical indicators.
//!
//! Batch implementations over `f64` slices:
//! - Moving averages (SMA, EMA)
//! - Momentum (RSI, MACD, percent change)
//! - Volatility (standard deviation, Bollinger Bands, ATR)
//! - Trend strength (ADX)
//! - Price levels (rolling extremes, VWAP, swing points, volume-profile POC)
//!
//! Outputs skip the warm-up period, so they are shorter than the input unless
//! documented otherwise. `BarSeries::insert_column` right-aligns them.

pub mod levels;
pub mod momentum;
pub mod moving_average;
pub mod trend;
pub mod volatility;

pub use levels::{PointOfControl, RollingMax, RollingMin, SwingPoints, Vwap};
pub use momentum::{Macd, MacdOutput, PercentChange, Rsi};
pub use moving_average::{Ema, Sma};
pub use trend::Adx;
pub use volatility::{Atr, BollingerBands, BollingerOutput, StdDev};
