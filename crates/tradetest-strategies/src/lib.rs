//! Trading strategy implementations.
//!
//! Bundled strategies:
//! - RSI mean reversion with a trend filter
//! - Momentum breakout (long only)
//! - The Banker Ratchet, a leveraged liquidity-grab strategy
//!
//! Strategies are looked up by identifier through [`StrategyRegistry`].

mod banker_ratchet;
mod momentum_breakout;
mod registry;
mod rsi_mean_reversion;
pub mod stops;

pub use banker_ratchet::{BankerRatchetConfig, BankerRatchetStrategy};
pub use momentum_breakout::{MomentumBreakoutConfig, MomentumBreakoutStrategy};
pub use registry::{StrategyInfo, StrategyRegistry};
pub use rsi_mean_reversion::{RsiMeanReversionConfig, RsiMeanReversionStrategy};
pub use stops::{StopBook, TrailingStop};
