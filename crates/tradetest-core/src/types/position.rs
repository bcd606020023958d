//! Position and trade records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Direction of a position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Side {
    Long,
    Short,
}

impl Side {
    /// Per-unit price move in this side's favour.
    #[inline]
    pub fn price_delta(&self, entry_price: f64, price: f64) -> f64 {
        match self {
            Side::Long => price - entry_price,
            Side::Short => entry_price - price,
        }
    }

    pub fn is_long(&self) -> bool {
        matches!(self, Side::Long)
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Long => f.write_str("LONG"),
            Side::Short => f.write_str("SHORT"),
        }
    }
}

/// The single open position of a run.
///
/// Only margin (`size * entry_price / leverage`) is taken out of cash on
/// entry; leverage scales the P&L of the full notional.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub symbol: String,
    pub side: Side,
    pub entry_price: f64,
    /// Unix milliseconds of the entry bar
    pub entry_timestamp: i64,
    /// Quantity, always positive while open
    pub size: u64,
    /// Margin multiplier, >= 1.0
    pub leverage: f64,
}

impl Position {
    pub fn new(
        symbol: impl Into<String>,
        side: Side,
        entry_price: f64,
        entry_timestamp: i64,
        size: u64,
        leverage: f64,
    ) -> Self {
        Self {
            symbol: symbol.into(),
            side,
            entry_price,
            entry_timestamp,
            size,
            leverage,
        }
    }

    pub fn entry_datetime(&self) -> DateTime<Utc> {
        DateTime::from_timestamp_millis(self.entry_timestamp).unwrap_or_default()
    }

    /// Capital committed at entry.
    pub fn margin(&self) -> f64 {
        (self.size as f64 * self.entry_price) / self.leverage
    }

    /// Notional value at a given price.
    pub fn notional(&self, price: f64) -> f64 {
        self.size as f64 * price
    }

    /// Leveraged P&L if the position were closed at `price`, before commission.
    pub fn leveraged_pnl(&self, price: f64) -> f64 {
        self.side.price_delta(self.entry_price, price) * self.size as f64 * self.leverage
    }

    /// Mark-to-market value of the position: committed margin plus unrealized P&L.
    pub fn market_value(&self, price: f64) -> f64 {
        self.margin() + self.leveraged_pnl(price)
    }

    /// Whole days between the entry and a later timestamp.
    pub fn days_held(&self, timestamp: i64) -> i64 {
        let exit = DateTime::from_timestamp_millis(timestamp).unwrap_or_default();
        (exit - self.entry_datetime()).num_days()
    }
}

/// A closed round trip. Immutable once recorded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trade {
    pub entry_date: DateTime<Utc>,
    pub exit_date: DateTime<Utc>,
    #[serde(rename = "type")]
    pub side: Side,
    pub entry_price: f64,
    pub exit_price: f64,
    pub size: u64,
    pub leverage: f64,
    /// Leveraged P&L net of exit commission
    pub pnl: f64,
    /// `pnl` as a percentage of the margin used
    pub pnl_pct: f64,
    pub days_held: i64,
}

impl Trade {
    /// Record the close of `position` at `exit_price`.
    pub fn from_close(
        position: &Position,
        exit_timestamp: i64,
        exit_price: f64,
        exit_commission: f64,
    ) -> Self {
        let margin = position.margin();
        let pnl = position.leveraged_pnl(exit_price) - exit_commission;
        let pnl_pct = if margin > 0.0 {
            (pnl / margin) * 100.0
        } else {
            0.0
        };

        Self {
            entry_date: position.entry_datetime(),
            exit_date: DateTime::from_timestamp_millis(exit_timestamp).unwrap_or_default(),
            side: position.side,
            entry_price: position.entry_price,
            exit_price,
            size: position.size,
            leverage: position.leverage,
            pnl,
            pnl_pct,
            days_held: position.days_held(exit_timestamp),
        }
    }

    pub fn is_win(&self) -> bool {
        self.pnl > 0.0
    }
}
