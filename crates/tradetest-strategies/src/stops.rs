//! Per-symbol stop tracking for open positions.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tradetest_core::types::Side;

/// Stop state for one open position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrailingStop {
    pub side: Side,
    pub entry_price: f64,
    pub stop_price: f64,
    /// Most favourable price seen since entry: highest for longs, lowest for shorts
    pub extreme: f64,
    /// Whether the stop has left its initial level
    pub activated: bool,
}

impl TrailingStop {
    /// Stop placed `initial_stop_pct` against the entry.
    pub fn new(side: Side, entry_price: f64, initial_stop_pct: f64) -> Self {
        let stop_price = match side {
            Side::Long => entry_price * (1.0 - initial_stop_pct),
            Side::Short => entry_price * (1.0 + initial_stop_pct),
        };
        Self {
            side,
            entry_price,
            stop_price,
            extreme: entry_price,
            activated: false,
        }
    }

    /// Record a new price, extending the favourable extreme.
    pub fn observe(&mut self, price: f64) {
        self.extreme = match self.side {
            Side::Long => self.extreme.max(price),
            Side::Short => self.extreme.min(price),
        };
    }

    pub fn profit_pct(&self, price: f64) -> f64 {
        if self.entry_price == 0.0 {
            return 0.0;
        }
        self.side.price_delta(self.entry_price, price) / self.entry_price
    }

    /// Whether `price` has reached the stop.
    pub fn is_hit(&self, price: f64) -> bool {
        match self.side {
            Side::Long => price <= self.stop_price,
            Side::Short => price >= self.stop_price,
        }
    }

    /// Ratchet update: once profit reaches `activation_pct` the stop moves
    /// to breakeven and from then on trails `trail_pct` behind the extreme.
    /// Returns whether the stop is hit at `price`.
    pub fn ratchet(&mut self, price: f64, activation_pct: f64, trail_pct: f64) -> bool {
        self.observe(price);

        if !self.activated && self.profit_pct(price) >= activation_pct {
            self.activated = true;
            self.stop_price = self.entry_price;
        }

        if self.activated {
            self.stop_price = match self.side {
                Side::Long => self.extreme * (1.0 - trail_pct),
                Side::Short => self.extreme * (1.0 + trail_pct),
            };
        }

        self.is_hit(price)
    }
}

/// Stops keyed by symbol.
#[derive(Debug, Clone, Default)]
pub struct StopBook {
    stops: BTreeMap<String, TrailingStop>,
}

impl StopBook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Existing stop for `symbol`, or a new one from `init`.
    pub fn get_or_insert_with(
        &mut self,
        symbol: &str,
        init: impl FnOnce() -> TrailingStop,
    ) -> &mut TrailingStop {
        self.stops.entry(symbol.to_string()).or_insert_with(init)
    }

    pub fn insert(&mut self, symbol: &str, stop: TrailingStop) {
        self.stops.insert(symbol.to_string(), stop);
    }

    pub fn get(&self, symbol: &str) -> Option<&TrailingStop> {
        self.stops.get(symbol)
    }

    pub fn remove(&mut self, symbol: &str) -> Option<TrailingStop> {
        self.stops.remove(symbol)
    }

    pub fn contains(&self, symbol: &str) -> bool {
        self.stops.contains_key(symbol)
    }

    pub fn len(&self) -> usize {
        self.stops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stops.is_empty()
    }
}
