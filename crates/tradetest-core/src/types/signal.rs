//! Per-bar entry signals.

use serde::{Deserialize, Serialize};

use super::Side;

/// Entry signal attached to a bar by a strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(into = "i8", from = "i8")]
pub enum Signal {
    /// Enter short (-1)
    Short,
    /// No action (0)
    #[default]
    Hold,
    /// Enter long (+1)
    Long,
}

impl Signal {
    /// Any positive value is long, any negative value short.
    pub fn from_i8(value: i8) -> Self {
        match value.signum() {
            1 => Signal::Long,
            -1 => Signal::Short,
            _ => Signal::Hold,
        }
    }

    pub fn as_i8(&self) -> i8 {
        match self {
            Signal::Short => -1,
            Signal::Hold => 0,
            Signal::Long => 1,
        }
    }

    /// Side of the position this signal asks to open.
    pub fn side(&self) -> Option<Side> {
        match self {
            Signal::Long => Some(Side::Long),
            Signal::Short => Some(Side::Short),
            Signal::Hold => None,
        }
    }

    pub fn is_entry(&self) -> bool {
        *self != Signal::Hold
    }
}

impl From<Signal> for i8 {
    fn from(signal: Signal) -> Self {
        signal.as_i8()
    }
}

impl From<i8> for Signal {
    fn from(value: i8) -> Self {
        Signal::from_i8(value)
    }
}
