//! Bar interval definitions.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Interval covered by one bar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum Timeframe {
    #[serde(rename = "1m")]
    Minute1,
    #[serde(rename = "5m")]
    Minute5,
    #[serde(rename = "15m")]
    Minute15,
    #[serde(rename = "1h")]
    Hour1,
    #[serde(rename = "4h")]
    Hour4,
    #[serde(rename = "1d")]
    #[default]
    Daily,
    #[serde(rename = "1w")]
    Weekly,
}

impl Timeframe {
    /// Duration of one bar in milliseconds.
    pub fn as_millis(&self) -> i64 {
        let secs = match self {
            Timeframe::Minute1 => 60,
            Timeframe::Minute5 => 300,
            Timeframe::Minute15 => 900,
            Timeframe::Hour1 => 3_600,
            Timeframe::Hour4 => 14_400,
            Timeframe::Daily => 86_400,
            Timeframe::Weekly => 604_800,
        };
        secs * 1000
    }

    pub fn is_intraday(&self) -> bool {
        self.as_millis() < Timeframe::Daily.as_millis()
    }

    /// Interval label as used in cache file names and on the command line.
    pub fn as_str(&self) -> &'static str {
        match self {
            Timeframe::Minute1 => "1m",
            Timeframe::Minute5 => "5m",
            Timeframe::Minute15 => "15m",
            Timeframe::Hour1 => "1h",
            Timeframe::Hour4 => "4h",
            Timeframe::Daily => "1d",
            Timeframe::Weekly => "1w",
        }
    }
}

impl fmt::Display for Timeframe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Timeframe {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "1m" | "1min" => Ok(Timeframe::Minute1),
            "5m" | "5min" => Ok(Timeframe::Minute5),
            "15m" | "15min" => Ok(Timeframe::Minute15),
            "1h" | "hour" => Ok(Timeframe::Hour1),
            "4h" => Ok(Timeframe::Hour4),
            "1d" | "day" | "daily" => Ok(Timeframe::Daily),
            "1w" | "1wk" | "week" | "weekly" => Ok(Timeframe::Weekly),
            _ => Err(format!("Invalid timeframe: {}", s)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_and_display() {
        assert_eq!("daily".parse::<Timeframe>().unwrap(), Timeframe::Daily);
        assert_eq!("1H".parse::<Timeframe>().unwrap(), Timeframe::Hour1);
        assert!("3d".parse::<Timeframe>().is_err());
        assert_eq!(Timeframe::Minute15.to_string(), "15m");
    }

    #[test]
    fn test_intraday() {
        assert!(Timeframe::Hour4.is_intraday());
        assert!(!Timeframe::Daily.is_intraday());
        assert_eq!(Timeframe::Daily.as_millis(), 86_400_000);
    }
}
