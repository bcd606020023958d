//! Backtest result and report generation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tradetest_core::types::Trade;

use crate::statistics::PerformanceMetrics;

/// Portfolio value at the close of one bar.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EquityPoint {
    pub timestamp: DateTime<Utc>,
    pub equity: f64,
}

/// Complete result of one backtest run.
///
/// Serializes to a flat record; the equity curve becomes an ordered
/// `timestamp -> value` object.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BacktestResult {
    pub strategy_name: String,
    pub symbol: String,
    /// ISO date of the first bar
    pub start_date: String,
    /// ISO date of the last bar
    pub end_date: String,
    pub initial_capital: f64,
    pub final_capital: f64,
    #[serde(flatten)]
    pub metrics: PerformanceMetrics,
    pub trades: Vec<Trade>,
    #[serde(with = "equity_map")]
    pub equity_curve: Vec<EquityPoint>,
    pub metadata: serde_json::Map<String, serde_json::Value>,
}

impl BacktestResult {
    /// Equity values in bar order.
    pub fn equity_values(&self) -> Vec<f64> {
        self.equity_curve.iter().map(|p| p.equity).collect()
    }

    /// Generate a text summary.
    pub fn summary(&self) -> String {
        let m = &self.metrics;
        let mut s = String::new();

        s.push_str("═══════════════════════════════════════════════════════════\n");
        s.push_str("                     BACKTEST REPORT                        \n");
        s.push_str("═══════════════════════════════════════════════════════════\n\n");

        s.push_str(&format!("  Strategy:            {}\n", self.strategy_name));
        s.push_str(&format!("  Symbol:              {}\n", self.symbol));
        s.push_str(&format!(
            "  Period:              {} to {}\n",
            self.start_date, self.end_date
        ));
        s.push('\n');

        s.push_str("PERFORMANCE\n");
        s.push_str("───────────────────────────────────────────────────────────\n");
        s.push_str(&format!(
            "  Initial Capital:     ${:.2}\n",
            self.initial_capital
        ));
        s.push_str(&format!("  Final Capital:       ${:.2}\n", self.final_capital));
        s.push_str(&format!(
            "  Total Return:        ${:.2} ({:.2}%)\n",
            m.total_return, m.total_return_pct
        ));
        s.push_str(&format!(
            "  Max Drawdown:        ${:.2} ({:.2}%)\n",
            m.max_drawdown, m.max_drawdown_pct
        ));
        s.push('\n');

        s.push_str("RISK METRICS\n");
        s.push_str("───────────────────────────────────────────────────────────\n");
        s.push_str(&format!("  Sharpe Ratio:        {:.2}\n", m.sharpe_ratio));
        s.push_str(&format!("  Profit Factor:       {:.2}\n", m.profit_factor));
        s.push('\n');

        s.push_str("TRADE STATISTICS\n");
        s.push_str("───────────────────────────────────────────────────────────\n");
        s.push_str(&format!("  Total Trades:        {}\n", m.num_trades));
        s.push_str(&format!("  Winning Trades:      {}\n", m.winning_trades));
        s.push_str(&format!("  Losing Trades:       {}\n", m.losing_trades));
        s.push_str(&format!("  Win Rate:            {:.2}%\n", m.win_rate * 100.0));
        s.push_str(&format!("  Avg Win:             ${:.2}\n", m.avg_win));
        s.push_str(&format!("  Avg Loss:            ${:.2}\n", m.avg_loss));
        s.push_str(&format!("  Avg Days Held:       {:.1}\n", m.avg_days_held));
        s.push('\n');

        if !self.trades.is_empty() {
            s.push_str("TRADES\n");
            s.push_str("───────────────────────────────────────────────────────────\n");
            for t in &self.trades {
                s.push_str(&format!(
                    "  {} {:<5} {:>8.2} -> {:>8.2}  x{:<6} {:>4.1}x  {:>10.2} ({:.2}%)\n",
                    t.entry_date.format("%Y-%m-%d"),
                    t.side.to_string(),
                    t.entry_price,
                    t.exit_price,
                    t.size,
                    t.leverage,
                    t.pnl,
                    t.pnl_pct
                ));
            }
            s.push('\n');
        }

        s.push_str("EXECUTION\n");
        s.push_str("───────────────────────────────────────────────────────────\n");
        s.push_str(&format!(
            "  Equity Points:       {}\n",
            self.equity_curve.len()
        ));
        s.push('\n');

        s.push_str("═══════════════════════════════════════════════════════════\n");

        s
    }

    /// Export to JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Export to CSV (equity curve only).
    pub fn equity_to_csv(&self) -> String {
        let mut csv = String::from("timestamp,equity\n");
        for point in &self.equity_curve {
            csv.push_str(&format!("{},{}\n", point.timestamp.to_rfc3339(), point.equity));
        }
        csv
    }
}

/// Equity curve as an ordered map keyed by ISO-8601 timestamp.
mod equity_map {
    use super::EquityPoint;
    use chrono::{DateTime, Utc};
    use serde::de::{MapAccess, Visitor};
    use serde::ser::SerializeMap;
    use serde::{Deserializer, Serializer};
    use std::fmt;

    pub fn serialize<S: Serializer>(points: &[EquityPoint], serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(points.len()))?;
        for point in points {
            map.serialize_entry(&point.timestamp.to_rfc3339(), &point.equity)?;
        }
        map.end()
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Vec<EquityPoint>, D::Error> {
        struct EquityVisitor;

        impl<'de> Visitor<'de> for EquityVisitor {
            type Value = Vec<EquityPoint>;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map of ISO-8601 timestamps to equity values")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
                let mut points = Vec::with_capacity(access.size_hint().unwrap_or(0));
                while let Some((timestamp, equity)) = access.next_entry::<DateTime<Utc>, f64>()? {
                    points.push(EquityPoint { timestamp, equity });
                }
                Ok(points)
            }
        }

        deserializer.deserialize_map(EquityVisitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result() -> BacktestResult {
        let t0 = DateTime::from_timestamp_millis(0).unwrap();
        let t1 = DateTime::from_timestamp_millis(86_400_000).unwrap();

        BacktestResult {
            strategy_name: "Test".to_string(),
            symbol: "AAPL".to_string(),
            start_date: "1970-01-01".to_string(),
            end_date: "1970-01-02".to_string(),
            initial_capital: 100_000.0,
            final_capital: 110_000.0,
            metrics: PerformanceMetrics {
                total_return: 10_000.0,
                total_return_pct: 10.0,
                num_trades: 10,
                ..Default::default()
            },
            trades: vec![],
            equity_curve: vec![
                EquityPoint {
                    timestamp: t0,
                    equity: 100_000.0,
                },
                EquityPoint {
                    timestamp: t1,
                    equity: 110_000.0,
                },
            ],
            metadata: serde_json::Map::new(),
        }
    }

    #[test]
    fn test_report_summary() {
        let summary = result().summary();

        assert!(summary.contains("Total Return"));
        assert!(summary.contains("10.00%"));
        assert!(summary.contains("AAPL"));
    }

    #[test]
    fn test_json_is_flat_with_equity_map() {
        let json: serde_json::Value = serde_json::from_str(&result().to_json().unwrap()).unwrap();

        assert_eq!(json["symbol"], "AAPL");
        assert_eq!(json["num_trades"], 10);
        assert_eq!(json["equity_curve"]["1970-01-02T00:00:00+00:00"], 110_000.0);

        let keys: Vec<&String> = json["equity_curve"].as_object().unwrap().keys().collect();
        assert_eq!(keys[0], "1970-01-01T00:00:00+00:00");
    }

    #[test]
    fn test_json_reads_back() {
        let original = result();
        let parsed: BacktestResult = serde_json::from_str(&original.to_json().unwrap()).unwrap();

        assert_eq!(parsed.equity_curve, original.equity_curve);
        assert_eq!(parsed.metrics, original.metrics);
    }

    #[test]
    fn test_equity_csv() {
        let csv = result().equity_to_csv();
        let lines: Vec<&str> = csv.lines().collect();

        assert_eq!(lines[0], "timestamp,equity");
        assert_eq!(lines[2], "1970-01-02T00:00:00+00:00,110000");
    }
}
