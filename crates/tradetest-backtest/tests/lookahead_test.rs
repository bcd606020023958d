//! Indicators and signals at a bar must not change when later bars are added.

use tradetest_core::types::{Bar, BarSeries, Timeframe};
use tradetest_strategies::StrategyRegistry;

const DAY: i64 = 86_400_000;
const LEN: usize = 500;

/// Oscillating trend with uneven volume, long enough to warm up every indicator.
fn bars() -> Vec<Bar> {
    (0..LEN)
        .map(|i| {
            let t = i as f64;
            let close = 100.0 + 15.0 * (t * 0.07).sin() + 6.0 * (t * 0.23).cos() + 0.05 * t;
            let open = close - 1.5 * (t * 0.41).sin();
            let high = close.max(open) + 1.0 + (t * 0.13).cos().abs();
            let low = close.min(open) - 1.0 - (t * 0.17).sin().abs();
            let spike = if i % 37 == 0 { 4_000.0 } else { 0.0 };
            let volume = 1_000.0 + 400.0 * (t * 0.5).sin().powi(2) + spike;
            Bar::new(i as i64 * DAY, open, high, low, close, volume)
        })
        .collect()
}

fn evaluate(id: &str, bars: &[Bar]) -> BarSeries {
    let strategy = StrategyRegistry::new().create_default(id).unwrap();
    let series = BarSeries::from_bars("TEST", Timeframe::Daily, bars.to_vec());
    let series = strategy.calculate_indicators(series).unwrap();
    strategy.generate_signals(series).unwrap()
}

fn same_value(a: f64, b: f64) -> bool {
    (a.is_nan() && b.is_nan()) || (a - b).abs() <= 1e-9 * a.abs().max(1.0)
}

#[test]
fn test_signals_ignore_future_bars() {
    let bars = bars();
    let registry = StrategyRegistry::new();

    for id in registry.names() {
        let full = evaluate(id, &bars);
        for n in (210..=LEN).step_by(3) {
            let prefix = evaluate(id, &bars[..n]);
            assert_eq!(
                prefix.signal(n - 1),
                full.signal(n - 1),
                "{id}: signal at bar {} depends on later bars",
                n - 1
            );
        }
    }
}

#[test]
fn test_indicator_columns_ignore_future_bars() {
    let bars = bars();
    let registry = StrategyRegistry::new();

    for id in registry.names() {
        let full = evaluate(id, &bars);
        let names: Vec<String> = full.column_names().map(String::from).collect();
        assert!(!names.is_empty(), "{id} produced no columns");

        for n in (5..=LEN).step_by(7) {
            let prefix = evaluate(id, &bars[..n]);
            for name in &names {
                let expected = full.column(name).unwrap()[n - 1];
                let actual = prefix.column(name).unwrap()[n - 1];
                assert!(
                    same_value(actual, expected),
                    "{id}: {name} at bar {} is {actual} on a prefix, {expected} on the full series",
                    n - 1
                );
            }
        }
    }
}
