//! Strategy registry for loading strategies by identifier.

use crate::{
    BankerRatchetConfig, BankerRatchetStrategy, MomentumBreakoutConfig, MomentumBreakoutStrategy,
    RsiMeanReversionConfig, RsiMeanReversionStrategy,
};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::collections::BTreeMap;
use tradetest_core::{
    error::StrategyError,
    traits::{Strategy, StrategyConfig},
};

/// Information about a registered strategy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StrategyInfo {
    /// Registry identifier
    pub id: String,
    /// Display name
    pub name: String,
    pub description: String,
    /// Default configuration as JSON
    pub default_config: serde_json::Value,
}

/// Registry of the bundled strategies.
pub struct StrategyRegistry {
    strategies: BTreeMap<String, StrategyInfo>,
}

impl StrategyRegistry {
    /// Create a registry with all bundled strategies.
    pub fn new() -> Self {
        let mut registry = Self {
            strategies: BTreeMap::new(),
        };

        registry.register(
            "rsi_mean_reversion",
            "RSI Mean Reversion",
            "Fades RSI extremes with a 200-bar trend filter and volume confirmation",
            &RsiMeanReversionConfig::default(),
        );
        registry.register(
            "momentum_breakout",
            "Momentum Breakout",
            "Buys volume-confirmed breakouts above the 20-bar high in strong uptrends",
            &MomentumBreakoutConfig::default(),
        );
        registry.register(
            "banker_ratchet",
            "The Banker Ratchet",
            "Leveraged liquidity grabs at swing levels with a ratchet trailing stop",
            &BankerRatchetConfig::default(),
        );

        registry
    }

    fn register(&mut self, id: &str, name: &str, description: &str, config: &impl Serialize) {
        let default_config = serde_json::to_value(config).unwrap_or(serde_json::Value::Null);
        self.strategies.insert(
            id.to_string(),
            StrategyInfo {
                id: id.to_string(),
                name: name.to_string(),
                description: description.to_string(),
                default_config,
            },
        );
    }

    /// List all available strategies, ordered by identifier.
    pub fn list(&self) -> Vec<&StrategyInfo> {
        self.strategies.values().collect()
    }

    /// Get strategy info by identifier.
    pub fn get(&self, id: &str) -> Option<&StrategyInfo> {
        self.strategies.get(id)
    }

    /// Check if a strategy exists.
    pub fn exists(&self, id: &str) -> bool {
        self.strategies.contains_key(id)
    }

    /// Get all strategy identifiers.
    pub fn names(&self) -> Vec<&str> {
        self.strategies.keys().map(String::as_str).collect()
    }

    /// Create a fresh strategy instance from JSON configuration.
    ///
    /// Fields missing from `config` take their default values.
    pub fn create(
        &self,
        id: &str,
        config: serde_json::Value,
    ) -> Result<Box<dyn Strategy>, StrategyError> {
        match id {
            "rsi_mean_reversion" => {
                let config: RsiMeanReversionConfig = parse_config(config)?;
                Ok(Box::new(RsiMeanReversionStrategy::new(config)))
            }
            "momentum_breakout" => {
                let config: MomentumBreakoutConfig = parse_config(config)?;
                Ok(Box::new(MomentumBreakoutStrategy::new(config)))
            }
            "banker_ratchet" => {
                let config: BankerRatchetConfig = parse_config(config)?;
                Ok(Box::new(BankerRatchetStrategy::new(config)))
            }
            _ => Err(StrategyError::NotFound(id.to_string())),
        }
    }

    /// Create a strategy with default configuration.
    pub fn create_default(&self, id: &str) -> Result<Box<dyn Strategy>, StrategyError> {
        let info = self
            .get(id)
            .ok_or_else(|| StrategyError::NotFound(id.to_string()))?;
        self.create(id, info.default_config.clone())
    }
}

impl Default for StrategyRegistry {
    fn default() -> Self {
        Self::new()
    }
}

fn parse_config<C>(value: serde_json::Value) -> Result<C, StrategyError>
where
    C: StrategyConfig + DeserializeOwned,
{
    let config: C =
        serde_json::from_value(value).map_err(|e| StrategyError::InvalidConfig(e.to_string()))?;
    config.validate()?;
    Ok(config)
}
