//! Configuration management.
//!
//! Sources, lowest precedence first:
//! 1. built-in defaults
//! 2. an optional TOML file
//! 3. `TRADETEST__SECTION__KEY` environment variables
//! 4. the legacy `DEFAULT_INITIAL_CAPITAL`, `DEFAULT_COMMISSION` and
//!    `DATA_CACHE_DIR` variables

mod settings;

pub use settings::{AppConfig, AppSettings, DataSettings, LoggingConfig};

use config::{Config, ConfigError, Environment, File, Map};
use std::path::Path;

const LEGACY_OVERRIDES: [(&str, &str); 3] = [
    ("DEFAULT_INITIAL_CAPITAL", "backtest.initial_capital"),
    ("DEFAULT_COMMISSION", "backtest.commission"),
    ("DATA_CACHE_DIR", "data.cache_dir"),
];

/// Load configuration from an optional file and the process environment.
pub fn load_config(path: Option<&Path>) -> Result<AppConfig, ConfigError> {
    load_with_env(path, None)
}

/// Load configuration reading variables from `env` instead of the process
/// environment when given.
fn load_with_env(
    path: Option<&Path>,
    env: Option<Map<String, String>>,
) -> Result<AppConfig, ConfigError> {
    let mut builder = Config::builder();

    if let Some(path) = path {
        builder = builder.add_source(File::from(path).required(true));
    }

    builder = builder.add_source(
        Environment::with_prefix("TRADETEST")
            .separator("__")
            .try_parsing(true)
            .source(env.clone()),
    );

    for (var, key) in LEGACY_OVERRIDES {
        let value = match &env {
            Some(map) => map.get(var).cloned(),
            None => std::env::var(var).ok(),
        };
        builder = builder.set_override_option(key, value)?;
    }

    let config: AppConfig = builder.build()?.try_deserialize()?;
    config
        .backtest
        .validate()
        .map_err(|e| ConfigError::Message(e.to_string()))?;

    Ok(config)
}
