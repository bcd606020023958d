//! Validate configuration command.

use anyhow::Result;
use std::path::Path;
use tradetest_config::AppConfig;

pub async fn run(config: &AppConfig, config_path: Option<&Path>) -> Result<()> {
    match config_path {
        Some(path) => println!("Configuration file: {}", path.display()),
        None => println!("Configuration file: none (defaults and environment)"),
    }
    println!("Configuration is valid!");
    println!();
    print!("{}", config.to_toml()?);

    Ok(())
}
