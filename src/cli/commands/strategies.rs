//! List strategies command.

use anyhow::Result;
use tradetest_strategies::StrategyRegistry;

pub async fn run() -> Result<()> {
    let registry = StrategyRegistry::new();

    println!("Available Strategies");
    println!("═══════════════════════════════════════════════════════════");
    println!();

    for info in registry.list() {
        println!("  {} ({})", info.name, info.id);
        println!("  ───────────────────────────────────────────────────────");
        println!("  {}", info.description);
        println!();
        println!("  Default configuration:");
        for line in serde_json::to_string_pretty(&info.default_config)?.lines() {
            println!("    {line}");
        }
        println!();
    }

    println!("Use --strategy <id> to select a strategy.");
    println!("Override parameters with --strategy-config '<json>'.");

    Ok(())
}
