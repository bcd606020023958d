//! CLI definitions.

pub mod commands;

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "tradetest")]
#[command(author, version, about = "Leveraged long/short strategy backtester")]
pub struct Cli {
    /// Configuration file path (TOML)
    #[arg(short, long, env = "TRADETEST_CONFIG")]
    pub config: Option<PathBuf>,

    /// Log level, overrides the configured one
    #[arg(short, long)]
    pub log_level: Option<LogLevel>,

    /// Enable JSON log format
    #[arg(long)]
    pub json_logs: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Backtest one strategy on one symbol
    Backtest(BacktestArgs),
    /// Backtest every strategy/symbol combination in parallel
    Batch(BatchArgs),
    /// List available strategies
    Strategies,
    /// Validate and print the effective configuration
    ValidateConfig,
}

/// Date range and data options shared by `backtest` and `batch`.
#[derive(clap::Args)]
pub struct DataArgs {
    /// CSV file, or directory of `{SYMBOL}.csv` files
    #[arg(short, long)]
    pub data: PathBuf,

    /// Start date (YYYY-MM-DD)
    #[arg(long, default_value = "2020-01-01")]
    pub start: String,

    /// End date (YYYY-MM-DD), inclusive
    #[arg(long, default_value = "2023-12-31")]
    pub end: String,

    /// Timeframe
    #[arg(short, long, default_value = "1d")]
    pub timeframe: String,

    /// Initial capital, overrides the configured one
    #[arg(long)]
    pub capital: Option<f64>,

    /// Commission per side as a fraction of notional, overrides the configured one
    #[arg(long)]
    pub commission: Option<f64>,

    /// Bypass the bar cache
    #[arg(long)]
    pub no_cache: bool,
}

#[derive(clap::Args)]
pub struct BacktestArgs {
    /// Strategy to backtest
    #[arg(short, long)]
    pub strategy: String,

    /// Symbol to trade
    #[arg(short = 'S', long)]
    pub symbol: String,

    #[command(flatten)]
    pub data: DataArgs,

    /// Strategy configuration: inline JSON or a path to a JSON file
    #[arg(long)]
    pub strategy_config: Option<String>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "text")]
    pub output: OutputFormat,

    /// Save results to file (JSON)
    #[arg(long)]
    pub save: Option<PathBuf>,

    /// Write the equity curve to a CSV file
    #[arg(long)]
    pub equity_csv: Option<PathBuf>,
}

#[derive(clap::Args)]
pub struct BatchArgs {
    /// Strategies to run (comma-separated); all when omitted
    #[arg(short, long, value_delimiter = ',')]
    pub strategies: Vec<String>,

    /// Symbols to trade (comma-separated)
    #[arg(short = 'S', long, value_delimiter = ',', required = true)]
    pub symbols: Vec<String>,

    #[command(flatten)]
    pub data: DataArgs,

    /// Directory for per-run JSON results and the summary
    #[arg(short, long, default_value = "reports")]
    pub output_dir: PathBuf,
}
