//! Error types for the backtester.

use thiserror::Error;

/// Errors that abort a backtest run.
#[derive(Error, Debug)]
pub enum BacktestError {
    #[error("Cannot backtest with empty data")]
    EmptySeries,

    #[error("Invalid engine configuration: {0}")]
    InvalidConfig(String),

    #[error("Strategy error: {0}")]
    Strategy(#[from] StrategyError),
}

/// Strategy-specific errors.
#[derive(Error, Debug)]
pub enum StrategyError {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Strategy not found: {0}")]
    NotFound(String),

    #[error("Missing column '{0}': indicators must be calculated first")]
    MissingColumn(String),

    #[error("Contract violation: {0}")]
    ContractViolation(String),

    #[error("Strategy error: {0}")]
    Internal(String),
}

/// Data source errors.
#[derive(Error, Debug)]
pub enum DataError {
    #[error("Symbol not found: {0}")]
    SymbolNotFound(String),

    #[error("No data available for the requested range")]
    NoDataAvailable,

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Cache error: {0}")]
    CacheError(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Indicator calculation errors.
#[derive(Error, Debug)]
pub enum IndicatorError {
    #[error("Insufficient data: need {required} points, have {available}")]
    InsufficientData { required: usize, available: usize },

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),
}
