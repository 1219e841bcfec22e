//! Error types for stockwatch.

use thiserror::Error;

/// Result type alias using the stockwatch error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Every failure a stockwatch operation can report.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    /// Symbol does not exist or has no data. Never retried.
    #[error("Invalid stock symbol '{symbol}': {reason}")]
    InvalidSymbol { symbol: String, reason: String },

    /// Price lookup kept failing transiently until attempts ran out.
    #[error("Failed to fetch market data for '{symbol}': {reason}")]
    MarketDataUnavailable { symbol: String, reason: String },

    #[error("Stock '{0}' already exists in tracking list")]
    DuplicatePosition(String),

    #[error("Stock '{0}' not found")]
    PositionNotFound(String),

    #[error("Storage operation '{operation}' failed: {reason}")]
    Storage { operation: String, reason: String },

    #[error("Failed to send alert: {0}")]
    DeliveryFailed(String),

    /// Rejected user input (bad prices, empty symbol)
    #[error("{0}")]
    Validation(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl Error {
    pub fn storage(operation: &str, reason: impl ToString) -> Self {
        Self::Storage {
            operation: operation.to_string(),
            reason: reason.to_string(),
        }
    }

    /// Short machine-readable name of the error kind
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InvalidSymbol { .. } => "invalid_symbol",
            Self::MarketDataUnavailable { .. } => "market_data_unavailable",
            Self::DuplicatePosition(_) => "duplicate_position",
            Self::PositionNotFound(_) => "position_not_found",
            Self::Storage { .. } => "storage_failure",
            Self::DeliveryFailed(_) => "delivery_failed",
            Self::Validation(_) => "validation",
            Self::Config(_) => "config",
        }
    }
}

impl From<config::ConfigError> for Error {
    fn from(e: config::ConfigError) -> Self {
        Self::Config(e.to_string())
    }
}
