pub mod telegram;
pub mod yahoo;

pub use telegram::{LogNotifier, TelegramNotifier};
pub use yahoo::YahooFinanceClient;

use async_trait::async_trait;
use thiserror::Error;

/// Why a single price lookup failed
#[derive(Debug, Clone, Error, PartialEq)]
pub enum LookupError {
    /// Unknown symbol or no data at all. Retrying will not help.
    #[error("{0}")]
    InvalidSymbol(String),

    /// Timeout, connectivity, throttling, server errors
    #[error("{0}")]
    Transient(String),
}

/// Source of the latest known price for a symbol
#[async_trait]
pub trait PriceLookup: Send + Sync {
    async fn get_price(&self, symbol: &str) -> Result<f64, LookupError>;

    fn name(&self) -> &str;
}

/// Delivers a text message to the single configured recipient
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Fails with `Error::DeliveryFailed`
    async fn send(&self, text: &str) -> crate::Result<()>;

    /// Whether messages actually leave the process
    fn is_configured(&self) -> bool;
}
