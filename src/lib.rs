// Core modules
pub mod api;
pub mod config;
pub mod error;
pub mod execution;
pub mod models;
pub mod persistence;
pub mod server;
pub mod service;

// Re-export commonly used types
pub use api::{LookupError, Notifier, PriceLookup};
pub use config::Settings;
pub use error::{Error, Result};
pub use models::*;
pub use persistence::PositionStore;
pub use service::StockService;
