// Core modules
pub mod api;
pub mod config;
pub mod error;
pub mod execution;
pub mod indicators;
pub mod ledger;
pub mod models;
pub mod notify;
pub mod risk;
pub mod strategy;

// Re-export commonly used types
pub use config::{Interval, TradingConfig};
pub use error::BotError;
pub use models::*;

// Error handling
pub type Result<T> = std::result::Result<T, BotError>;
