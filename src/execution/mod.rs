// Order submission and loop orchestration
pub mod executor;
pub mod trading_loop;

pub use executor::{OrderExecutor, OrderSizing};
pub use trading_loop::TradingLoop;
