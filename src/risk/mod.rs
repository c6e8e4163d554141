// Pre-trade checks
pub mod balance_gate;

pub use balance_gate::{authorize_buy, authorize_sell};
