// Venue clients
pub mod binance;

pub use binance::BinanceClient;

use crate::config::Interval;
use crate::models::{Candle, FillResult};
use crate::Result;

/// Market-data and order-execution capability consumed by the trading loop.
///
/// Implementations own their transport timeouts; the loop only distinguishes
/// success from failure and never retries a submitted order itself.
#[allow(async_fn_in_trait)]
pub trait Venue {
    /// Recent klines for the symbol, oldest first.
    async fn recent_candles(&self, symbol: &str, interval: Interval) -> Result<Vec<Candle>>;

    /// Latest traded price for the symbol.
    async fn current_price(&self, symbol: &str) -> Result<f64>;

    /// Free (unlocked) balance of one asset; 0.0 when the asset is unknown.
    async fn free_balance(&self, asset: &str) -> Result<f64>;

    /// Market BUY spending `quote_amount` of the quote currency.
    async fn market_buy(&self, symbol: &str, quote_amount: f64) -> Result<FillResult>;

    /// Market SELL of `base_quantity` of the base asset.
    async fn market_sell(&self, symbol: &str, base_quantity: f64) -> Result<FillResult>;
}
