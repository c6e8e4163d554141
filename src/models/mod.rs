use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One kline from the venue. Only the close is consumed by the strategy.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Candle {
    /// Kline open time in milliseconds since the epoch.
    pub open_time: i64,
    pub close: f64,
}

/// Side of an executed trade.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum TradeSide {
    Buy,
    Sell,
}

impl TradeSide {
    pub fn as_str(&self) -> &'static str {
        match self {
            TradeSide::Buy => "BUY",
            TradeSide::Sell => "SELL",
        }
    }
}

impl std::fmt::Display for TradeSide {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Crossover signal emitted once per direction change.
///
/// `None` covers three cases: no crossover, a tie between the averages, and
/// a trend that already fired in this direction.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum CrossSignal {
    CrossUp,
    CrossDown,
    None,
}

/// Normalized result of a filled market order.
#[derive(Debug, Clone, PartialEq)]
pub struct FillResult {
    /// Base-asset quantity actually filled.
    pub filled_quantity: f64,
    /// Average fill price, so `filled_quantity * avg_price == cumulative_quote`.
    pub avg_price: f64,
    /// Quote currency spent (BUY) or received (SELL).
    pub cumulative_quote: f64,
}

/// One executed trade as persisted in the ledger. Never mutated or deleted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TradeRecord {
    pub symbol: String,
    pub side: TradeSide,
    pub quantity: f64,
    pub price: f64,
    /// Realized PnL, populated on SELL records with a matching BUY.
    pub pnl: Option<f64>,
    /// Free quote balance observed when the order was placed.
    pub usdt_balance: f64,
    /// Free base balance observed when the order was placed.
    pub crypto_balance: f64,
    pub short_ema: Option<f64>,
    pub long_ema: Option<f64>,
    pub timestamp: DateTime<Utc>,
}

/// What the loop did in one cycle.
#[derive(Debug, Clone, PartialEq)]
pub enum CycleAction {
    None,
    Bought { quantity: f64, cost: f64 },
    Sold { quantity: f64, proceeds: f64, pnl: Option<f64> },
}

/// Structured status emitted after every completed cycle.
///
/// The loop runs headless; observers (log sink, dashboard) subscribe to
/// these instead of reaching into loop state.
#[derive(Debug, Clone)]
pub struct CycleStatus {
    pub symbol: String,
    pub price: f64,
    pub short_avg: f64,
    pub long_avg: f64,
    pub signal: CrossSignal,
    pub action: CycleAction,
    pub timestamp: DateTime<Utc>,
}
