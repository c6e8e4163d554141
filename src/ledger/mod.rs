use crate::error::BotError;
use crate::models::{TradeRecord, TradeSide};
use crate::strategy::Trend;
use crate::Result;
use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions, SqliteRow};
use sqlx::{Row, SqlitePool};
use std::str::FromStr;

const CREATE_TRADES_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS trades (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    symbol TEXT NOT NULL,
    side TEXT NOT NULL,
    quantity REAL NOT NULL,
    price REAL NOT NULL,
    pnl REAL,
    usdt_balance REAL NOT NULL,
    crypto_balance REAL NOT NULL,
    short_ema REAL,
    long_ema REAL,
    timestamp TEXT NOT NULL
)
"#;

/// Append-only SQLite ledger of executed trades.
///
/// Rows are only ever inserted; PnL pairing and restart recovery are derived
/// from the most recent row per symbol.
pub struct TradeLedger {
    pool: SqlitePool,
}

impl TradeLedger {
    /// Open (and create if missing) the ledger database.
    ///
    /// A single connection is enough for the strictly sequential loop, and
    /// it keeps `sqlite::memory:` databases alive for the whole pool.
    pub async fn connect(database_url: &str) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await?;

        sqlx::query(CREATE_TRADES_TABLE).execute(&pool).await?;

        tracing::info!("Trade ledger ready at {}", database_url);

        Ok(Self { pool })
    }

    /// Append one executed trade. Each call creates one row; there is no
    /// dedup key.
    pub async fn record(&self, trade: &TradeRecord) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO trades (
                symbol, side, quantity, price, pnl,
                usdt_balance, crypto_balance, short_ema, long_ema, timestamp
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            "#,
        )
        .bind(&trade.symbol)
        .bind(trade.side.as_str())
        .bind(trade.quantity)
        .bind(trade.price)
        .bind(trade.pnl)
        .bind(trade.usdt_balance)
        .bind(trade.crypto_balance)
        .bind(trade.short_ema)
        .bind(trade.long_ema)
        .bind(trade.timestamp.to_rfc3339())
        .execute(&self.pool)
        .await?;

        tracing::debug!(
            "Recorded {} {} {:.8} @ {:.8}",
            trade.side,
            trade.symbol,
            trade.quantity,
            trade.price
        );

        Ok(())
    }

    /// All trades, oldest first.
    pub async fn all(&self) -> Result<Vec<TradeRecord>> {
        let rows = sqlx::query("SELECT * FROM trades ORDER BY id ASC")
            .fetch_all(&self.pool)
            .await?;

        rows.iter().map(row_to_record).collect()
    }

    /// Most recent trade for a symbol, if any.
    pub async fn latest(&self, symbol: &str) -> Result<Option<TradeRecord>> {
        let row = sqlx::query("SELECT * FROM trades WHERE symbol = ?1 ORDER BY id DESC LIMIT 1")
            .bind(symbol)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(row_to_record).transpose()
    }

    /// Cumulative cost of the most recent BUY for this symbol with no
    /// intervening SELL. A SELL as the latest row means the last BUY was
    /// already matched.
    pub async fn unmatched_buy_cost(&self, symbol: &str) -> Result<Option<f64>> {
        Ok(self.latest(symbol).await?.and_then(|trade| match trade.side {
            // Average fill price times filled quantity is the quote spent.
            TradeSide::Buy => Some(trade.quantity * trade.price),
            TradeSide::Sell => None,
        }))
    }

    /// Realized PnL for a sell of `proceeds` quote currency: proceeds minus
    /// the unmatched BUY cost. `None` when no prior BUY exists.
    pub async fn pnl_for_sell(&self, symbol: &str, proceeds: f64) -> Result<Option<f64>> {
        Ok(self
            .unmatched_buy_cost(symbol)
            .await?
            .map(|cost| proceeds - cost))
    }

    /// Crossover direction implied by the most recent trade, used to make
    /// restarts idempotent: a ledger ending in a BUY means the short average
    /// was last confirmed above the long one.
    pub async fn last_direction(&self, symbol: &str) -> Result<Option<Trend>> {
        Ok(self.latest(symbol).await?.map(|trade| match trade.side {
            TradeSide::Buy => Trend::Above,
            TradeSide::Sell => Trend::Below,
        }))
    }
}

fn row_to_record(row: &SqliteRow) -> Result<TradeRecord> {
    let side_str: String = row.try_get("side")?;
    let side = match side_str.as_str() {
        "BUY" => TradeSide::Buy,
        "SELL" => TradeSide::Sell,
        other => {
            return Err(BotError::Persistence(sqlx::Error::Decode(
                format!("unknown trade side '{}'", other).into(),
            )))
        }
    };

    let timestamp_str: String = row.try_get("timestamp")?;
    let timestamp = DateTime::parse_from_rfc3339(&timestamp_str)
        .map_err(|e| {
            BotError::Persistence(sqlx::Error::Decode(
                format!("bad timestamp '{}': {}", timestamp_str, e).into(),
            ))
        })?
        .with_timezone(&Utc);

    Ok(TradeRecord {
        symbol: row.try_get("symbol")?,
        side,
        quantity: row.try_get("quantity")?,
        price: row.try_get("price")?,
        pnl: row.try_get("pnl")?,
        usdt_balance: row.try_get("usdt_balance")?,
        crypto_balance: row.try_get("crypto_balance")?,
        short_ema: row.try_get("short_ema")?,
        long_ema: row.try_get("long_ema")?,
        timestamp,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn ledger() -> TradeLedger {
        TradeLedger::connect("sqlite::memory:").await.unwrap()
    }

    fn trade(symbol: &str, side: TradeSide, quantity: f64, price: f64) -> TradeRecord {
        TradeRecord {
            symbol: symbol.to_string(),
            side,
            quantity,
            price,
            pnl: None,
            usdt_balance: 1000.0,
            crypto_balance: 0.0,
            short_ema: Some(101.0),
            long_ema: Some(100.0),
            timestamp: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_record_and_read_back() {
        let ledger = ledger().await;
        ledger
            .record(&trade("BTCUSDT", TradeSide::Buy, 0.0025, 40000.0))
            .await
            .unwrap();

        let trades = ledger.all().await.unwrap();
        assert_eq!(trades.len(), 1);
        assert_eq!(trades[0].symbol, "BTCUSDT");
        assert_eq!(trades[0].side, TradeSide::Buy);
        assert_eq!(trades[0].quantity, 0.0025);
        assert_eq!(trades[0].price, 40000.0);
        assert_eq!(trades[0].pnl, None);
        assert_eq!(trades[0].short_ema, Some(101.0));
    }

    #[tokio::test]
    async fn test_latest_is_per_symbol() {
        let ledger = ledger().await;
        ledger
            .record(&trade("BTCUSDT", TradeSide::Buy, 1.0, 100.0))
            .await
            .unwrap();
        ledger
            .record(&trade("ETHUSDT", TradeSide::Sell, 2.0, 50.0))
            .await
            .unwrap();

        let latest = ledger.latest("BTCUSDT").await.unwrap().unwrap();
        assert_eq!(latest.side, TradeSide::Buy);

        assert!(ledger.latest("SOLUSDT").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_pnl_pairs_sell_with_latest_buy() {
        let ledger = ledger().await;
        ledger
            .record(&trade("BTCUSDT", TradeSide::Buy, 0.0025, 40000.0))
            .await
            .unwrap();

        // Cost was 0.0025 * 40000 = 100; proceeds of 110 mean +10.
        let pnl = ledger.pnl_for_sell("BTCUSDT", 110.0).await.unwrap();
        assert_eq!(pnl, Some(10.0));
    }

    #[tokio::test]
    async fn test_pnl_without_prior_buy_is_none() {
        let ledger = ledger().await;
        assert_eq!(ledger.pnl_for_sell("BTCUSDT", 110.0).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_pnl_ignores_already_matched_buy() {
        let ledger = ledger().await;
        ledger
            .record(&trade("BTCUSDT", TradeSide::Buy, 1.0, 100.0))
            .await
            .unwrap();
        ledger
            .record(&trade("BTCUSDT", TradeSide::Sell, 1.0, 110.0))
            .await
            .unwrap();

        // The BUY was consumed by the SELL above.
        assert_eq!(ledger.pnl_for_sell("BTCUSDT", 120.0).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_pnl_pairing_is_per_symbol() {
        let ledger = ledger().await;
        ledger
            .record(&trade("ETHUSDT", TradeSide::Buy, 1.0, 100.0))
            .await
            .unwrap();

        // A BUY on another symbol must not be paired.
        assert_eq!(ledger.pnl_for_sell("BTCUSDT", 120.0).await.unwrap(), None);
        assert_eq!(
            ledger.pnl_for_sell("ETHUSDT", 120.0).await.unwrap(),
            Some(20.0)
        );
    }

    #[tokio::test]
    async fn test_last_direction_from_ledger() {
        let ledger = ledger().await;
        assert_eq!(ledger.last_direction("BTCUSDT").await.unwrap(), None);

        ledger
            .record(&trade("BTCUSDT", TradeSide::Buy, 1.0, 100.0))
            .await
            .unwrap();
        assert_eq!(
            ledger.last_direction("BTCUSDT").await.unwrap(),
            Some(Trend::Above)
        );

        ledger
            .record(&trade("BTCUSDT", TradeSide::Sell, 1.0, 110.0))
            .await
            .unwrap();
        assert_eq!(
            ledger.last_direction("BTCUSDT").await.unwrap(),
            Some(Trend::Below)
        );
    }

    #[tokio::test]
    async fn test_records_are_ordered_and_append_only() {
        let ledger = ledger().await;
        for price in [100.0, 101.0, 102.0] {
            ledger
                .record(&trade("BTCUSDT", TradeSide::Buy, 1.0, price))
                .await
                .unwrap();
        }

        let trades = ledger.all().await.unwrap();
        assert_eq!(trades.len(), 3);
        assert_eq!(trades[0].price, 100.0);
        assert_eq!(trades[2].price, 102.0);
    }
}
