use crate::api::Venue;
use crate::config::Interval;
use crate::error::BotError;
use crate::models::{Candle, FillResult};
use crate::Result;
use chrono::Utc;
use hmac::{Hmac, Mac};
use reqwest::Client;
use serde::Deserialize;
use sha2::Sha256;

const BINANCE_API: &str = "https://api.binance.com";
const RECV_WINDOW_MS: u64 = 5000;

type HmacSha256 = Hmac<Sha256>;

/// Client for the Binance spot REST API.
///
/// Market-data endpoints are public; balance and order endpoints are signed
/// with HMAC-SHA256 over the query string.
#[derive(Clone)]
pub struct BinanceClient {
    client: Client,
    base_url: String,
    api_key: String,
    api_secret: String,
}

#[derive(Debug, Deserialize)]
struct TickerPrice {
    price: String,
}

#[derive(Debug, Deserialize)]
struct AccountResponse {
    balances: Vec<AssetBalance>,
}

#[derive(Debug, Deserialize)]
struct AssetBalance {
    asset: String,
    free: String,
}

// Field names follow the venue's response, including its spelling of
// "cummulativeQuoteQty".
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct OrderResponse {
    executed_qty: String,
    cummulative_quote_qty: String,
}

impl BinanceClient {
    pub fn new(api_key: String, api_secret: String) -> Self {
        Self::with_base_url(BINANCE_API.to_string(), api_key, api_secret)
    }

    /// Point the client at a different host (testnet, mock server).
    pub fn with_base_url(base_url: String, api_key: String, api_secret: String) -> Self {
        Self {
            client: Client::new(),
            base_url,
            api_key,
            api_secret,
        }
    }

    /// HMAC-SHA256 signature over the query string, hex-encoded.
    fn sign(&self, query: &str) -> String {
        let mut mac = HmacSha256::new_from_slice(self.api_secret.as_bytes())
            .expect("HMAC can take key of any size");
        mac.update(query.as_bytes());
        hex::encode(mac.finalize().into_bytes())
    }

    /// Append timestamp, receive window and signature to request parameters.
    fn signed_query(&self, params: &str) -> String {
        let timestamp = Utc::now().timestamp_millis();
        let query = if params.is_empty() {
            format!("timestamp={}&recvWindow={}", timestamp, RECV_WINDOW_MS)
        } else {
            format!("{}&timestamp={}&recvWindow={}", params, timestamp, RECV_WINDOW_MS)
        };
        let signature = self.sign(&query);
        format!("{}&signature={}", query, signature)
    }

    async fn submit_order(&self, params: String) -> Result<FillResult> {
        let url = format!(
            "{}/api/v3/order?{}",
            self.base_url,
            self.signed_query(&params)
        );

        let response = self
            .client
            .post(&url)
            .header("X-MBX-APIKEY", &self.api_key)
            .send()
            .await
            .map_err(|e| BotError::OrderExecution(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let detail = response.text().await.unwrap_or_default();
            return Err(BotError::OrderExecution(format!(
                "venue rejected order ({}): {}",
                status, detail
            )));
        }

        let order: OrderResponse = response
            .json()
            .await
            .map_err(|e| BotError::OrderExecution(e.to_string()))?;

        normalize_fill(&order)
    }
}

fn parse_f64(field: &str, value: &str) -> Result<f64> {
    value
        .parse()
        .map_err(|_| BotError::DataFetch(format!("unparseable {}: '{}'", field, value)))
}

/// Collapse a raw order response into {filled quantity, avg price, quote}.
fn normalize_fill(order: &OrderResponse) -> Result<FillResult> {
    let filled_quantity = parse_f64("executedQty", &order.executed_qty)
        .map_err(|e| BotError::OrderExecution(e.to_string()))?;
    let cumulative_quote = parse_f64("cummulativeQuoteQty", &order.cummulative_quote_qty)
        .map_err(|e| BotError::OrderExecution(e.to_string()))?;

    if filled_quantity <= 0.0 {
        return Err(BotError::OrderExecution(
            "order accepted but nothing filled".into(),
        ));
    }

    Ok(FillResult {
        filled_quantity,
        avg_price: cumulative_quote / filled_quantity,
        cumulative_quote,
    })
}

impl Venue for BinanceClient {
    async fn recent_candles(&self, symbol: &str, interval: Interval) -> Result<Vec<Candle>> {
        let url = format!(
            "{}/api/v3/klines?symbol={}&interval={}",
            self.base_url,
            symbol,
            interval.as_str()
        );

        // Klines come back as positional arrays; open time is index 0 and
        // the close is the string at index 4.
        let raw: Vec<Vec<serde_json::Value>> = self
            .client
            .get(&url)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        let mut candles = Vec::with_capacity(raw.len());
        for kline in &raw {
            let open_time = kline
                .first()
                .and_then(|v| v.as_i64())
                .ok_or_else(|| BotError::DataFetch("malformed kline: no open time".into()))?;
            let close = kline
                .get(4)
                .and_then(|v| v.as_str())
                .ok_or_else(|| BotError::DataFetch("malformed kline: no close price".into()))?;
            candles.push(Candle {
                open_time,
                close: parse_f64("close", close)?,
            });
        }

        Ok(candles)
    }

    async fn current_price(&self, symbol: &str) -> Result<f64> {
        let url = format!("{}/api/v3/ticker/price?symbol={}", self.base_url, symbol);

        let ticker: TickerPrice = self
            .client
            .get(&url)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        parse_f64("price", &ticker.price)
    }

    async fn free_balance(&self, asset: &str) -> Result<f64> {
        let url = format!(
            "{}/api/v3/account?{}",
            self.base_url,
            self.signed_query("")
        );

        let account: AccountResponse = self
            .client
            .get(&url)
            .header("X-MBX-APIKEY", &self.api_key)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        match account.balances.iter().find(|b| b.asset == asset) {
            Some(balance) => parse_f64("free balance", &balance.free),
            None => Ok(0.0),
        }
    }

    async fn market_buy(&self, symbol: &str, quote_amount: f64) -> Result<FillResult> {
        self.submit_order(format!(
            "symbol={}&side=BUY&type=MARKET&quoteOrderQty={}",
            symbol, quote_amount
        ))
        .await
    }

    async fn market_sell(&self, symbol: &str, base_quantity: f64) -> Result<FillResult> {
        self.submit_order(format!(
            "symbol={}&side=SELL&type=MARKET&quantity={}",
            symbol, base_quantity
        ))
        .await
    }
}
