use crate::api::Venue;
use crate::error::BotError;
use crate::models::{FillResult, TradeSide};
use crate::Result;

/// Market-order sizing: BUY spends quote currency, SELL disposes a base
/// quantity.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum OrderSizing {
    QuoteAmount(f64),
    BaseQuantity(f64),
}

/// Submits market orders through the venue and checks the normalized fill.
///
/// No internal retry: the trading loop owns the retry policy, so a failure
/// here surfaces immediately as `OrderExecution`.
pub struct OrderExecutor<'a, V> {
    venue: &'a V,
}

impl<'a, V: Venue> OrderExecutor<'a, V> {
    pub fn new(venue: &'a V) -> Self {
        Self { venue }
    }

    pub async fn submit(
        &self,
        symbol: &str,
        side: TradeSide,
        sizing: OrderSizing,
    ) -> Result<FillResult> {
        let fill = match (side, sizing) {
            (TradeSide::Buy, OrderSizing::QuoteAmount(amount)) => {
                if amount <= 0.0 {
                    return Err(BotError::OrderExecution(format!(
                        "refusing BUY with non-positive quote amount {}",
                        amount
                    )));
                }
                self.venue.market_buy(symbol, amount).await?
            }
            (TradeSide::Sell, OrderSizing::BaseQuantity(quantity)) => {
                if quantity <= 0.0 {
                    return Err(BotError::OrderExecution(format!(
                        "refusing SELL with non-positive quantity {}",
                        quantity
                    )));
                }
                self.venue.market_sell(symbol, quantity).await?
            }
            (side, sizing) => {
                return Err(BotError::OrderExecution(format!(
                    "sizing {:?} does not match side {}",
                    sizing, side
                )))
            }
        };

        if fill.filled_quantity <= 0.0 {
            return Err(BotError::OrderExecution(
                "venue reported an empty fill".into(),
            ));
        }

        Ok(fill)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Interval;
    use crate::models::Candle;

    struct FixedVenue {
        fill: FillResult,
    }

    impl Venue for FixedVenue {
        async fn recent_candles(&self, _: &str, _: Interval) -> Result<Vec<Candle>> {
            Ok(Vec::new())
        }

        async fn current_price(&self, _: &str) -> Result<f64> {
            Ok(self.fill.avg_price)
        }

        async fn free_balance(&self, _: &str) -> Result<f64> {
            Ok(0.0)
        }

        async fn market_buy(&self, _: &str, _: f64) -> Result<FillResult> {
            Ok(self.fill.clone())
        }

        async fn market_sell(&self, _: &str, _: f64) -> Result<FillResult> {
            Ok(self.fill.clone())
        }
    }

    fn venue() -> FixedVenue {
        FixedVenue {
            fill: FillResult {
                filled_quantity: 0.5,
                avg_price: 200.0,
                cumulative_quote: 100.0,
            },
        }
    }

    #[test]
    fn test_buy_with_quote_sizing() {
        tokio_test::block_on(async {
            let venue = venue();
            let executor = OrderExecutor::new(&venue);
            let fill = executor
                .submit("SOLUSDT", TradeSide::Buy, OrderSizing::QuoteAmount(100.0))
                .await
                .unwrap();
            assert_eq!(fill.cumulative_quote, 100.0);
        });
    }

    #[test]
    fn test_mismatched_sizing_rejected() {
        tokio_test::block_on(async {
            let venue = venue();
            let executor = OrderExecutor::new(&venue);

            let err = executor
                .submit("SOLUSDT", TradeSide::Buy, OrderSizing::BaseQuantity(1.0))
                .await
                .unwrap_err();
            assert!(matches!(err, BotError::OrderExecution(_)));

            let err = executor
                .submit("SOLUSDT", TradeSide::Sell, OrderSizing::QuoteAmount(10.0))
                .await
                .unwrap_err();
            assert!(matches!(err, BotError::OrderExecution(_)));
        });
    }

    #[test]
    fn test_non_positive_sizing_rejected() {
        tokio_test::block_on(async {
            let venue = venue();
            let executor = OrderExecutor::new(&venue);

            let err = executor
                .submit("SOLUSDT", TradeSide::Buy, OrderSizing::QuoteAmount(0.0))
                .await
                .unwrap_err();
            assert!(matches!(err, BotError::OrderExecution(_)));
        });
    }

    #[test]
    fn test_empty_fill_rejected() {
        tokio_test::block_on(async {
            let venue = FixedVenue {
                fill: FillResult {
                    filled_quantity: 0.0,
                    avg_price: 0.0,
                    cumulative_quote: 0.0,
                },
            };
            let executor = OrderExecutor::new(&venue);
            let err = executor
                .submit("SOLUSDT", TradeSide::Sell, OrderSizing::BaseQuantity(1.0))
                .await
                .unwrap_err();
            assert!(matches!(err, BotError::OrderExecution(_)));
        });
    }
}
