use crate::api::Venue;
use crate::config::TradingConfig;
use crate::error::BotError;
use crate::execution::{OrderExecutor, OrderSizing};
use crate::indicators::moving_average;
use crate::ledger::TradeLedger;
use crate::models::{CrossSignal, CycleAction, CycleStatus, TradeRecord, TradeSide};
use crate::notify::TelegramNotifier;
use crate::risk::{authorize_buy, authorize_sell};
use crate::strategy::CrossoverDetector;
use crate::Result;
use chrono::Utc;
use tokio::sync::watch;
use tokio::time::{sleep, Duration};

const POLL_INTERVAL: Duration = Duration::from_secs(5);
/// Backoff after a transient failure, deliberately much longer than the poll
/// interval so a failing venue is not hammered.
const ERROR_BACKOFF: Duration = Duration::from_secs(60);

/// Sequential control loop for one trading pair.
///
/// Each cycle runs poll -> averages -> crossover -> gate -> order -> record,
/// fully to completion, before the next cycle may start; there is never more
/// than one order in flight. A multi-pair deployment runs one independent
/// loop per symbol.
pub struct TradingLoop<V> {
    venue: V,
    config: TradingConfig,
    ledger: TradeLedger,
    notifier: TelegramNotifier,
    detector: CrossoverDetector,
    poll_interval: Duration,
    error_backoff: Duration,
    status_tx: watch::Sender<Option<CycleStatus>>,
    shutdown_rx: watch::Receiver<bool>,
}

impl<V: Venue> TradingLoop<V> {
    /// Validate the configuration and recover the crossover direction from
    /// the ledger, so a restarted process cannot re-fire the last signal.
    pub async fn new(
        venue: V,
        config: TradingConfig,
        ledger: TradeLedger,
        notifier: TelegramNotifier,
        shutdown_rx: watch::Receiver<bool>,
    ) -> Result<Self> {
        config.validate()?;

        let detector = match ledger.last_direction(&config.symbol).await? {
            Some(direction) => {
                tracing::info!(
                    "Resuming {} with crossover state {:?} from ledger",
                    config.symbol,
                    direction
                );
                CrossoverDetector::with_state(direction)
            }
            None => CrossoverDetector::new(),
        };

        let (status_tx, _) = watch::channel(None);

        Ok(Self {
            venue,
            config,
            ledger,
            notifier,
            detector,
            poll_interval: POLL_INTERVAL,
            error_backoff: ERROR_BACKOFF,
            status_tx,
            shutdown_rx,
        })
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn with_error_backoff(mut self, backoff: Duration) -> Self {
        self.error_backoff = backoff;
        self
    }

    /// Subscribe to per-cycle status events. The loop itself stays headless;
    /// observers decide what to render.
    pub fn status(&self) -> watch::Receiver<Option<CycleStatus>> {
        self.status_tx.subscribe()
    }

    pub fn ledger(&self) -> &TradeLedger {
        &self.ledger
    }

    /// Run until shutdown is requested. The shutdown flag is only checked
    /// between cycles, so an in-flight order always completes and is
    /// recorded before the loop exits.
    pub async fn run(&mut self) -> Result<()> {
        tracing::info!(
            "Trading loop starting: {} {} SMA {}/{}",
            self.config.symbol,
            self.config.interval,
            self.config.short_period,
            self.config.long_period
        );

        loop {
            if *self.shutdown_rx.borrow() {
                tracing::info!("Shutdown requested, stopping trading loop");
                return Ok(());
            }

            let delay = match self.run_cycle().await {
                Ok(status) => {
                    let _ = self.status_tx.send(Some(status));
                    self.poll_interval
                }
                Err(e) if e.is_transient() => {
                    tracing::warn!("Cycle skipped ({}), backing off", e);
                    self.error_backoff
                }
                Err(BotError::OrderExecution(detail)) => {
                    // The detector was not confirmed, so the same signal
                    // stays armed and retries next cycle.
                    tracing::error!("Order failed: {}", detail);
                    let _ = self
                        .notifier
                        .notify(&format!("{}: order failed: {}", self.config.symbol, detail))
                        .await;
                    self.poll_interval
                }
                Err(BotError::Persistence(e)) => {
                    // The order (if any) already executed on the venue; the
                    // trade stands even though the ledger missed it.
                    tracing::error!("Ledger operation failed: {}", e);
                    self.poll_interval
                }
                Err(e) => return Err(e),
            };

            self.sleep_or_shutdown(delay).await;
        }
    }

    async fn sleep_or_shutdown(&mut self, delay: Duration) {
        tokio::select! {
            _ = sleep(delay) => {}
            _ = self.shutdown_rx.changed() => {}
        }
    }

    async fn run_cycle(&mut self) -> Result<CycleStatus> {
        let price = self.venue.current_price(&self.config.symbol).await?;
        let candles = self
            .venue
            .recent_candles(&self.config.symbol, self.config.interval)
            .await?;
        let closes: Vec<f64> = candles.iter().map(|c| c.close).collect();

        let short_avg = moving_average(&closes, self.config.short_period)?;
        let long_avg = moving_average(&closes, self.config.long_period)?;

        let signal = self.detector.evaluate(short_avg, long_avg);
        tracing::debug!(
            "{} @ {:.4} | short {:.4} / long {:.4} -> {:?}",
            self.config.symbol,
            price,
            short_avg,
            long_avg,
            signal
        );

        let action = match signal {
            CrossSignal::CrossUp => self.try_buy(short_avg, long_avg).await?,
            CrossSignal::CrossDown => self.try_sell(short_avg, long_avg).await?,
            CrossSignal::None => CycleAction::None,
        };

        Ok(CycleStatus {
            symbol: self.config.symbol.clone(),
            price,
            short_avg,
            long_avg,
            signal,
            action,
            timestamp: Utc::now(),
        })
    }

    /// CROSS_UP: spend the full free quote balance, gated on the configured
    /// minimum trade amount.
    async fn try_buy(&mut self, short_avg: f64, long_avg: f64) -> Result<CycleAction> {
        let (base_asset, quote_asset) = self.config.assets()?;

        // Both balances are snapshotted before the order so the record
        // reflects the state the decision was made on.
        let quote_free = self.venue.free_balance(quote_asset).await?;
        let base_free = self.venue.free_balance(base_asset).await?;

        if !authorize_buy(quote_free, self.config.trade_amount_quote) {
            tracing::info!(
                "CROSS_UP on {} but only {:.2} {} free (need {:.2}), holding",
                self.config.symbol,
                quote_free,
                quote_asset,
                self.config.trade_amount_quote
            );
            return Ok(CycleAction::None);
        }

        tracing::info!(
            "Placing market BUY on {} for {:.2} {}",
            self.config.symbol,
            quote_free,
            quote_asset
        );
        let fill = OrderExecutor::new(&self.venue)
            .submit(
                &self.config.symbol,
                TradeSide::Buy,
                OrderSizing::QuoteAmount(quote_free),
            )
            .await?;

        // The order is live on the venue from here on; commit the crossover
        // state before anything else can fail.
        self.detector.confirm(CrossSignal::CrossUp);

        let record = TradeRecord {
            symbol: self.config.symbol.clone(),
            side: TradeSide::Buy,
            quantity: fill.filled_quantity,
            price: fill.avg_price,
            pnl: None,
            usdt_balance: quote_free,
            crypto_balance: base_free,
            short_ema: Some(short_avg),
            long_ema: Some(long_avg),
            timestamp: Utc::now(),
        };
        self.ledger.record(&record).await?;

        let _ = self
            .notifier
            .notify(&format!(
                "BUY {:.6} {} @ {:.4} (spent {:.2} {})",
                fill.filled_quantity,
                self.config.symbol,
                fill.avg_price,
                fill.cumulative_quote,
                quote_asset
            ))
            .await;

        Ok(CycleAction::Bought {
            quantity: fill.filled_quantity,
            cost: fill.cumulative_quote,
        })
    }

    /// CROSS_DOWN: sell the full free base balance, gated on the dust
    /// threshold, and realize PnL against the most recent unmatched BUY.
    async fn try_sell(&mut self, short_avg: f64, long_avg: f64) -> Result<CycleAction> {
        let (base_asset, quote_asset) = self.config.assets()?;

        let base_free = self.venue.free_balance(base_asset).await?;
        let quote_free = self.venue.free_balance(quote_asset).await?;

        if !authorize_sell(base_free, self.config.min_sell_threshold) {
            tracing::info!(
                "CROSS_DOWN on {} but only {:.8} {} free (dust), holding",
                self.config.symbol,
                base_free,
                base_asset
            );
            return Ok(CycleAction::None);
        }

        // Read the open BUY cost before submitting: it is a read-only query,
        // and doing it here means a ledger outage aborts the cycle before
        // any order is placed.
        let buy_cost = self.ledger.unmatched_buy_cost(&self.config.symbol).await?;

        tracing::info!(
            "Placing market SELL on {} for {:.8} {}",
            self.config.symbol,
            base_free,
            base_asset
        );
        let fill = OrderExecutor::new(&self.venue)
            .submit(
                &self.config.symbol,
                TradeSide::Sell,
                OrderSizing::BaseQuantity(base_free),
            )
            .await?;

        self.detector.confirm(CrossSignal::CrossDown);

        let pnl = buy_cost.map(|cost| fill.cumulative_quote - cost);
        match pnl {
            Some(value) => tracing::info!("Realized PnL: {:.2} {}", value, quote_asset),
            None => tracing::info!("SELL with no unmatched BUY, PnL not available"),
        }

        let record = TradeRecord {
            symbol: self.config.symbol.clone(),
            side: TradeSide::Sell,
            quantity: fill.filled_quantity,
            price: fill.avg_price,
            pnl,
            usdt_balance: quote_free,
            crypto_balance: base_free,
            short_ema: Some(short_avg),
            long_ema: Some(long_avg),
            timestamp: Utc::now(),
        };
        self.ledger.record(&record).await?;

        let _ = self
            .notifier
            .notify(&match pnl {
                Some(value) => format!(
                    "SELL {:.6} {} @ {:.4} (PnL {:+.2} {})",
                    fill.filled_quantity,
                    self.config.symbol,
                    fill.avg_price,
                    value,
                    quote_asset
                ),
                None => format!(
                    "SELL {:.6} {} @ {:.4}",
                    fill.filled_quantity, self.config.symbol, fill.avg_price
                ),
            })
            .await;

        Ok(CycleAction::Sold {
            quantity: fill.filled_quantity,
            proceeds: fill.cumulative_quote,
            pnl,
        })
    }
}
