use clap::Parser;
use emabot::api::BinanceClient;
use emabot::config::{Interval, TradingConfig};
use emabot::execution::TradingLoop;
use emabot::ledger::TradeLedger;
use emabot::notify::TelegramNotifier;
use tokio::sync::watch;
use tokio::time::Duration;

/// EMA-crossover spot trading bot.
///
/// Credentials are read from the environment (`B_API_KEY` / `B_API_SECRET`,
/// optionally via a .env file), never from the command line.
#[derive(Parser, Debug)]
#[command(name = "emabot")]
struct Args {
    /// Trading pair, e.g. BTCUSDT
    symbol: String,

    /// Candle interval: 1m, 5m, 15m, 1h or 1d
    interval: Interval,

    /// Short moving-average period, e.g. 7
    short_period: usize,

    /// Long moving-average period, e.g. 25
    long_period: usize,

    /// Minimum free quote balance required before a BUY is placed
    #[arg(long, default_value_t = 10.0)]
    trade_amount: f64,

    /// Dust threshold below which SELL orders are skipped
    #[arg(long, default_value_t = 0.0001)]
    min_sell_threshold: f64,

    /// SQLite trade ledger location
    #[arg(long, default_value = "sqlite:trading_bot.db")]
    database_url: String,

    /// Seconds between polls
    #[arg(long, default_value_t = 5)]
    poll_interval: u64,

    /// Enable Telegram trade reports (TELEGRAM_TOKEN / TELEGRAM_CHAT_ID)
    #[arg(long)]
    enable_telegram: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    setup_logging();

    let args = Args::parse();

    let api_key = std::env::var("B_API_KEY")
        .map_err(|_| anyhow::anyhow!("B_API_KEY not found in environment"))?;
    let api_secret = std::env::var("B_API_SECRET")
        .map_err(|_| anyhow::anyhow!("B_API_SECRET not found in environment"))?;

    let config = TradingConfig {
        symbol: args.symbol.to_uppercase(),
        interval: args.interval,
        short_period: args.short_period,
        long_period: args.long_period,
        trade_amount_quote: args.trade_amount,
        min_sell_threshold: args.min_sell_threshold,
    };

    let venue = BinanceClient::new(api_key, api_secret);
    let ledger = TradeLedger::connect(&args.database_url).await?;
    let notifier = if args.enable_telegram {
        TelegramNotifier::from_env()
    } else {
        TelegramNotifier::disabled()
    };

    // Cooperative shutdown: Ctrl+C raises the flag, the loop checks it
    // between cycles so an in-flight order always completes.
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Ctrl+C received, finishing the current cycle before exit");
            let _ = shutdown_tx.send(true);
        }
    });

    let mut bot = TradingLoop::new(venue, config, ledger, notifier, shutdown_rx)
        .await?
        .with_poll_interval(Duration::from_secs(args.poll_interval));

    // Observer: one log line per cycle, decoupled from the decision loop.
    let mut status_rx = bot.status();
    tokio::spawn(async move {
        while status_rx.changed().await.is_ok() {
            let status = status_rx.borrow_and_update().clone();
            if let Some(status) = status {
                tracing::info!(
                    "{} @ {:.4} | short {:.4} / long {:.4} | {:?}",
                    status.symbol,
                    status.price,
                    status.short_avg,
                    status.long_avg,
                    status.action
                );
            }
        }
    });

    bot.run().await?;

    tracing::info!("Trading bot stopped");
    Ok(())
}

fn setup_logging() {
    tracing_subscriber::fmt()
        .with_env_filter("emabot=info")
        .init();
}
