use crate::error::BotError;
use crate::Result;

/// Candle intervals accepted by the venue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interval {
    OneMinute,
    FiveMinutes,
    FifteenMinutes,
    OneHour,
    OneDay,
}

impl Interval {
    pub fn as_str(&self) -> &'static str {
        match self {
            Interval::OneMinute => "1m",
            Interval::FiveMinutes => "5m",
            Interval::FifteenMinutes => "15m",
            Interval::OneHour => "1h",
            Interval::OneDay => "1d",
        }
    }
}

impl std::str::FromStr for Interval {
    type Err = BotError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "1m" => Ok(Interval::OneMinute),
            "5m" => Ok(Interval::FiveMinutes),
            "15m" => Ok(Interval::FifteenMinutes),
            "1h" => Ok(Interval::OneHour),
            "1d" => Ok(Interval::OneDay),
            other => Err(BotError::Config(format!(
                "unknown interval '{}' (expected 1m, 5m, 15m, 1h or 1d)",
                other
            ))),
        }
    }
}

impl std::fmt::Display for Interval {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Quote assets we know how to split a symbol on, longest first so that
/// e.g. "BTCUSDT" resolves as BTC/USDT and not BTC-USD + T.
const QUOTE_ASSETS: &[&str] = &["USDT", "USDC", "BUSD", "BTC", "ETH"];

/// Immutable parameters for one trading-loop run.
///
/// Credentials are deliberately not part of this struct; they belong to the
/// venue client only.
#[derive(Debug, Clone)]
pub struct TradingConfig {
    /// Trading pair, e.g. "BTCUSDT".
    pub symbol: String,
    pub interval: Interval,
    pub short_period: usize,
    pub long_period: usize,
    /// Minimum free quote balance required before a BUY is placed.
    pub trade_amount_quote: f64,
    /// Dust threshold; SELL orders below this base quantity are skipped.
    pub min_sell_threshold: f64,
}

impl TradingConfig {
    /// Fail-fast validation, run once before the loop starts.
    pub fn validate(&self) -> Result<()> {
        self.assets()?;
        if self.short_period == 0 || self.long_period == 0 {
            return Err(BotError::Config(
                "moving-average periods must be at least 1".into(),
            ));
        }
        if self.trade_amount_quote <= 0.0 {
            return Err(BotError::Config(format!(
                "trade amount must be positive, got {}",
                self.trade_amount_quote
            )));
        }
        if self.min_sell_threshold < 0.0 {
            return Err(BotError::Config(format!(
                "sell threshold must not be negative, got {}",
                self.min_sell_threshold
            )));
        }
        Ok(())
    }

    /// Split the symbol into (base, quote), e.g. "BTCUSDT" -> ("BTC", "USDT").
    pub fn assets(&self) -> Result<(&str, &str)> {
        QUOTE_ASSETS
            .iter()
            .find_map(|quote| {
                self.symbol
                    .strip_suffix(quote)
                    .filter(|base| !base.is_empty())
                    .map(|base| (base, *quote))
            })
            .ok_or_else(|| {
                BotError::Config(format!(
                    "cannot determine base/quote assets of symbol '{}'",
                    self.symbol
                ))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(symbol: &str) -> TradingConfig {
        TradingConfig {
            symbol: symbol.to_string(),
            interval: Interval::OneHour,
            short_period: 7,
            long_period: 25,
            trade_amount_quote: 10.0,
            min_sell_threshold: 0.0001,
        }
    }

    #[test]
    fn test_interval_round_trip() {
        for s in ["1m", "5m", "15m", "1h", "1d"] {
            let interval: Interval = s.parse().unwrap();
            assert_eq!(interval.as_str(), s);
        }
    }

    #[test]
    fn test_unknown_interval_rejected() {
        let err = "3d".parse::<Interval>().unwrap_err();
        assert!(matches!(err, BotError::Config(_)));
    }

    #[test]
    fn test_asset_split() {
        assert_eq!(config("BTCUSDT").assets().unwrap(), ("BTC", "USDT"));
        assert_eq!(config("ETHBTC").assets().unwrap(), ("ETH", "BTC"));
        assert_eq!(config("SOLUSDC").assets().unwrap(), ("SOL", "USDC"));
    }

    #[test]
    fn test_unsplittable_symbol_rejected() {
        assert!(config("USDT").validate().is_err());
        assert!(config("DOGE").validate().is_err());
    }

    #[test]
    fn test_validate_periods_and_amounts() {
        let mut cfg = config("BTCUSDT");
        assert!(cfg.validate().is_ok());

        cfg.short_period = 0;
        assert!(cfg.validate().is_err());

        let mut cfg = config("BTCUSDT");
        cfg.trade_amount_quote = 0.0;
        assert!(cfg.validate().is_err());

        let mut cfg = config("BTCUSDT");
        cfg.min_sell_threshold = -1.0;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_short_above_long_is_convention_not_error() {
        let mut cfg = config("BTCUSDT");
        cfg.short_period = 25;
        cfg.long_period = 7;
        assert!(cfg.validate().is_ok());
    }
}
