use thiserror::Error;

/// Error taxonomy for the trading loop.
///
/// `DataFetch` and `InsufficientData` are transient: the current cycle is
/// skipped and the loop retries after a backoff. `OrderExecution` preserves
/// the crossover state so the same signal can retry on the next poll.
/// `Persistence` is logged but never aborts the process, and `Config` is
/// fatal before the loop starts.
#[derive(Debug, Error)]
pub enum BotError {
    #[error("data fetch failed: {0}")]
    DataFetch(String),

    #[error("insufficient data: have {have} closes, need {need}")]
    InsufficientData { have: usize, need: usize },

    #[error("order execution failed: {0}")]
    OrderExecution(String),

    #[error("ledger operation failed: {0}")]
    Persistence(#[from] sqlx::Error),

    #[error("invalid configuration: {0}")]
    Config(String),
}

impl BotError {
    /// Whether the loop should skip the cycle and retry after a backoff.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            BotError::DataFetch(_) | BotError::InsufficientData { .. }
        )
    }
}

impl From<reqwest::Error> for BotError {
    fn from(err: reqwest::Error) -> Self {
        BotError::DataFetch(err.to_string())
    }
}
