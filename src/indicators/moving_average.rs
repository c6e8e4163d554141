use crate::error::BotError;
use crate::Result;

/// Arithmetic mean of the last `period` closes (most recent last).
///
/// Both averages of a crossover pair must come through this function so they
/// share the same f64 rounding behavior; mixing precision domains produces
/// spurious crossovers.
pub fn moving_average(closes: &[f64], period: usize) -> Result<f64> {
    if period == 0 {
        return Err(BotError::Config(
            "moving average period must be at least 1".into(),
        ));
    }
    if closes.len() < period {
        return Err(BotError::InsufficientData {
            have: closes.len(),
            need: period,
        });
    }

    let sum: f64 = closes.iter().rev().take(period).sum();
    Ok(sum / period as f64)
}
