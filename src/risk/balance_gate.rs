/// A BUY is allowed when the free quote balance covers the configured trade
/// amount. The boundary is inclusive: exactly the configured amount passes.
pub fn authorize_buy(quote_free: f64, trade_amount: f64) -> bool {
    quote_free >= trade_amount
}

/// A SELL is allowed when the free base balance clears the dust threshold,
/// keeping orders above the venue's minimum lot size. Strict comparison:
/// exactly the threshold is still dust.
pub fn authorize_sell(base_free: f64, dust_threshold: f64) -> bool {
    base_free > dust_threshold
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_buy_boundary_inclusive() {
        assert!(!authorize_buy(9.99, 10.0));
        assert!(authorize_buy(10.0, 10.0));
        assert!(authorize_buy(250.0, 10.0));
    }

    #[test]
    fn test_sell_dust_threshold_strict() {
        assert!(!authorize_sell(0.0, 0.0001));
        assert!(!authorize_sell(0.0001, 0.0001));
        assert!(authorize_sell(0.00011, 0.0001));
        assert!(authorize_sell(1.5, 0.0001));
    }
}
