use crate::models::CrossSignal;

/// Last confirmed side of the short average relative to the long average.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trend {
    Unset,
    Above,
    Below,
}

/// Crossover state machine with hysteresis: at most one signal per direction.
///
/// `evaluate` is pure and `confirm` commits the transition separately. The
/// caller confirms only once the resulting order is actually live on the
/// venue, so a rejected order leaves the same signal armed for the next
/// cycle.
#[derive(Debug, Clone)]
pub struct CrossoverDetector {
    state: Trend,
}

impl CrossoverDetector {
    pub fn new() -> Self {
        Self { state: Trend::Unset }
    }

    /// Resume from a known direction, e.g. derived from the trade ledger
    /// after a restart.
    pub fn with_state(state: Trend) -> Self {
        Self { state }
    }

    pub fn state(&self) -> Trend {
        self.state
    }

    /// Compare a new pair of averages against the confirmed trend.
    ///
    /// Exact ties emit `None` and never transition, so a flat market cannot
    /// thrash orders.
    pub fn evaluate(&self, short_avg: f64, long_avg: f64) -> CrossSignal {
        if short_avg > long_avg && self.state != Trend::Above {
            CrossSignal::CrossUp
        } else if short_avg < long_avg && self.state != Trend::Below {
            CrossSignal::CrossDown
        } else {
            CrossSignal::None
        }
    }

    /// Commit the transition for a signal whose order went through.
    pub fn confirm(&mut self, signal: CrossSignal) {
        match signal {
            CrossSignal::CrossUp => self.state = Trend::Above,
            CrossSignal::CrossDown => self.state = Trend::Below,
            CrossSignal::None => {}
        }
    }
}

impl Default for CrossoverDetector {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cross_up_fires_once() {
        let mut detector = CrossoverDetector::new();

        let signal = detector.evaluate(10.0, 5.0);
        assert_eq!(signal, CrossSignal::CrossUp);
        detector.confirm(signal);

        // Same trend again: no re-trigger.
        assert_eq!(detector.evaluate(10.0, 5.0), CrossSignal::None);
        assert_eq!(detector.state(), Trend::Above);
    }

    #[test]
    fn test_direction_flips_cleanly() {
        let mut detector = CrossoverDetector::new();

        detector.confirm(detector.evaluate(10.0, 5.0));
        assert_eq!(detector.state(), Trend::Above);

        let signal = detector.evaluate(5.0, 10.0);
        assert_eq!(signal, CrossSignal::CrossDown);
        detector.confirm(signal);
        assert_eq!(detector.state(), Trend::Below);
    }

    #[test]
    fn test_tie_is_never_a_crossover() {
        let detector = CrossoverDetector::new();
        assert_eq!(detector.evaluate(7.0, 7.0), CrossSignal::None);

        let detector = CrossoverDetector::with_state(Trend::Above);
        assert_eq!(detector.evaluate(7.0, 7.0), CrossSignal::None);

        let detector = CrossoverDetector::with_state(Trend::Below);
        assert_eq!(detector.evaluate(7.0, 7.0), CrossSignal::None);
    }

    #[test]
    fn test_unconfirmed_signal_stays_armed() {
        let mut detector = CrossoverDetector::new();

        assert_eq!(detector.evaluate(10.0, 5.0), CrossSignal::CrossUp);
        // Order failed; nothing confirmed.
        assert_eq!(detector.state(), Trend::Unset);

        // Next cycle re-emits the same signal.
        assert_eq!(detector.evaluate(10.0, 5.0), CrossSignal::CrossUp);

        detector.confirm(CrossSignal::CrossUp);
        assert_eq!(detector.evaluate(10.0, 5.0), CrossSignal::None);
    }

    #[test]
    fn test_restored_state_suppresses_duplicate() {
        // A restart that restores `Above` must not re-buy on a rising market.
        let detector = CrossoverDetector::with_state(Trend::Above);
        assert_eq!(detector.evaluate(10.0, 5.0), CrossSignal::None);
        assert_eq!(detector.evaluate(5.0, 10.0), CrossSignal::CrossDown);
    }

    #[test]
    fn test_confirm_none_is_a_no_op() {
        let mut detector = CrossoverDetector::with_state(Trend::Above);
        detector.confirm(CrossSignal::None);
        assert_eq!(detector.state(), Trend::Above);
    }
}
