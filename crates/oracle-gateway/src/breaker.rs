use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;

/// Single circuit breaker guarding calls to the external pricing oracle
/// (spec §4.6: "each oracle query is backed by a timeout and circuit
/// breaker"). One instance per query kind, so a run of `feeInToken` failures
/// doesn't also blind `userDiscount`.
pub struct Breaker {
    failure_threshold: u32,
    open_duration: chrono::Duration,
    state: Mutex<BreakerState>,
}

#[derive(Default)]
struct BreakerState {
    consecutive_failures: u32,
    open_until: Option<DateTime<Utc>>,
}

impl Breaker {
    pub fn new(failure_threshold: u32, open_duration: Duration) -> Self {
        Self {
            failure_threshold,
            open_duration: chrono::Duration::from_std(open_duration).unwrap_or(chrono::Duration::seconds(30)),
            state: Mutex::new(BreakerState::default()),
        }
    }

    pub fn is_open(&self) -> bool {
        let state = self.state.lock();
        state.open_until.is_some_and(|until| Utc::now() < until)
    }

    pub fn record_success(&self) {
        let mut state = self.state.lock();
        state.consecutive_failures = 0;
        state.open_until = None;
    }

    pub fn record_failure(&self) {
        let mut state = self.state.lock();
        state.consecutive_failures += 1;
        if state.consecutive_failures >= self.failure_threshold {
            state.open_until = Some(Utc::now() + self.open_duration);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn opens_after_threshold_failures_and_closes_on_success() {
        let breaker = Breaker::new(2, Duration::from_secs(30));
        assert!(!breaker.is_open());
        breaker.record_failure();
        assert!(!breaker.is_open());
        breaker.record_failure();
        assert!(breaker.is_open());

        breaker.record_success();
        assert!(!breaker.is_open());
    }
}
