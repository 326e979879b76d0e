//! Rate & Anomaly Layer (spec C9): per-wallet and per-IP sliding-window rate
//! limiting plus a learned-baseline anomaly detector, both fed from one
//! event stream so a single `record` call keeps both windows current.

mod baseline;
mod counters;
mod detector;
mod limiter;

pub use counters::EventKind;
pub use detector::{AnomalyDetector, AnomalyEvent, AnomalyKind, AnomalySubject};
pub use limiter::{normalize_ip, RateLimitOutcome, RateLimiter};

use std::net::IpAddr;

use relay_types::config::{AnomalyConfig, RateLimitConfig};
use solana_sdk::pubkey::Pubkey;

/// Facade over the rate limiter and the anomaly detector, the shape
/// `relay-core` depends on for both the quote and submit paths.
pub struct RateAnomalyLayer {
    pub limiter: RateLimiter,
    pub detector: AnomalyDetector,
}

impl RateAnomalyLayer {
    pub fn new(rate_limits: RateLimitConfig, anomaly: AnomalyConfig) -> Self {
        Self { limiter: RateLimiter::new(rate_limits), detector: AnomalyDetector::new(anomaly, chrono::Utc::now()) }
    }

    pub fn check(&self, wallet: &Pubkey, ip: IpAddr, kind: EventKind) -> RateLimitOutcome {
        self.limiter.check_and_record(wallet, ip, kind)
    }

    /// Background-task entry point: rate-anomaly's 30s tick (spec §5).
    pub fn tick_anomaly_detector(&self) -> Vec<AnomalyEvent> {
        self.detector.tick(&self.limiter)
    }

    pub fn gc(&self) {
        self.limiter.gc();
    }
}

#[cfg(test)]
mod tests {
    use relay_types::config::{AnomalyConfig, RateLimitConfig};

    use super::*;

    #[test]
    fn eleventh_submit_in_a_minute_is_wallet_limited() {
        let layer = RateAnomalyLayer::new(RateLimitConfig::default(), AnomalyConfig::default());
        let wallet = Pubkey::new_unique();
        let ip: IpAddr = "203.0.113.9".parse().unwrap();

        let mut last = RateLimitOutcome::Allowed;
        for _ in 0..11 {
            last = layer.check(&wallet, ip, EventKind::Submit);
        }
        assert_eq!(last, RateLimitOutcome::WalletLimited);
    }
}
