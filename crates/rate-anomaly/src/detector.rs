use std::{collections::HashMap, net::IpAddr};

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use relay_types::config::AnomalyConfig;
use solana_sdk::pubkey::Pubkey;
use tracing::warn;

use crate::{baseline::BaselineSamples, limiter::RateLimiter};

/// Hardcoded defaults used only until the learning window has produced
/// enough samples to derive `mean + 3σ` (spec §9: "Start with fixed
/// defaults"). Not configurable via env because they're a cold-start
/// placeholder, not an operator tunable — `AnomalyConfig`'s fixed_* fields
/// are the supported override path.
const DEFAULT_WALLET_THRESHOLD: u32 = 40;
const DEFAULT_IP_THRESHOLD: u32 = 150;
const DEFAULT_GLOBAL_THRESHOLD: u32 = 600;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AnomalyKind {
    Wallet,
    Ip,
    Global,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum AnomalySubject {
    Wallet(Pubkey),
    Ip(IpAddr),
    Global,
}

impl AnomalySubject {
    fn dedup_key(&self) -> String {
        match self {
            AnomalySubject::Wallet(pk) => format!("wallet:{pk}"),
            AnomalySubject::Ip(ip) => format!("ip:{ip}"),
            AnomalySubject::Global => "global".to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AnomalyEvent {
    pub kind: AnomalyKind,
    pub subject: AnomalySubject,
    pub observed: u32,
    pub threshold: u32,
}

#[derive(Default)]
struct Thresholds {
    wallet: Option<u32>,
    ip: Option<u32>,
    global: Option<u32>,
}

/// Anomaly detector (spec C9's second half): separately tracks 5-minute
/// totals per wallet/IP/global, runs a check every 30s, and either uses
/// fixed thresholds or learns them from a 30-minute warmup window.
pub struct AnomalyDetector {
    config: AnomalyConfig,
    learning_started_at: DateTime<Utc>,
    last_rederive: Mutex<DateTime<Utc>>,
    wallet_samples: Mutex<BaselineSamples>,
    ip_samples: Mutex<BaselineSamples>,
    global_samples: Mutex<BaselineSamples>,
    thresholds: Mutex<Thresholds>,
    dedup: Mutex<HashMap<String, DateTime<Utc>>>,
}

impl AnomalyDetector {
    pub fn new(config: AnomalyConfig, now: DateTime<Utc>) -> Self {
        Self {
            config,
            learning_started_at: now,
            last_rederive: Mutex::new(now),
            wallet_samples: Mutex::new(BaselineSamples::default()),
            ip_samples: Mutex::new(BaselineSamples::default()),
            global_samples: Mutex::new(BaselineSamples::default()),
            thresholds: Mutex::new(Thresholds::default()),
            dedup: Mutex::new(HashMap::new()),
        }
    }

    fn warmed_up(&self, now: DateTime<Utc>) -> bool {
        now - self.learning_started_at >= chrono::Duration::from_std(self.config.learning_window).unwrap_or_default()
    }

    fn effective_threshold(&self, kind: AnomalyKind, now: DateTime<Utc>) -> u32 {
        let fixed = match kind {
            AnomalyKind::Wallet => self.config.fixed_wallet_5min_threshold,
            AnomalyKind::Ip => self.config.fixed_ip_5min_threshold,
            AnomalyKind::Global => self.config.fixed_global_5min_threshold,
        };
        if let Some(fixed) = fixed {
            return fixed;
        }

        let default = match kind {
            AnomalyKind::Wallet => DEFAULT_WALLET_THRESHOLD,
            AnomalyKind::Ip => DEFAULT_IP_THRESHOLD,
            AnomalyKind::Global => DEFAULT_GLOBAL_THRESHOLD,
        };

        // Before the learning window closes, ignore any not-yet-converged
        // learned value and stay on the cold-start default (spec §9: "avoids
        // alerting on cold-start noise").
        if !self.warmed_up(now) {
            return default;
        }

        let learned = self.thresholds.lock();
        let learned_value = match kind {
            AnomalyKind::Wallet => learned.wallet,
            AnomalyKind::Ip => learned.ip,
            AnomalyKind::Global => learned.global,
        };
        learned_value.unwrap_or(default)
    }

    fn rederive_if_due(&self, now: DateTime<Utc>) {
        let mut last = self.last_rederive.lock();
        let interval = chrono::Duration::from_std(self.config.rederive_interval).unwrap_or_default();
        if now - *last < interval {
            return;
        }
        *last = now;

        let mut thresholds = self.thresholds.lock();
        thresholds.wallet = self.wallet_samples.lock().derive_threshold(self.config.min_samples, self.config.safety_floor);
        thresholds.ip = self.ip_samples.lock().derive_threshold(self.config.min_samples, self.config.safety_floor);
        thresholds.global =
            self.global_samples.lock().derive_threshold(self.config.min_samples, self.config.safety_floor);
    }

    fn should_emit(&self, subject: &AnomalySubject, now: DateTime<Utc>) -> bool {
        let mut dedup = self.dedup.lock();
        let key = subject.dedup_key();
        let dedup_window = chrono::Duration::minutes(5);
        match dedup.get(&key) {
            Some(last) if now - *last < dedup_window => false,
            _ => {
                dedup.insert(key, now);
                true
            }
        }
    }

    /// Runs one detection pass (spec: "runs checks every 30s"): feeds the
    /// current 5-minute totals into the baseline samples, rederives
    /// thresholds if the interval has elapsed, then reports anything over
    /// threshold that isn't deduplicated.
    pub fn tick(&self, limiter: &RateLimiter) -> Vec<AnomalyEvent> {
        let now = Utc::now();
        self.rederive_if_due(now);

        let mut events = Vec::new();

        let global_total = limiter.global_total_5min() as u32;
        self.global_samples.lock().push(global_total);
        let global_threshold = self.effective_threshold(AnomalyKind::Global, now);
        if global_total > global_threshold && self.should_emit(&AnomalySubject::Global, now) {
            events.push(AnomalyEvent {
                kind: AnomalyKind::Global,
                subject: AnomalySubject::Global,
                observed: global_total,
                threshold: global_threshold,
            });
        }

        for (wallet, total) in limiter.wallet_totals_5min() {
            let total = total as u32;
            self.wallet_samples.lock().push(total);
            let threshold = self.effective_threshold(AnomalyKind::Wallet, now);
            let subject = AnomalySubject::Wallet(wallet);
            if total > threshold && self.should_emit(&subject, now) {
                warn!(%wallet, observed = total, threshold, "wallet anomaly detected");
                events.push(AnomalyEvent { kind: AnomalyKind::Wallet, subject, observed: total, threshold });
            }
        }

        for (ip, total) in limiter.ip_totals_5min() {
            let total = total as u32;
            self.ip_samples.lock().push(total);
            let threshold = self.effective_threshold(AnomalyKind::Ip, now);
            let subject = AnomalySubject::Ip(ip);
            if total > threshold && self.should_emit(&subject, now) {
                warn!(%ip, observed = total, threshold, "ip anomaly detected");
                events.push(AnomalyEvent { kind: AnomalyKind::Ip, subject, observed: total, threshold });
            }
        }

        metrics::gauge!("relayer.anomaly.global_5min_total", global_total as f64);
        events
    }
}
