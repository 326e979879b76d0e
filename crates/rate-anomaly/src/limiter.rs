use std::net::IpAddr;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use relay_types::config::RateLimitConfig;
use solana_sdk::pubkey::Pubkey;
use tracing::warn;

use crate::counters::{Bucket, EventKind};

/// `::ffff:a.b.c.d` is the IPv4-mapped-in-IPv6 form a dual-stack listener can
/// hand back for an IPv4 peer; keying on it verbatim would let a client
/// bypass its IPv4 bucket by dialing in over the v6 stack (spec §4.9 /
/// §8 boundary behavior).
pub fn normalize_ip(ip: IpAddr) -> IpAddr {
    match ip {
        IpAddr::V6(v6) => v6.to_ipv4_mapped().map(IpAddr::V4).unwrap_or(IpAddr::V6(v6)),
        v4 => v4,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateLimitOutcome {
    Allowed,
    WalletLimited,
    IpLimited,
}

/// Per-wallet and per-IP sliding-window rate limiter (spec C9 / §4.9).
pub struct RateLimiter {
    wallets: DashMap<Pubkey, Bucket>,
    ips: DashMap<IpAddr, Bucket>,
    config: RateLimitConfig,
}

impl RateLimiter {
    pub fn new(config: RateLimitConfig) -> Self {
        Self { wallets: DashMap::new(), ips: DashMap::new(), config }
    }

    fn wallet_bucket(&self, wallet: &Pubkey, now: DateTime<Utc>) -> dashmap::mapref::one::Ref<'_, Pubkey, Bucket> {
        self.wallets.entry(*wallet).or_insert_with(|| Bucket::new(now));
        self.wallets.get(wallet).expect("just inserted")
    }

    fn ip_bucket(&self, ip: IpAddr, now: DateTime<Utc>) -> dashmap::mapref::one::Ref<'_, IpAddr, Bucket> {
        self.ips.entry(ip).or_insert_with(|| Bucket::new(now));
        self.ips.get(&ip).expect("just inserted")
    }

    /// Records the event unconditionally (so the anomaly detector still sees
    /// it even when this call is about to reject) and reports whether it was
    /// within the configured limits.
    pub fn check_and_record(&self, wallet: &Pubkey, ip: IpAddr, kind: EventKind) -> RateLimitOutcome {
        let now = Utc::now();
        let ip = normalize_ip(ip);

        let wallet_bucket = self.wallet_bucket(wallet, now);
        let ip_bucket = self.ip_bucket(ip, now);
        wallet_bucket.record(kind, now);
        ip_bucket.record(kind, now);

        let ip_global = ip_bucket.count_60s(EventKind::Quote, now)
            + ip_bucket.count_60s(EventKind::Submit, now)
            + ip_bucket.count_60s(EventKind::Failure, now);
        if ip_global > self.config.ip_global_per_min as usize {
            metrics::counter!("relayer.rate_limit.ip_global_exceeded", 1);
            warn!(%ip, count = ip_global, "global per-ip rate limit exceeded");
            return RateLimitOutcome::IpLimited;
        }

        let (ip_limit, wallet_limit) = match kind {
            EventKind::Quote => (self.config.ip_quote_per_min, self.config.wallet_quote_per_min),
            EventKind::Submit => (self.config.ip_submit_per_min, self.config.wallet_submit_per_min),
            EventKind::Failure => return RateLimitOutcome::Allowed,
        };

        if wallet_bucket.count_60s(kind, now) > wallet_limit as usize {
            metrics::counter!("relayer.rate_limit.wallet_exceeded", 1);
            return RateLimitOutcome::WalletLimited;
        }
        if ip_bucket.count_60s(kind, now) > ip_limit as usize {
            metrics::counter!("relayer.rate_limit.ip_exceeded", 1);
            return RateLimitOutcome::IpLimited;
        }

        RateLimitOutcome::Allowed
    }

    pub fn wallet_total_5min(&self, wallet: &Pubkey) -> usize {
        let now = Utc::now();
        self.wallets.get(wallet).map(|b| b.total_5min(now)).unwrap_or(0)
    }

    pub fn ip_total_5min(&self, ip: IpAddr) -> usize {
        let now = Utc::now();
        self.ips.get(&normalize_ip(ip)).map(|b| b.total_5min(now)).unwrap_or(0)
    }

    pub fn global_total_5min(&self) -> usize {
        let now = Utc::now();
        self.ips.iter().map(|entry| entry.value().total_5min(now)).sum()
    }

    /// Per-wallet 5-minute totals for every wallet with recent activity, fed
    /// into the anomaly detector's baseline samples each tick.
    pub fn wallet_totals_5min(&self) -> Vec<(Pubkey, usize)> {
        let now = Utc::now();
        self.wallets.iter().map(|entry| (*entry.key(), entry.value().total_5min(now))).collect()
    }

    pub fn ip_totals_5min(&self) -> Vec<(IpAddr, usize)> {
        let now = Utc::now();
        self.ips.iter().map(|entry| (*entry.key(), entry.value().total_5min(now))).collect()
    }

    /// Drops buckets idle for more than 5 minutes (spec §3's GC rule).
    pub fn gc(&self) {
        let now = Utc::now();
        let idle = chrono::Duration::minutes(5);
        self.wallets.retain(|_, bucket| !bucket.is_idle(now, idle));
        self.ips.retain(|_, bucket| !bucket.is_idle(now, idle));
    }
}

#[cfg(test)]
mod tests {
    use std::net::Ipv6Addr;

    use super::*;

    #[test]
    fn ipv4_mapped_ipv6_normalizes_to_ipv4() {
        let mapped = IpAddr::V6(Ipv6Addr::new(0, 0, 0, 0, 0, 0xffff, 0x0a0a, 0x0a01));
        assert_eq!(normalize_ip(mapped), "10.10.10.1".parse::<IpAddr>().unwrap());
    }

    #[test]
    fn wallet_submit_limit_trips_on_eleventh_request() {
        let config = RateLimitConfig { wallet_submit_per_min: 10, ..RateLimitConfig::default() };
        let limiter = RateLimiter::new(config);
        let wallet = Pubkey::new_unique();
        let ip: IpAddr = "127.0.0.1".parse().unwrap();

        let mut last = RateLimitOutcome::Allowed;
        for _ in 0..11 {
            last = limiter.check_and_record(&wallet, ip, EventKind::Submit);
        }
        assert_eq!(last, RateLimitOutcome::WalletLimited);
    }

    #[test]
    fn distinct_wallets_have_independent_budgets() {
        let limiter = RateLimiter::new(RateLimitConfig::default());
        let ip: IpAddr = "10.0.0.1".parse().unwrap();
        for _ in 0..5 {
            limiter.check_and_record(&Pubkey::new_unique(), ip, EventKind::Quote);
        }
        // Five distinct wallets each issuing one quote must not trip the
        // per-wallet limit, only (eventually) the shared per-IP one.
        assert_eq!(limiter.check_and_record(&Pubkey::new_unique(), ip, EventKind::Quote), RateLimitOutcome::Allowed);
    }
}
