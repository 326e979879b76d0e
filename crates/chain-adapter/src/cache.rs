use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use solana_sdk::hash::Hash;

/// A value refreshed lazily on a fixed TTL, shared by the blockhash cache
/// (30s, spec §4.5) and the oracle gateway's per-query caches (60s, §4.6).
pub struct TtlCache<T> {
    ttl: chrono::Duration,
    value: Mutex<Option<(T, DateTime<Utc>)>>,
}

impl<T: Clone> TtlCache<T> {
    pub fn new(ttl: std::time::Duration) -> Self {
        Self { ttl: chrono::Duration::from_std(ttl).unwrap_or(chrono::Duration::seconds(30)), value: Mutex::new(None) }
    }

    pub fn get_fresh(&self, now: DateTime<Utc>) -> Option<T> {
        let guard = self.value.lock();
        guard.as_ref().and_then(|(v, stored_at)| if now - *stored_at < self.ttl { Some(v.clone()) } else { None })
    }

    pub fn set(&self, value: T, now: DateTime<Utc>) {
        *self.value.lock() = Some((value, now));
    }

    pub fn age(&self, now: DateTime<Utc>) -> Option<chrono::Duration> {
        self.value.lock().as_ref().map(|(_, stored_at)| now - *stored_at)
    }
}

pub type BlockhashCache = TtlCache<(Hash, u64)>;
