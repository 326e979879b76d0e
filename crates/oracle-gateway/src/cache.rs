use std::{hash::Hash as StdHash, time::Duration};

use chrono::{DateTime, Utc};
use dashmap::DashMap;

/// Per-key 60s TTL cache (spec §4.6), one table per query kind.
pub struct KeyedCache<K, V> {
    ttl: chrono::Duration,
    entries: DashMap<K, (V, DateTime<Utc>)>,
}

impl<K: StdHash + Eq + Clone, V: Clone> KeyedCache<K, V> {
    pub fn new(ttl: Duration) -> Self {
        Self { ttl: chrono::Duration::from_std(ttl).unwrap_or(chrono::Duration::seconds(60)), entries: DashMap::new() }
    }

    pub fn get_fresh(&self, key: &K) -> Option<V> {
        let now = Utc::now();
        self.entries.get(key).and_then(|entry| {
            let (value, stored_at) = entry.value();
            if now - *stored_at < self.ttl {
                Some(value.clone())
            } else {
                None
            }
        })
    }

    pub fn set(&self, key: K, value: V) {
        self.entries.insert(key, (value, Utc::now()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_entry_is_returned_and_stale_is_not() {
        let cache: KeyedCache<u32, &str> = KeyedCache::new(Duration::from_millis(5));
        cache.set(1, "a");
        assert_eq!(cache.get_fresh(&1), Some("a"));
        std::thread::sleep(Duration::from_millis(10));
        assert_eq!(cache.get_fresh(&1), None);
    }

    #[test]
    fn distinct_keys_are_independent() {
        let cache: KeyedCache<u32, &str> = KeyedCache::new(Duration::from_secs(60));
        cache.set(1, "a");
        assert_eq!(cache.get_fresh(&2), None);
    }
}
