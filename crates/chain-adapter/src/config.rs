use std::time::Duration;

/// Tunables for endpoint failover, retry pacing, and caching (spec §4.5).
#[derive(Debug, Clone, Copy)]
pub struct AdapterConfig {
    pub breaker_failure_threshold: u32,
    pub breaker_open_duration: Duration,
    pub blockhash_cache_ttl: Duration,
    pub latency_ring_size: usize,
    pub base_backoff: Duration,
    pub max_backoff: Duration,
}

impl Default for AdapterConfig {
    fn default() -> Self {
        Self {
            breaker_failure_threshold: 5,
            breaker_open_duration: Duration::from_secs(30),
            blockhash_cache_ttl: Duration::from_secs(30),
            latency_ring_size: 50,
            base_backoff: Duration::from_millis(250),
            max_backoff: Duration::from_secs(4),
        }
    }
}

/// `base * 2^attempt` capped at `max_backoff`, with up to 25% jitter so a
/// cluster of retrying clients doesn't re-hit the same endpoint in lockstep.
pub fn backoff_delay(config: &AdapterConfig, attempt: u32) -> Duration {
    let exp = config.base_backoff.saturating_mul(1u32.checked_shl(attempt).unwrap_or(u32::MAX));
    let capped = exp.min(config.max_backoff);
    let jitter_ms = rand::random::<f64>() * capped.as_millis() as f64 * 0.25;
    capped + Duration::from_millis(jitter_ms as u64)
}
