use std::time::Duration;

/// Tunables the pool needs; lifted out of `relay_types::RelayConfig` at
/// construction time so this crate doesn't depend on the whole config type.
#[derive(Debug, Clone, Copy)]
pub struct PoolConfig {
    pub min_healthy_balance_lamports: u64,
    pub max_reservations_per_payer: usize,
    pub reservation_ttl: Duration,
    /// Consecutive full-scan misses before the breaker opens.
    pub breaker_failure_threshold: u32,
    pub breaker_open_duration: Duration,
    /// How long a payer stays unhealthy after a non-retryable send failure.
    pub unhealthy_duration_after_failure: Duration,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            min_healthy_balance_lamports: 50_000_000,
            max_reservations_per_payer: 50,
            reservation_ttl: Duration::from_millis(90_000),
            breaker_failure_threshold: 5,
            breaker_open_duration: Duration::from_secs(30),
            unhealthy_duration_after_failure: Duration::from_secs(60),
        }
    }
}
