use std::{collections::VecDeque, time::Duration};

use chrono::{DateTime, Utc};

use crate::config::AdapterConfig;

/// Per-endpoint circuit breaker and latency history (spec §4.5: "each
/// upstream endpoint carries its own circuit breaker and latency ring").
pub struct EndpointState {
    pub url: String,
    consecutive_failures: u32,
    breaker_open_until: Option<DateTime<Utc>>,
    latencies: VecDeque<Duration>,
    ring_size: usize,
}

impl EndpointState {
    pub fn new(url: String, ring_size: usize) -> Self {
        Self { url, consecutive_failures: 0, breaker_open_until: None, latencies: VecDeque::with_capacity(ring_size), ring_size }
    }

    pub fn is_open(&self, now: DateTime<Utc>) -> bool {
        self.breaker_open_until.is_some_and(|until| now < until)
    }

    pub fn record_success(&mut self, latency: Duration) {
        self.consecutive_failures = 0;
        self.breaker_open_until = None;
        if self.latencies.len() == self.ring_size {
            self.latencies.pop_front();
        }
        self.latencies.push_back(latency);
    }

    pub fn record_failure(&mut self, config: &AdapterConfig, now: DateTime<Utc>) {
        self.consecutive_failures += 1;
        if self.consecutive_failures >= config.breaker_failure_threshold {
            self.breaker_open_until = Some(now + chrono::Duration::from_std(config.breaker_open_duration).unwrap_or(chrono::Duration::seconds(30)));
            metrics::counter!("relayer.chain_adapter.breaker_opened", 1, "endpoint" => self.url.clone());
        }
    }

    pub fn consecutive_failures(&self) -> u32 {
        self.consecutive_failures
    }

    pub fn p50_latency(&self) -> Option<Duration> {
        percentile(&self.latencies, 0.50)
    }

    pub fn p99_latency(&self) -> Option<Duration> {
        percentile(&self.latencies, 0.99)
    }
}

fn percentile(samples: &VecDeque<Duration>, p: f64) -> Option<Duration> {
    if samples.is_empty() {
        return None;
    }
    let mut sorted: Vec<Duration> = samples.iter().copied().collect();
    sorted.sort();
    let idx = ((sorted.len() as f64 - 1.0) * p).round() as usize;
    sorted.get(idx).copied()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn breaker_opens_after_threshold_consecutive_failures() {
        let config = AdapterConfig { breaker_failure_threshold: 3, ..Default::default() };
        let mut endpoint = EndpointState::new("http://a".to_string(), 50);
        let now = Utc::now();

        endpoint.record_failure(&config, now);
        endpoint.record_failure(&config, now);
        assert!(!endpoint.is_open(now));

        endpoint.record_failure(&config, now);
        assert!(endpoint.is_open(now));
    }

    #[test]
    fn success_resets_breaker_and_failure_count() {
        let config = AdapterConfig { breaker_failure_threshold: 2, ..Default::default() };
        let mut endpoint = EndpointState::new("http://a".to_string(), 50);
        let now = Utc::now();

        endpoint.record_failure(&config, now);
        endpoint.record_success(Duration::from_millis(10));
        assert_eq!(endpoint.consecutive_failures(), 0);
        assert!(!endpoint.is_open(now));
    }

    #[test]
    fn latency_ring_evicts_oldest_sample_past_capacity() {
        let mut endpoint = EndpointState::new("http://a".to_string(), 2);
        endpoint.record_success(Duration::from_millis(10));
        endpoint.record_success(Duration::from_millis(20));
        endpoint.record_success(Duration::from_millis(30));

        assert_eq!(endpoint.latencies.len(), 2);
        assert!(!endpoint.latencies.contains(&Duration::from_millis(10)));
    }

    #[test]
    fn percentiles_are_taken_from_sorted_samples() {
        let mut endpoint = EndpointState::new("http://a".to_string(), 50);
        for ms in [50, 10, 30, 20, 40] {
            endpoint.record_success(Duration::from_millis(ms));
        }
        assert_eq!(endpoint.p50_latency(), Some(Duration::from_millis(30)));
    }
}
