use std::time::Duration;

/// Public snapshot of one upstream RPC endpoint, returned through
/// `ChainAdapter::health` and surfaced at `/v1/stats` (spec §6).
#[derive(Debug, Clone)]
pub struct EndpointHealth {
    pub url: String,
    pub circuit_open: bool,
    pub consecutive_failures: u32,
    pub p50_latency: Option<Duration>,
    pub p99_latency: Option<Duration>,
}

/// Aggregate health of the chain adapter (spec §4.5's health snapshot).
#[derive(Debug, Clone)]
pub struct ChainAdapterHealth {
    pub endpoints: Vec<EndpointHealth>,
    pub cached_blockhash_age: Option<Duration>,
}

impl ChainAdapterHealth {
    pub fn has_available_endpoint(&self) -> bool {
        self.endpoints.iter().any(|e| !e.circuit_open)
    }
}
