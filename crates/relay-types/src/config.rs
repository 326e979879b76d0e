use std::{env, time::Duration};

use solana_sdk::pubkey::Pubkey;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required env var {0}")]
    Missing(&'static str),
    #[error("invalid value for {key}: {source}")]
    InvalidPubkey { key: &'static str, source: String },
    #[error("invalid value for {key}: {source}")]
    InvalidNumber { key: &'static str, source: std::num::ParseIntError },
    #[error("FEE_PAYER_PRIVATE_KEYS must list at least one key")]
    NoFeePayers,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Network {
    Mainnet,
    Devnet,
}

/// Rate-limit overrides (spec §4.9 / §6). Falls back to the documented
/// defaults when the corresponding env var is unset.
#[derive(Debug, Clone, Copy)]
pub struct RateLimitConfig {
    pub ip_global_per_min: u32,
    pub ip_quote_per_min: u32,
    pub ip_submit_per_min: u32,
    pub wallet_quote_per_min: u32,
    pub wallet_submit_per_min: u32,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            ip_global_per_min: 100,
            ip_quote_per_min: 30,
            ip_submit_per_min: 10,
            wallet_quote_per_min: 20,
            wallet_submit_per_min: 10,
        }
    }
}

/// Anomaly-detector threshold overrides (spec §4.9). `None` keeps the
/// learned-threshold path; `Some` pins a fixed floor regardless of learning.
#[derive(Debug, Clone, Copy)]
pub struct AnomalyConfig {
    pub fixed_wallet_5min_threshold: Option<u32>,
    pub fixed_ip_5min_threshold: Option<u32>,
    pub fixed_global_5min_threshold: Option<u32>,
    pub learning_window: Duration,
    pub rederive_interval: Duration,
    pub min_samples: usize,
    pub safety_floor: u32,
}

impl Default for AnomalyConfig {
    fn default() -> Self {
        Self::defaults()
    }
}

impl AnomalyConfig {
    pub fn defaults() -> Self {
        Self {
            fixed_wallet_5min_threshold: None,
            fixed_ip_5min_threshold: None,
            fixed_global_5min_threshold: None,
            learning_window: Duration::from_secs(30 * 60),
            rederive_interval: Duration::from_secs(5 * 60),
            min_samples: 10,
            safety_floor: 20,
        }
    }
}

/// Top-level relayer configuration, populated from the environment
/// variables named in spec §6.
#[derive(Debug, Clone)]
pub struct RelayConfig {
    pub fee_payer_private_keys: Vec<String>,
    pub treasury_address: Pubkey,
    pub rpc_urls: Vec<String>,
    pub store_url: Option<String>,
    /// Base URL of the price/engagement oracle service (spec C6, an
    /// external collaborator). Not named among spec §6's enumerated env
    /// vars, but the oracle gateway can't be wired without an address for
    /// it, so this carries the same required-env-var contract as
    /// `rpc_urls`.
    pub oracle_url: String,
    pub network: Network,
    pub base_fee_lamports: u64,
    pub network_fee_lamports: u64,
    pub quote_ttl: Duration,
    pub reservation_ttl: Duration,
    pub min_healthy_balance_lamports: u64,
    pub max_reservations_per_payer: usize,
    pub rate_limits: RateLimitConfig,
    pub anomaly: AnomalyConfig,
    pub allowed_origins: Vec<String>,
    pub metrics_api_key: Option<String>,
}

impl RelayConfig {
    pub const DEFAULT_QUOTE_TTL_SECONDS: u64 = 60;
    pub const DEFAULT_RESERVATION_TTL_MS: u64 = 90_000;
    pub const DEFAULT_MIN_HEALTHY_BALANCE_LAMPORTS: u64 = 50_000_000;
    pub const DEFAULT_MAX_RESERVATIONS_PER_PAYER: usize = 50;
    pub const MAX_EXPECTED_GAS_LAMPORTS: u64 = 50_000;
    pub const TREASURY_RATIO: u64 = 2;
    pub const MAX_RETRIES: u32 = 3;
    pub const REVOCATION_BOUND: Duration = Duration::from_secs(5);
    pub const REPLAY_TTL: Duration = Duration::from_secs(120);
    pub const INFLIGHT_TTL: Duration = Duration::from_secs(60);

    /// Loads configuration from the process environment. Never panics: a
    /// misconfigured deployment should fail boot with a readable error
    /// rather than come up half-working.
    pub fn from_env() -> Result<Self, ConfigError> {
        let fee_payer_private_keys = split_csv_env("FEE_PAYER_PRIVATE_KEYS");
        if fee_payer_private_keys.is_empty() {
            return Err(ConfigError::NoFeePayers);
        }

        let treasury_address = parse_pubkey_env("TREASURY_ADDRESS")?;
        let rpc_urls = split_csv_env("RPC_URLS");
        if rpc_urls.is_empty() {
            return Err(ConfigError::Missing("RPC_URLS"));
        }

        let network = match env::var("NETWORK").as_deref() {
            Ok("mainnet") => Network::Mainnet,
            Ok("devnet") | Err(_) => Network::Devnet,
            Ok(other) => {
                return Err(ConfigError::InvalidPubkey {
                    key: "NETWORK",
                    source: format!("unknown network {other}"),
                })
            }
        };

        Ok(Self {
            fee_payer_private_keys,
            treasury_address,
            rpc_urls,
            store_url: env::var("STORE_URL").ok(),
            oracle_url: env::var("ORACLE_URL").map_err(|_| ConfigError::Missing("ORACLE_URL"))?,
            network,
            base_fee_lamports: parse_u64_env("BASE_FEE_LAMPORTS", 5_000)?,
            network_fee_lamports: parse_u64_env("NETWORK_FEE_LAMPORTS", 5_000)?,
            quote_ttl: Duration::from_secs(parse_u64_env(
                "QUOTE_TTL_SECONDS",
                Self::DEFAULT_QUOTE_TTL_SECONDS,
            )?),
            reservation_ttl: Duration::from_millis(parse_u64_env(
                "RESERVATION_TTL_MS",
                Self::DEFAULT_RESERVATION_TTL_MS,
            )?),
            min_healthy_balance_lamports: parse_u64_env(
                "MIN_HEALTHY_BALANCE_LAMPORTS",
                Self::DEFAULT_MIN_HEALTHY_BALANCE_LAMPORTS,
            )?,
            max_reservations_per_payer: parse_u64_env(
                "MAX_RESERVATIONS_PER_PAYER",
                Self::DEFAULT_MAX_RESERVATIONS_PER_PAYER as u64,
            )? as usize,
            rate_limits: RateLimitConfig::default(),
            anomaly: AnomalyConfig::defaults(),
            allowed_origins: split_csv_env("ALLOWED_ORIGINS"),
            metrics_api_key: env::var("METRICS_API_KEY").ok(),
        })
    }

    /// Clamp and validate the quote TTL against spec §3's `[30s, 120s]`
    /// bound. Called after `from_env` so a bad override fails loudly.
    pub fn validated_quote_ttl(&self) -> Duration {
        self.quote_ttl.clamp(Duration::from_secs(30), Duration::from_secs(120))
    }
}

fn split_csv_env(key: &'static str) -> Vec<String> {
    env::var(key)
        .ok()
        .map(|v| v.split(',').map(|s| s.trim().to_string()).filter(|s| !s.is_empty()).collect())
        .unwrap_or_default()
}

fn parse_pubkey_env(key: &'static str) -> Result<Pubkey, ConfigError> {
    let raw = env::var(key).map_err(|_| ConfigError::Missing(key))?;
    raw.parse::<Pubkey>().map_err(|e| ConfigError::InvalidPubkey { key, source: e.to_string() })
}

fn parse_u64_env(key: &'static str, default: u64) -> Result<u64, ConfigError> {
    match env::var(key) {
        Ok(raw) => raw.parse::<u64>().map_err(|source| ConfigError::InvalidNumber { key, source }),
        Err(_) => Ok(default),
    }
}
