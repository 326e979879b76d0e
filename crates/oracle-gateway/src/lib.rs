//! Oracle Gateway (spec C6): the relayer's only window onto external
//! pricing. Every query is timeout-bounded, circuit-broken per query kind,
//! and cached for 60s; when a breaker is open we fall back to the safe
//! default named in spec §4.6 rather than guess.

mod breaker;
mod cache;

use std::time::Duration;

use async_trait::async_trait;
use relay_types::{HolderTier, RelayError, RelayResult};
use serde::{Deserialize, Serialize};
use solana_sdk::pubkey::Pubkey;
use tracing::{instrument, warn};

use crate::{breaker::Breaker, cache::KeyedCache};

/// One entry of `GET /v1/tokens` (spec §6), surfaced from the oracle's own
/// accepted-token list rather than re-derived from per-mint checks.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenInfo {
    pub mint: String,
    pub accepted: bool,
}

#[derive(Debug, Clone, Copy)]
pub struct OracleConfig {
    pub request_timeout: Duration,
    pub breaker_failure_threshold: u32,
    pub breaker_open_duration: Duration,
    pub cache_ttl: Duration,
}

impl Default for OracleConfig {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_millis(800),
            breaker_failure_threshold: 5,
            breaker_open_duration: Duration::from_secs(30),
            cache_ttl: Duration::from_secs(60),
        }
    }
}

#[async_trait]
pub trait OracleGateway: Send + Sync {
    /// Amount of `mint` equivalent to `fee_lamports` native, after applying
    /// `tier`'s discount. The oracle's number is consumed verbatim (spec
    /// Non-goals: no pricing logic beyond this).
    async fn fee_in_token(&self, mint: &Pubkey, fee_lamports: u64, tier: &HolderTier) -> RelayResult<u128>;

    async fn is_token_accepted(&self, mint: &Pubkey) -> RelayResult<bool>;

    async fn user_discount(&self, wallet: &Pubkey) -> RelayResult<HolderTier>;

    /// The full accepted-token list for `GET /v1/tokens`. Defaulted to empty
    /// so existing implementors (fakes in other crates' test modules) don't
    /// need to grow a new method just to keep building.
    async fn list_accepted_tokens(&self) -> RelayResult<Vec<TokenInfo>> {
        Ok(Vec::new())
    }
}

#[derive(Deserialize)]
struct FeeInTokenResponse {
    amount: String,
}

#[derive(Deserialize)]
struct TokenAcceptedResponse {
    accepted: bool,
}

#[derive(Deserialize)]
struct UserDiscountResponse {
    tier_name: String,
    discount: f64,
}

#[derive(Deserialize)]
struct TokenListResponse {
    tokens: Vec<TokenInfo>,
}

/// HTTP-backed `OracleGateway`. The base URL and auth are deployment
/// concerns read from `RelayConfig`; this type only knows the three routes.
pub struct HttpOracleGateway {
    client: reqwest::Client,
    base_url: String,
    fee_cache: KeyedCache<(Pubkey, u64, String), u128>,
    accepted_cache: KeyedCache<Pubkey, bool>,
    discount_cache: KeyedCache<Pubkey, HolderTier>,
    fee_breaker: Breaker,
    accepted_breaker: Breaker,
    discount_breaker: Breaker,
}

impl HttpOracleGateway {
    pub fn new(base_url: impl Into<String>, config: OracleConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .expect("reqwest client configuration is static and always valid");

        Self {
            client,
            base_url: base_url.into(),
            fee_cache: KeyedCache::new(config.cache_ttl),
            accepted_cache: KeyedCache::new(config.cache_ttl),
            discount_cache: KeyedCache::new(config.cache_ttl),
            fee_breaker: Breaker::new(config.breaker_failure_threshold, config.breaker_open_duration),
            accepted_breaker: Breaker::new(config.breaker_failure_threshold, config.breaker_open_duration),
            discount_breaker: Breaker::new(config.breaker_failure_threshold, config.breaker_open_duration),
        }
    }
}

#[async_trait]
impl OracleGateway for HttpOracleGateway {
    #[instrument(skip(self))]
    async fn fee_in_token(&self, mint: &Pubkey, fee_lamports: u64, tier: &HolderTier) -> RelayResult<u128> {
        let cache_key = (*mint, fee_lamports, tier.name.clone());
        if let Some(cached) = self.fee_cache.get_fresh(&cache_key) {
            return Ok(cached);
        }

        if self.fee_breaker.is_open() {
            warn!(%mint, "oracle fee breaker open, refusing to quote");
            return Err(RelayError::QuoteFailed);
        }

        let url = format!("{}/fee-in-token", self.base_url);
        let response = self
            .client
            .get(&url)
            .query(&[
                ("mint", mint.to_string()),
                ("fee_lamports", fee_lamports.to_string()),
                ("discount", tier.discount.to_string()),
            ])
            .send()
            .await;

        match response {
            Ok(resp) if resp.status().is_success() => match resp.json::<FeeInTokenResponse>().await {
                Ok(parsed) => match parsed.amount.parse::<u128>() {
                    Ok(amount) => {
                        self.fee_breaker.record_success();
                        self.fee_cache.set(cache_key, amount);
                        Ok(amount)
                    }
                    Err(_) => {
                        self.fee_breaker.record_failure();
                        Err(RelayError::QuoteFailed)
                    }
                },
                Err(_) => {
                    self.fee_breaker.record_failure();
                    Err(RelayError::QuoteFailed)
                }
            },
            _ => {
                self.fee_breaker.record_failure();
                Err(RelayError::QuoteFailed)
            }
        }
    }

    #[instrument(skip(self))]
    async fn is_token_accepted(&self, mint: &Pubkey) -> RelayResult<bool> {
        if let Some(cached) = self.accepted_cache.get_fresh(mint) {
            return Ok(cached);
        }

        if self.accepted_breaker.is_open() {
            warn!(%mint, "oracle accepted-token breaker open, defaulting to not accepted");
            return Ok(false);
        }

        let url = format!("{}/token-accepted/{}", self.base_url, mint);
        match self.client.get(&url).send().await {
            Ok(resp) if resp.status().is_success() => match resp.json::<TokenAcceptedResponse>().await {
                Ok(parsed) => {
                    self.accepted_breaker.record_success();
                    self.accepted_cache.set(*mint, parsed.accepted);
                    Ok(parsed.accepted)
                }
                Err(_) => {
                    self.accepted_breaker.record_failure();
                    Ok(false)
                }
            },
            _ => {
                self.accepted_breaker.record_failure();
                Ok(false)
            }
        }
    }

    #[instrument(skip(self))]
    async fn user_discount(&self, wallet: &Pubkey) -> RelayResult<HolderTier> {
        if let Some(cached) = self.discount_cache.get_fresh(wallet) {
            return Ok(cached);
        }

        if self.discount_breaker.is_open() {
            warn!(%wallet, "oracle discount breaker open, defaulting to no discount");
            return Ok(HolderTier::none());
        }

        let url = format!("{}/user-discount/{}", self.base_url, wallet);
        match self.client.get(&url).send().await {
            Ok(resp) if resp.status().is_success() => match resp.json::<UserDiscountResponse>().await {
                Ok(parsed) => {
                    let tier = HolderTier::clamped(parsed.tier_name, parsed.discount);
                    self.discount_breaker.record_success();
                    self.discount_cache.set(*wallet, tier.clone());
                    Ok(tier)
                }
                Err(_) => {
                    self.discount_breaker.record_failure();
                    Ok(HolderTier::none())
                }
            },
            _ => {
                self.discount_breaker.record_failure();
                Ok(HolderTier::none())
            }
        }
    }

    #[instrument(skip(self))]
    async fn list_accepted_tokens(&self) -> RelayResult<Vec<TokenInfo>> {
        let url = format!("{}/tokens", self.base_url);
        match self.client.get(&url).send().await {
            Ok(resp) if resp.status().is_success() => {
                resp.json::<TokenListResponse>().await.map(|parsed| parsed.tokens).map_err(|_| RelayError::QuoteFailed)
            }
            _ => Err(RelayError::QuoteFailed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn oracle_config_defaults_match_spec_ttls() {
        let config = OracleConfig::default();
        assert_eq!(config.cache_ttl, Duration::from_secs(60));
        assert_eq!(config.breaker_open_duration, Duration::from_secs(30));
    }

    #[tokio::test]
    async fn new_gateway_starts_with_closed_breakers() {
        let gateway = HttpOracleGateway::new("http://localhost:9", OracleConfig::default());
        assert!(!gateway.fee_breaker.is_open());
        assert!(!gateway.accepted_breaker.is_open());
        assert!(!gateway.discount_breaker.is_open());
    }
}
