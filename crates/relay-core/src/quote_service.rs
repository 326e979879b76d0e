//! Quote Service (spec C7, §4.7): composes the rate/anomaly layer, the
//! oracle gateway, and the fee-payer pool into the `/v1/quote` contract.

use std::net::IpAddr;

use audit_log::AuditEventKind;
use chrono::Utc;
use fee_payer_pool::{FeePayerPool, ReserveOutcome};
use rate_anomaly::{EventKind, RateLimitOutcome};
use relay_types::{Quote, QuoteId, RelayConfig, RelayError, RelayResult};
use solana_sdk::pubkey::Pubkey;

use crate::{pricing, RelayCore};

/// Input to [`RelayCore::quote`], the typed counterpart of the HTTP layer's
/// `{userPubkey, paymentToken, estimatedComputeUnits?}` body (spec §6).
#[derive(Debug, Clone)]
pub struct QuoteRequest {
    pub user_key: Pubkey,
    pub ip: IpAddr,
    pub payment_mint: Pubkey,
    pub cu_estimate: Option<u32>,
}

impl RelayCore {
    /// Spec §4.7's seven steps. Any rejection is an ordinary `Err`, not a
    /// panic or a logged-and-swallowed failure — callers (the HTTP layer)
    /// map `RelayError` straight onto the documented status codes.
    pub async fn quote(&self, req: QuoteRequest) -> RelayResult<Quote> {
        match self.rate_anomaly.check(&req.user_key, req.ip, EventKind::Quote) {
            RateLimitOutcome::WalletLimited => {
                self.log_audit(AuditEventKind::RatelimitWallet, &req.user_key, Some(req.ip), None);
                metrics::counter!("relayer.quote.rejected", 1, "reason" => "wallet_rate_limited");
                return Err(RelayError::WalletRateLimited);
            }
            RateLimitOutcome::IpLimited => {
                self.log_audit(AuditEventKind::RatelimitIp, &req.user_key, Some(req.ip), None);
                metrics::counter!("relayer.quote.rejected", 1, "reason" => "ip_rate_limited");
                return Err(RelayError::IpRateLimited);
            }
            RateLimitOutcome::Allowed => {}
        }

        if !self.oracle.is_token_accepted(&req.payment_mint).await? {
            self.log_audit(
                AuditEventKind::QuoteRejected,
                &req.user_key,
                Some(req.ip),
                Some(format!("payment mint {} not accepted", req.payment_mint)),
            );
            metrics::counter!("relayer.quote.rejected", 1, "reason" => "token_not_accepted");
            return Err(RelayError::TokenNotAccepted);
        }

        let cu = pricing::effective_cu(req.cu_estimate);
        let base = pricing::base_fee_lamports(self.config.base_fee_lamports, self.config.network_fee_lamports, cu);

        let tier = self.oracle.user_discount(&req.user_key).await?;
        let discounted = pricing::apply_discount(base, tier.discount, RelayConfig::TREASURY_RATIO);

        let fee_amount_payment_token = self.oracle.fee_in_token(&req.payment_mint, discounted, &tier).await?;

        let quote_id = QuoteId::new();
        let fee_payer_key = match self.pool.reserve(quote_id, discounted).await {
            ReserveOutcome::Reserved(payer) => payer,
            ReserveOutcome::NoCapacity => {
                self.log_audit(AuditEventKind::PayerReservationFailed, &req.user_key, Some(req.ip), None);
                metrics::counter!("relayer.quote.rejected", 1, "reason" => "no_payer_capacity");
                return Err(RelayError::NoPayerCapacity);
            }
            ReserveOutcome::CircuitOpen => {
                self.log_audit(
                    AuditEventKind::PayerReservationFailed,
                    &req.user_key,
                    Some(req.ip),
                    Some("circuit breaker open".to_string()),
                );
                metrics::counter!("relayer.quote.rejected", 1, "reason" => "circuit_breaker_open");
                return Err(RelayError::CircuitBreakerOpen);
            }
        };

        let now = Utc::now();
        let ttl = self.config.validated_quote_ttl();
        let quote = Quote {
            id: quote_id,
            user_key: req.user_key,
            payment_mint: req.payment_mint,
            fee_payer_key,
            fee_amount_native: discounted,
            fee_amount_payment_token,
            created_at: now,
            expires_at: now + chrono::Duration::from_std(ttl).unwrap_or(chrono::Duration::seconds(60)),
            holder_tier: tier,
            compute_unit_estimate: cu,
            consumed: false,
        };

        self.quote_store.put(quote.clone()).await;
        self.log_audit(AuditEventKind::QuoteCreated, &req.user_key, Some(req.ip), None);
        metrics::counter!("relayer.quote.created", 1);
        Ok(quote)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU64, Ordering};

    use async_trait::async_trait;
    use audit_log::{AuditLog, AuditSink};
    use chain_adapter::{ChainAdapter, ChainAdapterHealth, SendError, SignatureStatus, SimulationOutcome};
    use fee_payer_pool::{BalanceSnapshot, Pool, PoolConfig};
    use quote_store::InMemoryQuoteStore;
    use rate_anomaly::RateAnomalyLayer;
    use relay_types::{config::{AnomalyConfig, RateLimitConfig}, HolderTier};
    use solana_sdk::{
        hash::Hash,
        signature::{Keypair, Signature, Signer},
        transaction::VersionedTransaction,
    };
    use std::sync::Arc;

    use super::*;

    #[derive(Default)]
    struct NullSink;
    #[async_trait]
    impl AuditSink for NullSink {
        async fn write(&self, _events: Vec<audit_log::AuditEvent>) {}
    }

    struct FakeOracle {
        accepted: bool,
        discount: f64,
    }

    #[async_trait]
    impl OracleGateway for FakeOracle {
        async fn fee_in_token(&self, _mint: &Pubkey, fee_lamports: u64, _tier: &HolderTier) -> RelayResult<u128> {
            Ok(fee_lamports as u128 * 1000)
        }
        async fn is_token_accepted(&self, _mint: &Pubkey) -> RelayResult<bool> {
            Ok(self.accepted)
        }
        async fn user_discount(&self, _wallet: &Pubkey) -> RelayResult<HolderTier> {
            Ok(HolderTier::clamped("gold", self.discount))
        }
    }

    use oracle_gateway::OracleGateway;

    struct FakeChain {
        calls: AtomicU64,
    }

    #[async_trait]
    impl ChainAdapter for FakeChain {
        async fn latest_blockhash(&self) -> RelayResult<(Hash, u64)> {
            Ok((Hash::default(), 1))
        }
        async fn is_blockhash_valid(&self, _blockhash: Hash) -> RelayResult<bool> {
            Ok(true)
        }
        async fn simulate(&self, _tx: &VersionedTransaction, accounts: &[Pubkey]) -> RelayResult<SimulationOutcome> {
            Ok(SimulationOutcome {
                units_consumed: Some(1000),
                logs: vec![],
                err: None,
                post_balances: accounts.iter().map(|k| (*k, 100_000_000)).collect(),
            })
        }
        async fn send(&self, _tx: &VersionedTransaction) -> Result<Signature, SendError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(Signature::default())
        }
        async fn signature_status(&self, _signature: &Signature) -> RelayResult<SignatureStatus> {
            Ok(SignatureStatus::Confirmed)
        }
        async fn batch_balances(&self, keys: &[Pubkey]) -> RelayResult<Vec<(Pubkey, u64)>> {
            Ok(keys.iter().map(|k| (*k, 100_000_000)).collect())
        }
        fn health(&self) -> ChainAdapterHealth {
            ChainAdapterHealth { endpoints: vec![], cached_blockhash_age: None }
        }
    }

    fn test_core(accepted: bool, discount: f64) -> RelayCore {
        let keypair = Keypair::new();
        let pubkey = keypair.pubkey();
        let keyring = fee_payer_pool::Keyring::from_keypairs(vec![keypair]);
        let pool = Arc::new(Pool::new(keyring, PoolConfig::default()));
        let mut balances = BalanceSnapshot::new();
        balances.insert(pubkey, 1_000_000_000);
        pool.apply_balance_snapshot(balances, true, Utc::now());

        RelayCore::new(
            Arc::new(relay_types::RelayConfig {
                fee_payer_private_keys: vec![],
                treasury_address: Pubkey::new_unique(),
                rpc_urls: vec!["http://localhost".to_string()],
                store_url: None,
                oracle_url: "http://localhost".to_string(),
                network: relay_types::config::Network::Devnet,
                base_fee_lamports: 5_000,
                network_fee_lamports: 5_000,
                quote_ttl: std::time::Duration::from_secs(60),
                reservation_ttl: std::time::Duration::from_millis(90_000),
                min_healthy_balance_lamports: 50_000_000,
                max_reservations_per_payer: 50,
                rate_limits: RateLimitConfig::default(),
                anomaly: AnomalyConfig::default(),
                allowed_origins: vec![],
                metrics_api_key: None,
            }),
            pool,
            Arc::new(InMemoryQuoteStore::default()),
            Arc::new(replay_set::ReplaySet::default()),
            Arc::new(replay_set::InFlightSet::default()),
            Arc::new(FakeChain { calls: AtomicU64::new(0) }),
            Arc::new(FakeOracle { accepted, discount }),
            Arc::new(RateAnomalyLayer::new(RateLimitConfig::default(), AnomalyConfig::default())),
            AuditLog::new(Arc::new(NullSink)),
            Pubkey::new_unique(),
        )
    }

    fn req(core: &RelayCore) -> QuoteRequest {
        let _ = core;
        QuoteRequest {
            user_key: Pubkey::new_unique(),
            ip: "203.0.113.7".parse().unwrap(),
            payment_mint: Pubkey::new_unique(),
            cu_estimate: None,
        }
    }

    #[tokio::test]
    async fn quote_succeeds_and_reserves_a_payer() {
        let core = test_core(true, 0.0);
        let quote = core.quote(req(&core)).await.expect("quote should succeed");
        assert!(!quote.consumed);
        assert!(quote.fee_amount_native > 0);
    }

    #[tokio::test]
    async fn quote_rejects_unaccepted_token() {
        let core = test_core(false, 0.0);
        let err = core.quote(req(&core)).await.unwrap_err();
        assert!(matches!(err, RelayError::TokenNotAccepted));
    }

    #[tokio::test]
    async fn quote_floors_fee_at_break_even_under_max_discount() {
        let core = test_core(true, 0.95);
        let quote = core.quote(req(&core)).await.expect("quote should succeed");
        let base = pricing::base_fee_lamports(5_000, 5_000, pricing::DEFAULT_CU);
        assert_eq!(quote.fee_amount_native, pricing::break_even_fee(base, relay_types::RelayConfig::TREASURY_RATIO));
    }
}
