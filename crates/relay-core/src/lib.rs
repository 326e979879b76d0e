//! Quote Service (spec C7) and Submit Service (spec C8): the two endpoint
//! contracts that compose every other crate in this workspace. Shaped after
//! the teacher's `rpc` crate — a thin typed facade (`RelayCore`) generic
//! enough in its collaborators that `relay-testkit` can swap in fakes for
//! the chain adapter and oracle gateway, concrete everywhere a single real
//! implementation (the pool, the quote store's backing, the replay set) is
//! all any deployment needs.

pub mod background;
pub mod pricing;
mod quote_service;
mod stats;
mod submit_service;

pub use quote_service::QuoteRequest;
pub use stats::RelayStats;
pub use submit_service::{SubmitOutcome, SubmitRequest};

use std::net::IpAddr;
use std::sync::Arc;

use audit_log::{AuditEvent, AuditEventKind, AuditLog};
use chain_adapter::ChainAdapter;
use fee_payer_pool::Pool;
use oracle_gateway::OracleGateway;
use quote_store::QuoteStore;
use rate_anomaly::RateAnomalyLayer;
use relay_types::RelayConfig;
use replay_set::{InFlightSet, ReplaySet};
use solana_sdk::pubkey::Pubkey;

/// Composition root for the hot-path pipeline: everything `/v1/quote` and
/// `/v1/submit` need, wired once at boot and shared (cheap to `Clone`, every
/// field is already `Arc`-backed) across every inbound request.
#[derive(Clone)]
pub struct RelayCore {
    pub(crate) config: Arc<RelayConfig>,
    pub(crate) pool: Arc<Pool>,
    pub(crate) quote_store: Arc<dyn QuoteStore>,
    pub(crate) replay_set: Arc<ReplaySet>,
    pub(crate) in_flight: Arc<InFlightSet>,
    pub(crate) chain: Arc<dyn ChainAdapter>,
    pub(crate) oracle: Arc<dyn OracleGateway>,
    pub(crate) rate_anomaly: Arc<RateAnomalyLayer>,
    pub(crate) audit: AuditLog,
    pub(crate) treasury: Pubkey,
    pub(crate) stats: Arc<RelayStats>,
}

impl RelayCore {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        config: Arc<RelayConfig>,
        pool: Arc<Pool>,
        quote_store: Arc<dyn QuoteStore>,
        replay_set: Arc<ReplaySet>,
        in_flight: Arc<InFlightSet>,
        chain: Arc<dyn ChainAdapter>,
        oracle: Arc<dyn OracleGateway>,
        rate_anomaly: Arc<RateAnomalyLayer>,
        audit: AuditLog,
        treasury: Pubkey,
    ) -> Self {
        Self {
            config,
            pool,
            quote_store,
            replay_set,
            in_flight,
            chain,
            oracle,
            rate_anomaly,
            audit,
            treasury,
            stats: Arc::new(RelayStats::new()),
        }
    }

    pub fn pool(&self) -> &Pool {
        &self.pool
    }

    pub fn chain(&self) -> &dyn ChainAdapter {
        self.chain.as_ref()
    }

    pub fn oracle(&self) -> &dyn OracleGateway {
        self.oracle.as_ref()
    }

    pub fn config(&self) -> &RelayConfig {
        &self.config
    }

    pub fn treasury(&self) -> Pubkey {
        self.treasury
    }

    /// Snapshot for `GET /v1/stats` (spec §6): transactions relayed and fees
    /// collected from this process's own accounting, plus whatever the
    /// buy-and-burn worker has last reported back via [`RelayStats::record_burn_report`].
    pub fn stats_snapshot(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }

    /// Reported by the (external) buy-and-burn worker after a completed
    /// cycle; exposed here so the binary's webhook/admin surface has
    /// somewhere to forward it.
    pub fn record_burn_report(&self, burned_lamports: u64) {
        self.stats.record_burn_report(burned_lamports);
    }

    pub async fn quote_store_len(&self) -> usize {
        self.quote_store.len().await
    }

    /// Shared audit-log entry point for both services (spec §4.10): wallets
    /// and IPs are truncated by `AuditEvent`'s builders, never stored raw.
    pub(crate) fn log_audit(
        &self,
        kind: AuditEventKind,
        wallet: &Pubkey,
        ip: Option<IpAddr>,
        detail: Option<String>,
    ) {
        let mut event = AuditEvent::new(kind).with_wallet(wallet.to_string());
        if let Some(ip) = ip {
            event = event.with_ip(ip.to_string());
        }
        if let Some(detail) = detail {
            event = event.with_detail(detail);
        }
        self.audit.log(event);
    }
}
