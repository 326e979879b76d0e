use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use relay_types::{QuoteId, RelayError, RelayResult, Reservation};
use solana_sdk::{
    pubkey::Pubkey,
    signature::Signature,
    signer::Signer,
    transaction::Transaction,
};
use tracing::{instrument, trace, warn};

use crate::{
    admin::{apply_admin_op, AdminError, AdminOp, RetirementOutcome},
    config::PoolConfig,
    keyring::Keyring,
    state::{PoolSnapshot, PoolState},
};

/// Outcome of a reservation attempt, surfaced to callers as a typed enum
/// before they fold it into `RelayError` for the HTTP boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReserveOutcome {
    Reserved(Pubkey),
    NoCapacity,
    CircuitOpen,
}

pub type BalanceSnapshot = HashMap<Pubkey, u64>;

/// Public contract of C1 (spec §4.1). `Pool` is the only implementor; the
/// trait exists so `relay-core` can be generic over it in tests the way the
/// teacher's `rpc` crate is generic over `OrderPoolHandle`.
#[async_trait]
pub trait FeePayerPool: Send + Sync {
    async fn reserve(&self, quote_id: QuoteId, amount_lamports: u64) -> ReserveOutcome;
    fn release(&self, quote_id: QuoteId);
    fn can_process_submit(&self, payer_key: &Pubkey) -> bool;
    fn sign(&self, tx: &mut Transaction, payer_key: &Pubkey) -> RelayResult<()>;
    /// Signs arbitrary already-serialized message bytes as `payer_key`, for
    /// callers working with `VersionedTransaction` where the legacy
    /// `Transaction::partial_sign` path doesn't apply (spec §4.1 `sign`,
    /// generalized to both transaction encodings the validator accepts).
    fn sign_message_bytes(&self, message_bytes: &[u8], payer_key: &Pubkey) -> RelayResult<Signature>;
    fn mark_unhealthy(&self, payer_key: &Pubkey);
    fn snapshot(&self) -> PoolSnapshot;
}

struct PoolInner {
    state: Mutex<PoolState>,
    keyring: Keyring,
    config: PoolConfig,
}

/// `Arc`-wrapped facade, cheap to `Clone` and shared across the quote and
/// submit services — the same shape as the teacher's `Pool<V, T>` over
/// `PoolInner`.
#[derive(Clone)]
pub struct Pool {
    inner: Arc<PoolInner>,
}

impl Pool {
    pub fn new(keyring: Keyring, config: PoolConfig) -> Self {
        let now = Utc::now();
        let pubkeys = keyring.pubkeys();
        let state = PoolState::new(pubkeys, now);
        Self { inner: Arc::new(PoolInner { state: Mutex::new(state), keyring, config }) }
    }

    /// Step (ii) of spec §4.1's balance refresh: apply a freshly fetched
    /// batch of balances. Observationally monotonic per payer (spec §5c) —
    /// callers must not invoke this out of order for the same payer, which
    /// holds here because the refresher is a single background task.
    #[instrument(skip(self, balances))]
    pub fn apply_balance_snapshot(&self, balances: BalanceSnapshot, fetched_ok: bool, now: DateTime<Utc>) {
        let mut state = self.inner.state.lock();
        for pubkey in state.order.clone() {
            let Some(payer) = state.payers.get_mut(&pubkey) else { continue };
            match balances.get(&pubkey) {
                Some(&balance) if fetched_ok => {
                    payer.observed_balance = balance;
                    payer.last_refresh = now;
                    payer.balance_stale = false;
                    if balance >= self.inner.config.min_healthy_balance_lamports {
                        payer.unhealthy_until = None;
                    }
                    metrics::gauge!("relayer.pool.payer_balance_lamports", balance as f64, "payer" => pubkey.to_string());
                }
                _ => {
                    // Refresh failure: keep the stale balance, just flag it so
                    // alerting can suppress a false "empty payer" page.
                    payer.balance_stale = true;
                    warn!(payer = %pubkey, "balance refresh did not return a value for this payer");
                }
            }
        }
    }

    pub fn admin(&self, op: AdminOp) -> Result<RetirementOutcome, AdminError> {
        let mut state = self.inner.state.lock();
        apply_admin_op(&mut state, op)
    }
}

#[async_trait]
impl FeePayerPool for Pool {
    #[instrument(skip(self))]
    async fn reserve(&self, quote_id: QuoteId, amount_lamports: u64) -> ReserveOutcome {
        let now = Utc::now();
        let mut state = self.inner.state.lock();

        state.sweep_expired_reservations(now);

        if state.breaker_open(now) {
            metrics::counter!("relayer.pool.reserve_rejected_circuit_open", 1);
            return ReserveOutcome::CircuitOpen;
        }

        match state.find_candidate(amount_lamports, now, &self.inner.config) {
            Some(payer_key) => {
                let reservation = Reservation {
                    quote_id,
                    payer_key,
                    amount: amount_lamports,
                    created_at: now,
                    expires_at: now + chrono::Duration::from_std(self.inner.config.reservation_ttl).unwrap_or_default(),
                };
                state.record_reservation(payer_key, reservation);
                state.advance_cursor();
                state.consecutive_failures = 0;
                metrics::counter!("relayer.pool.reservations_created", 1);
                trace!(payer = %payer_key, amount = amount_lamports, "reserved fee payer capacity");
                ReserveOutcome::Reserved(payer_key)
            }
            None => {
                state.consecutive_failures += 1;
                if state.consecutive_failures >= self.inner.config.breaker_failure_threshold {
                    state.breaker_open_until =
                        Some(now + chrono::Duration::from_std(self.inner.config.breaker_open_duration).unwrap_or_default());
                    metrics::counter!("relayer.pool.circuit_opened", 1);
                    warn!("fee payer pool circuit breaker opened: no capacity across {} consecutive scans", state.consecutive_failures);
                }
                metrics::counter!("relayer.pool.reserve_rejected_no_capacity", 1);
                ReserveOutcome::NoCapacity
            }
        }
    }

    fn release(&self, quote_id: QuoteId) {
        let mut state = self.inner.state.lock();
        if state.remove_reservation(quote_id).is_some() {
            metrics::counter!("relayer.pool.reservations_released", 1);
        }
    }

    fn can_process_submit(&self, payer_key: &Pubkey) -> bool {
        let state = self.inner.state.lock();
        let Some(payer) = state.payers.get(payer_key) else { return false };
        let now = Utc::now();
        payer.rotation_state.can_process_submit()
            && payer.is_healthy_at(now)
            && payer.observed_balance >= self.inner.config.min_healthy_balance_lamports
    }

    fn sign(&self, tx: &mut Transaction, payer_key: &Pubkey) -> RelayResult<()> {
        let keypair = self.inner.keyring.get(payer_key).ok_or(RelayError::SubmitFailed)?;
        let recent_blockhash = tx.message.recent_blockhash;
        tx.partial_sign(&[keypair], recent_blockhash);
        Ok(())
    }

    fn sign_message_bytes(&self, message_bytes: &[u8], payer_key: &Pubkey) -> RelayResult<Signature> {
        let keypair = self.inner.keyring.get(payer_key).ok_or(RelayError::SubmitFailed)?;
        Ok(keypair.sign_message(message_bytes))
    }

    fn mark_unhealthy(&self, payer_key: &Pubkey) {
        let mut state = self.inner.state.lock();
        let now = Utc::now();
        if let Some(payer) = state.payers.get_mut(payer_key) {
            payer.unhealthy_until =
                Some(now + chrono::Duration::from_std(self.inner.config.unhealthy_duration_after_failure).unwrap_or_default());
            metrics::counter!("relayer.pool.payer_marked_unhealthy", 1, "payer" => payer_key.to_string());
            warn!(payer = %payer_key, "marked fee payer unhealthy after non-retryable send failure");
        }
    }

    fn snapshot(&self) -> PoolSnapshot {
        let state = self.inner.state.lock();
        state.snapshot(Utc::now(), &self.inner.config)
    }
}

#[cfg(test)]
mod tests {
    use relay_types::QuoteId;
    use solana_sdk::signature::Keypair;

    use super::*;
    use crate::admin::AdminOp;

    fn pool_with_payers(n: usize, balance: u64) -> Pool {
        let keypairs: Vec<Keypair> = (0..n).map(|_| Keypair::new()).collect();
        let pubkeys: Vec<Pubkey> = keypairs.iter().map(|k| k.pubkey()).collect();
        let keyring = Keyring::from_keypairs(keypairs);
        let pool = Pool::new(keyring, PoolConfig::default());
        let balances: BalanceSnapshot = pubkeys.into_iter().map(|pk| (pk, balance)).collect();
        pool.apply_balance_snapshot(balances, true, Utc::now());
        pool
    }

    #[tokio::test]
    async fn reserve_respects_available_balance() {
        let pool = pool_with_payers(1, 100_000_000);
        let outcome = pool.reserve(QuoteId::new(), 40_000_000).await;
        assert!(matches!(outcome, ReserveOutcome::Reserved(_)));

        // A second reservation that would push the payer below
        // MIN_HEALTHY_BALANCE must be rejected.
        let outcome2 = pool.reserve(QuoteId::new(), 40_000_000).await;
        assert_eq!(outcome2, ReserveOutcome::NoCapacity);
    }

    #[tokio::test]
    async fn release_is_idempotent() {
        let pool = pool_with_payers(1, 100_000_000);
        let quote_id = QuoteId::new();
        pool.reserve(quote_id, 1_000_000).await;
        pool.release(quote_id);
        pool.release(quote_id);
        assert_eq!(pool.snapshot().total_reservations, 0);
    }

    #[tokio::test]
    async fn no_capacity_opens_circuit_after_five_failures() {
        let pool = pool_with_payers(1, 0);
        for _ in 0..5 {
            assert_eq!(pool.reserve(QuoteId::new(), 1).await, ReserveOutcome::NoCapacity);
        }
        assert_eq!(pool.reserve(QuoteId::new(), 1).await, ReserveOutcome::CircuitOpen);
    }

    #[tokio::test]
    async fn round_robin_cursor_distributes_across_payers() {
        let pool = pool_with_payers(2, 100_000_000);
        let ReserveOutcome::Reserved(first) = pool.reserve(QuoteId::new(), 1_000_000).await else {
            panic!("expected reservation")
        };
        let ReserveOutcome::Reserved(second) = pool.reserve(QuoteId::new(), 1_000_000).await else {
            panic!("expected reservation")
        };
        assert_ne!(first, second);
    }

    #[tokio::test]
    async fn retiring_payer_rejects_new_but_permits_submit() {
        let pool = pool_with_payers(1, 100_000_000);
        let ReserveOutcome::Reserved(payer) = pool.reserve(QuoteId::new(), 1_000_000).await else {
            panic!("expected reservation")
        };

        pool.admin(AdminOp::StartRetirement(payer)).unwrap();

        assert_eq!(pool.reserve(QuoteId::new(), 1_000_000).await, ReserveOutcome::NoCapacity);
        assert!(pool.can_process_submit(&payer));
    }

    #[tokio::test]
    async fn emergency_retire_cancels_reservations() {
        let pool = pool_with_payers(1, 100_000_000);
        let quote_id = QuoteId::new();
        let ReserveOutcome::Reserved(payer) = pool.reserve(quote_id, 1_000_000).await else {
            panic!("expected reservation")
        };

        pool.admin(AdminOp::EmergencyRetire(payer)).unwrap();

        assert_eq!(pool.snapshot().total_reservations, 0);
        assert!(!pool.can_process_submit(&payer));
    }

    #[tokio::test]
    async fn balance_refresh_failure_marks_stale_without_zeroing() {
        let pool = pool_with_payers(1, 100_000_000);
        pool.apply_balance_snapshot(BalanceSnapshot::new(), false, Utc::now());
        let snap = pool.snapshot();
        assert_eq!(snap.payers[0].observed_balance, 100_000_000);
        assert!(snap.payers[0].balance_stale);
    }
}
