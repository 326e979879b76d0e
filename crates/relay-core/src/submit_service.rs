//! Submit Service (spec C8, §4.8): composes the quote store, replay set,
//! transaction validator, fee-payer pool, and chain adapter into the
//! `/v1/submit` contract, including the bounded retry-aware send.

use std::net::IpAddr;
use std::time::Duration;

use audit_log::AuditEventKind;
use chrono::Utc;
use fee_payer_pool::FeePayerPool;
use rand::Rng;
use rate_anomaly::{EventKind, RateLimitOutcome};
use relay_types::{config::Network, QuoteId, RelayConfig, RelayError, RelayResult};
use replay_set::InFlightSet;
use solana_sdk::pubkey::Pubkey;
use tx_validator::{TxValidator, FEE_PAYER_ACCOUNT_INDEX};

use crate::RelayCore;

/// Input to [`RelayCore::submit`]: `transaction` is already base64-decoded
/// by the HTTP layer into raw wire bytes (spec §6's `transaction: base64`).
#[derive(Debug, Clone)]
pub struct SubmitRequest {
    pub quote_id: QuoteId,
    pub claimed_user_key: Pubkey,
    pub tx_bytes: Vec<u8>,
    pub ip: IpAddr,
}

/// Successful submit result, the typed counterpart of spec §6's
/// `{signature, status:"submitted", attempts, explorer}`.
#[derive(Debug, Clone)]
pub struct SubmitOutcome {
    pub signature: solana_sdk::signature::Signature,
    pub attempts: u32,
    pub explorer_url: String,
}

/// RAII hold on the provisional in-flight set (spec §4.8 step 5 / §9): the
/// entry is released on every exit path out of `submit`, not just the
/// success path, since a held fingerprint with no corresponding release
/// would permanently wedge a legitimate retry.
struct InFlightGuard<'a> {
    set: &'a InFlightSet,
    fingerprint: relay_types::TxFingerprint,
}

impl<'a> InFlightGuard<'a> {
    fn new(set: &'a InFlightSet, fingerprint: relay_types::TxFingerprint) -> Self {
        Self { set, fingerprint }
    }
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.set.release(&self.fingerprint);
    }
}

fn explorer_url(network: Network, signature: &solana_sdk::signature::Signature) -> String {
    match network {
        Network::Mainnet => format!("https://explorer.solana.com/tx/{signature}"),
        Network::Devnet => format!("https://explorer.solana.com/tx/{signature}?cluster=devnet"),
    }
}

/// Retry delays for send, spec §4.8 step 11: `[1s, 2s, 4s]` plus jitter.
const RETRY_DELAYS: [Duration; 3] = [Duration::from_secs(1), Duration::from_secs(2), Duration::from_secs(4)];

impl RelayCore {
    pub async fn submit(&self, req: SubmitRequest) -> RelayResult<SubmitOutcome> {
        // Step 1: rate-check.
        match self.rate_anomaly.check(&req.claimed_user_key, req.ip, EventKind::Submit) {
            RateLimitOutcome::WalletLimited => {
                self.log_audit(AuditEventKind::RatelimitWallet, &req.claimed_user_key, Some(req.ip), None);
                metrics::counter!("relayer.submit.rejected", 1, "reason" => "wallet_rate_limited");
                return Err(RelayError::WalletRateLimited);
            }
            RateLimitOutcome::IpLimited => {
                self.log_audit(AuditEventKind::RatelimitIp, &req.claimed_user_key, Some(req.ip), None);
                metrics::counter!("relayer.submit.rejected", 1, "reason" => "ip_rate_limited");
                return Err(RelayError::IpRateLimited);
            }
            RateLimitOutcome::Allowed => {}
        }

        // Step 2: atomic get-then-delete (spec §8 invariant 4).
        let quote = match self.quote_store.consume(req.quote_id).await {
            Some(quote) => quote,
            None => {
                self.log_audit(AuditEventKind::SubmitRejected, &req.claimed_user_key, Some(req.ip), Some("quote not found".to_string()));
                metrics::counter!("relayer.submit.rejected", 1, "reason" => "quote_not_found");
                return Err(RelayError::QuoteNotFound);
            }
        };

        if quote.is_expired_at(Utc::now()) {
            // Already removed from the store by `consume`; this is terminal,
            // so the pool's matching reservation is released here too.
            self.pool.release(quote.id);
            self.log_audit(AuditEventKind::SubmitRejected, &req.claimed_user_key, Some(req.ip), Some("quote expired".to_string()));
            metrics::counter!("relayer.submit.rejected", 1, "reason" => "quote_expired");
            return Err(RelayError::QuoteExpired);
        }

        // Step 3: size.
        if let Err(err) = TxValidator::validate_size(&req.tx_bytes) {
            self.pool.release(quote.id);
            self.log_audit(AuditEventKind::SubmitRejected, &req.claimed_user_key, Some(req.ip), Some("tx too large".to_string()));
            metrics::counter!("relayer.submit.rejected", 1, "reason" => "tx_too_large");
            return Err(err);
        }

        // Step 4: deserialize.
        let tx = match TxValidator::deserialize(&req.tx_bytes) {
            Ok(tx) => tx,
            Err(err) => {
                self.pool.release(quote.id);
                self.log_audit(AuditEventKind::SubmitRejected, &req.claimed_user_key, Some(req.ip), Some("invalid tx format".to_string()));
                metrics::counter!("relayer.submit.rejected", 1, "reason" => "invalid_tx_format");
                return Err(err);
            }
        };

        // Step 5: fingerprint, replay check, in-flight dedup.
        let fingerprint = TxValidator::compute_fingerprint(&req.tx_bytes);
        if self.replay_set.contains(fingerprint) {
            self.pool.release(quote.id);
            self.log_audit(AuditEventKind::SecurityReplayAttack, &req.claimed_user_key, Some(req.ip), Some(fingerprint.to_string()));
            metrics::counter!("relayer.submit.rejected", 1, "reason" => "replay_detected");
            return Err(RelayError::ReplayDetected);
        }
        if !self.in_flight.try_acquire(fingerprint) {
            self.pool.release(quote.id);
            self.log_audit(
                AuditEventKind::SecurityReplayAttack,
                &req.claimed_user_key,
                Some(req.ip),
                Some("concurrent duplicate submit".to_string()),
            );
            metrics::counter!("relayer.submit.rejected", 1, "reason" => "concurrent_duplicate");
            return Err(RelayError::ReplayDetected);
        }
        let _in_flight_guard = InFlightGuard::new(&self.in_flight, fingerprint);

        // Step 6: blockhash freshness.
        let blockhash = TxValidator::get_blockhash(&tx);
        match self.chain.is_blockhash_valid(blockhash).await {
            Ok(true) => {}
            Ok(false) => {
                self.pool.release(quote.id);
                self.log_audit(AuditEventKind::SecurityBlockhashExpired, &req.claimed_user_key, Some(req.ip), None);
                metrics::counter!("relayer.submit.rejected", 1, "reason" => "blockhash_expired");
                return Err(RelayError::BlockhashExpired);
            }
            Err(_) => {
                // RPC failure checking validity is transient, not a verdict
                // on the transaction itself: preserve the reservation and
                // let the client retry the same quote before it expires.
                self.quote_store.put(quote).await;
                self.log_audit(AuditEventKind::SubmitFailed, &req.claimed_user_key, Some(req.ip), Some("blockhash check unavailable".to_string()));
                metrics::counter!("relayer.submit.failed", 1, "reason" => "chain_unavailable");
                return Err(RelayError::SubmitFailed);
            }
        }

        // Step 7: structural validation.
        let validated = match TxValidator::validate_structure(&tx, quote.fee_amount_payment_token, &self.treasury, &quote.payment_mint) {
            Ok(validated) => validated,
            Err(reasons) => {
                self.pool.release(quote.id);
                self.log_audit(
                    AuditEventKind::SecurityValidationFailed,
                    &req.claimed_user_key,
                    Some(req.ip),
                    Some(reasons.join("; ")),
                );
                metrics::counter!("relayer.submit.rejected", 1, "reason" => "validation_failed");
                return Err(RelayError::ValidationFailed(reasons));
            }
        };

        if validated.user_key != quote.user_key || validated.user_key != req.claimed_user_key {
            self.pool.release(quote.id);
            self.log_audit(
                AuditEventKind::SecurityValidationFailed,
                &req.claimed_user_key,
                Some(req.ip),
                Some("signer does not match the wallet this quote was issued to".to_string()),
            );
            metrics::counter!("relayer.submit.rejected", 1, "reason" => "user_key_mismatch");
            return Err(RelayError::ValidationFailed(vec!["user key does not match quote".to_string()]));
        }

        // Step 8: fee payer must match the reservation backing this quote.
        if validated.fee_payer_key != quote.fee_payer_key {
            self.pool.release(quote.id);
            self.log_audit(AuditEventKind::SecurityFeePayerMismatch, &req.claimed_user_key, Some(req.ip), None);
            metrics::counter!("relayer.submit.rejected", 1, "reason" => "fee_payer_mismatch");
            return Err(RelayError::FeePayerMismatch);
        }

        // Step 9: sign as the fee payer.
        let message_bytes = tx.message.serialize();
        let signature = match self.pool.sign_message_bytes(&message_bytes, &validated.fee_payer_key) {
            Ok(signature) => signature,
            Err(err) => {
                self.pool.release(quote.id);
                self.log_audit(AuditEventKind::SubmitFailed, &req.claimed_user_key, Some(req.ip), Some("fee payer signing failed".to_string()));
                metrics::counter!("relayer.submit.failed", 1, "reason" => "sign_failed");
                return Err(err);
            }
        };
        let mut tx = tx;
        tx.signatures[FEE_PAYER_ACCOUNT_INDEX] = signature;

        // Step 10: simulate, then the CPI drain guard.
        let simulation = match self.chain.simulate(&tx, &[validated.fee_payer_key]).await {
            Ok(simulation) => simulation,
            Err(_) => {
                self.quote_store.put(quote).await;
                self.log_audit(AuditEventKind::SubmitFailed, &req.claimed_user_key, Some(req.ip), Some("simulation unavailable".to_string()));
                metrics::counter!("relayer.submit.failed", 1, "reason" => "chain_unavailable");
                return Err(RelayError::SubmitFailed);
            }
        };

        if !simulation.succeeded() {
            self.pool.release(quote.id);
            let detail = simulation.err.clone().unwrap_or_default();
            self.log_audit(AuditEventKind::SecuritySimulationFailed, &req.claimed_user_key, Some(req.ip), Some(detail.clone()));
            metrics::counter!("relayer.submit.rejected", 1, "reason" => "simulation_failed");
            return Err(RelayError::SimulationFailed(detail));
        }

        let pre_balance = self
            .pool
            .snapshot()
            .payers
            .iter()
            .find(|p| p.pub_key == validated.fee_payer_key)
            .map(|p| p.observed_balance)
            .unwrap_or(0);
        let post_balance = simulation.post_balances.iter().find(|(key, _)| *key == validated.fee_payer_key).map(|(_, balance)| *balance);

        if let Some(post_balance) = post_balance {
            let delta = post_balance as i128 - pre_balance as i128;
            if delta < -(RelayConfig::MAX_EXPECTED_GAS_LAMPORTS as i128) {
                self.pool.release(quote.id);
                self.log_audit(
                    AuditEventKind::SecuritySimulationFailed,
                    &req.claimed_user_key,
                    Some(req.ip),
                    Some(format!("fee payer balance would drop by {} lamports beyond expected gas", -delta)),
                );
                metrics::counter!("relayer.submit.rejected", 1, "reason" => "cpi_drain_guard");
                return Err(RelayError::SimulationFailed("fee payer balance drained beyond expected gas".to_string()));
            }
        }

        // Step 11: send with bounded, classified retry.
        let mut attempts: u32 = 0;
        let send_result = loop {
            attempts += 1;
            match self.chain.send(&tx).await {
                Ok(signature) => break Ok(signature),
                Err(send_err) => {
                    let exhausted = attempts > RelayConfig::MAX_RETRIES;
                    if !send_err.retryable || exhausted {
                        break Err(send_err);
                    }
                    metrics::counter!("relayer.submit.retried", 1);
                    let base_delay = RETRY_DELAYS.get((attempts - 1) as usize).copied().unwrap_or(*RETRY_DELAYS.last().unwrap());
                    let jitter = Duration::from_millis(rand::thread_rng().gen_range(0..250));
                    tokio::time::sleep(base_delay + jitter).await;
                }
            }
        };

        match send_result {
            Ok(signature) => {
                // Step 12: success. Record burn-worker accounting before
                // releasing the reservation so a concurrent stats read never
                // observes the payer freed without the fee counted.
                self.replay_set.mark_and_test(fingerprint);
                self.stats.record_submit_success(quote.fee_amount_native);
                self.pool.release(quote.id);
                self.log_audit(AuditEventKind::SubmitSuccess, &req.claimed_user_key, Some(req.ip), None);
                metrics::counter!("relayer.submit.success", 1);
                Ok(SubmitOutcome { signature, attempts, explorer_url: explorer_url(self.config.network, &signature) })
            }
            Err(send_err) => {
                // Step 13: on any error, release the reservation only for a
                // terminal failure; a transient one keeps the reservation
                // and re-puts the quote so the client can retry before TTL.
                if send_err.retryable {
                    self.quote_store.put(quote).await;
                } else {
                    self.pool.mark_unhealthy(&validated.fee_payer_key);
                    self.pool.release(quote.id);
                }
                self.log_audit(AuditEventKind::SubmitFailed, &req.claimed_user_key, Some(req.ip), Some(send_err.message.clone()));
                metrics::counter!("relayer.submit.failed", 1, "reason" => "send_failed");
                Err(RelayError::SubmitFailed)
            }
        }
    }
}
