//! Shared fixtures for the relayer workspace's integration-style tests —
//! the fake chain adapter, the fake oracle gateway, and the fee-transfer
//! transaction builder every crate above `relay-core` otherwise reaches for
//! inline. Kept as its own workspace member, the way the teacher's
//! `testing-tools` crate sits alongside `crates/` rather than inside any one
//! of them.

use std::{
    collections::HashMap,
    sync::atomic::{AtomicU64, Ordering},
};

use async_trait::async_trait;
use chain_adapter::{ChainAdapter, ChainAdapterHealth, SendError, SignatureStatus, SimulationOutcome};
use oracle_gateway::{OracleGateway, TokenInfo};
use parking_lot::Mutex;
use relay_types::{HolderTier, RelayResult};
use solana_sdk::{
    hash::Hash,
    message::Message,
    pubkey::Pubkey,
    signature::{Keypair, Signature, Signer},
    transaction::{Transaction, VersionedTransaction},
};
use spl_associated_token_account::get_associated_token_address;

/// In-memory chain adapter: every call succeeds against canned data unless a
/// test flips one of the public fields first.
pub struct FakeChainAdapter {
    pub blockhash_valid: Mutex<bool>,
    pub simulation_err: Mutex<Option<String>>,
    pub send_failures_then_success: AtomicU64,
    pub balances: Mutex<HashMap<Pubkey, u64>>,
    pub send_calls: AtomicU64,
}

impl Default for FakeChainAdapter {
    fn default() -> Self {
        Self {
            blockhash_valid: Mutex::new(true),
            simulation_err: Mutex::new(None),
            send_failures_then_success: AtomicU64::new(0),
            balances: Mutex::new(HashMap::new()),
            send_calls: AtomicU64::new(0),
        }
    }
}

impl FakeChainAdapter {
    pub fn set_balance(&self, key: Pubkey, lamports: u64) {
        self.balances.lock().insert(key, lamports);
    }
}

#[async_trait]
impl ChainAdapter for FakeChainAdapter {
    async fn latest_blockhash(&self) -> RelayResult<(Hash, u64)> {
        Ok((Hash::new_from_array([7u8; 32]), 1))
    }

    async fn is_blockhash_valid(&self, _blockhash: Hash) -> RelayResult<bool> {
        Ok(*self.blockhash_valid.lock())
    }

    async fn simulate(&self, _tx: &VersionedTransaction, accounts: &[Pubkey]) -> RelayResult<SimulationOutcome> {
        let balances = self.balances.lock();
        Ok(SimulationOutcome {
            units_consumed: Some(1_000),
            logs: vec![],
            err: self.simulation_err.lock().clone(),
            post_balances: accounts.iter().map(|k| (*k, balances.get(k).copied().unwrap_or(100_000_000))).collect(),
        })
    }

    async fn send(&self, _tx: &VersionedTransaction) -> Result<Signature, SendError> {
        self.send_calls.fetch_add(1, Ordering::SeqCst);
        let remaining = self.send_failures_then_success.load(Ordering::SeqCst);
        if remaining > 0 {
            self.send_failures_then_success.fetch_sub(1, Ordering::SeqCst);
            return Err(SendError { message: "simulated transient rpc failure".to_string(), retryable: true });
        }
        Ok(Signature::default())
    }

    async fn signature_status(&self, _signature: &Signature) -> RelayResult<SignatureStatus> {
        Ok(SignatureStatus::Confirmed)
    }

    async fn batch_balances(&self, keys: &[Pubkey]) -> RelayResult<Vec<(Pubkey, u64)>> {
        let balances = self.balances.lock();
        Ok(keys.iter().map(|k| (*k, balances.get(k).copied().unwrap_or(100_000_000))).collect())
    }

    fn health(&self) -> ChainAdapterHealth {
        ChainAdapterHealth { endpoints: vec![], cached_blockhash_age: Some(std::time::Duration::from_secs(1)) }
    }
}

/// Oracle gateway fixture: fixed discount, fixed fee multiplier, a
/// configurable accepted-token set.
pub struct FakeOracleGateway {
    pub accepted_mints: Mutex<Vec<Pubkey>>,
    pub discount: Mutex<HolderTier>,
    pub fee_multiplier: u128,
}

impl Default for FakeOracleGateway {
    fn default() -> Self {
        Self { accepted_mints: Mutex::new(Vec::new()), discount: Mutex::new(HolderTier::none()), fee_multiplier: 1_000 }
    }
}

impl FakeOracleGateway {
    pub fn accepting(mint: Pubkey) -> Self {
        let gateway = Self::default();
        gateway.accepted_mints.lock().push(mint);
        gateway
    }
}

#[async_trait]
impl OracleGateway for FakeOracleGateway {
    async fn fee_in_token(&self, _mint: &Pubkey, fee_lamports: u64, _tier: &HolderTier) -> RelayResult<u128> {
        Ok(fee_lamports as u128 * self.fee_multiplier)
    }

    async fn is_token_accepted(&self, mint: &Pubkey) -> RelayResult<bool> {
        Ok(self.accepted_mints.lock().contains(mint))
    }

    async fn user_discount(&self, _wallet: &Pubkey) -> RelayResult<HolderTier> {
        Ok(*self.discount.lock())
    }

    async fn list_accepted_tokens(&self) -> RelayResult<Vec<TokenInfo>> {
        Ok(self.accepted_mints.lock().iter().map(|m| TokenInfo { mint: m.to_string(), accepted: true }).collect())
    }
}

/// Builds a signed wire-format SPL-token transfer from `user`'s ATA to
/// `treasury`'s ATA for `mint`, fee-paid by `fee_payer`, the shape every
/// `/v1/submit` test needs (spec §6's fee-instruction contract).
pub fn build_fee_transfer_tx(fee_payer: &Pubkey, user: &Keypair, treasury: &Pubkey, mint: &Pubkey, amount: u64, blockhash: Hash) -> Vec<u8> {
    let treasury_ata = get_associated_token_address(treasury, mint);
    let user_ata = get_associated_token_address(&user.pubkey(), mint);
    let transfer_ix = spl_token::instruction::transfer(&spl_token::id(), &user_ata, &treasury_ata, &user.pubkey(), &[], amount)
        .expect("well-formed transfer instruction");
    let message = Message::new(&[transfer_ix], Some(fee_payer));
    let mut tx = Transaction::new_unsigned(message);
    tx.message.recent_blockhash = blockhash;
    tx.partial_sign(&[user], blockhash);
    bincode::serialize(&VersionedTransaction::from(tx)).expect("versioned transaction always serializes")
}
