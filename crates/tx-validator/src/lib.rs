//! Transaction Validator (spec C4): pure functions that turn the wire bytes
//! a client posts to `/v1/submit` into a structurally-sound, fingerprinted
//! transaction, or a list of reasons it isn't one. Nothing here talks to the
//! network or holds state — that's `chain-adapter`'s job.

use relay_types::{RelayError, RelayResult, TxFingerprint};
use solana_sdk::{
    hash::Hash,
    message::VersionedMessage,
    pubkey::Pubkey,
    system_instruction::SystemInstruction,
    system_program,
    transaction::VersionedTransaction,
};
use spl_associated_token_account::get_associated_token_address;

/// Maximum serialized transaction size accepted over the wire, matching the
/// cluster's own packet limit (spec §3 `TxTooLarge`).
pub const MAX_TX_WIRE_BYTES: usize = 1232;

/// Index fee payers are required to occupy in `account_keys` (spec §4.4 /
/// §6: "fee payer is declared at the protocol-defined index").
pub const FEE_PAYER_ACCOUNT_INDEX: usize = 0;

/// Result of a passed structural validation: the fee payer the transaction
/// itself claims, handed back to the caller so it can be checked against the
/// reservation that authorized this submit (spec §4.8 step 8).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValidatedStructure {
    pub fee_payer_key: Pubkey,
    pub user_key: Pubkey,
}

pub struct TxValidator;

impl TxValidator {
    /// Rejects oversized payloads before any deserialization work happens.
    pub fn validate_size(wire_bytes: &[u8]) -> RelayResult<()> {
        if wire_bytes.len() > MAX_TX_WIRE_BYTES {
            return Err(RelayError::TxTooLarge);
        }
        Ok(())
    }

    /// Deserializes either a legacy or a v0 transaction from wire bytes.
    pub fn deserialize(wire_bytes: &[u8]) -> RelayResult<VersionedTransaction> {
        Self::validate_size(wire_bytes)?;
        bincode::deserialize(wire_bytes).map_err(|_| RelayError::InvalidTxFormat)
    }

    pub fn get_blockhash(tx: &VersionedTransaction) -> Hash {
        *tx.message.recent_blockhash()
    }

    /// Canonical fingerprint over the exact bytes submitted, so a byte-for-byte
    /// resubmit of the same signed transaction always hashes identically
    /// regardless of how the relayer re-serializes it internally.
    pub fn compute_fingerprint(wire_bytes: &[u8]) -> TxFingerprint {
        TxFingerprint::from_signed_bytes(wire_bytes)
    }

    /// Spec §4.4's structural checks: one non-payer signer, fee payer at the
    /// protocol index, a fee instruction crediting the treasury's ATA with
    /// exactly the quoted amount, no instruction draining the fee payer's
    /// native balance, and a verifiable user signature.
    pub fn validate_structure(
        tx: &VersionedTransaction,
        expected_fee_amount_payment_token: u128,
        treasury: &Pubkey,
        payment_mint: &Pubkey,
    ) -> Result<ValidatedStructure, Vec<String>> {
        let mut reasons = Vec::new();

        let account_keys = tx.message.static_account_keys();
        let num_signers = tx.message.header().num_required_signatures as usize;

        let fee_payer_key = account_keys.get(FEE_PAYER_ACCOUNT_INDEX).copied();
        if fee_payer_key.is_none() {
            reasons.push("transaction declares no accounts".to_string());
            return Err(reasons);
        }
        let fee_payer_key = fee_payer_key.unwrap();

        if num_signers != 2 {
            reasons.push(format!(
                "expected exactly one non-payer signer, found {} required signers",
                num_signers.saturating_sub(1)
            ));
        }

        let user_key = account_keys.get(1).copied();
        if user_key.is_none() {
            reasons.push("transaction has no user signer slot".to_string());
        }

        if tx.signatures.len() != num_signers {
            reasons.push(format!(
                "signature count {} does not match required signer count {num_signers}",
                tx.signatures.len()
            ));
        }

        if let Some(user_key) = user_key {
            if let Some(user_sig) = tx.signatures.get(1) {
                let message_bytes = tx.message.serialize();
                if !user_sig.verify(user_key.as_ref(), &message_bytes) {
                    reasons.push("user signature does not verify against the message".to_string());
                }
            }
        }

        let treasury_ata = get_associated_token_address(treasury, payment_mint);
        let expected_amount = u64::try_from(expected_fee_amount_payment_token).unwrap_or(u64::MAX);

        let fee_instruction_ok = find_fee_instruction(tx, &account_keys, &treasury_ata, expected_amount);
        if !fee_instruction_ok {
            reasons.push(format!(
                "no instruction transfers exactly {expected_amount} of mint {payment_mint} into the treasury ATA"
            ));
        }

        if drains_fee_payer_native_balance(tx, &account_keys, &fee_payer_key) {
            reasons.push("instruction transfers native balance out of the fee payer".to_string());
        }

        if !reasons.is_empty() {
            return Err(reasons);
        }

        Ok(ValidatedStructure { fee_payer_key, user_key: user_key.unwrap() })
    }
}

fn find_fee_instruction(
    tx: &VersionedTransaction,
    account_keys: &[Pubkey],
    treasury_ata: &Pubkey,
    expected_amount: u64,
) -> bool {
    let instructions = match &tx.message {
        VersionedMessage::Legacy(m) => &m.instructions,
        VersionedMessage::V0(m) => &m.instructions,
    };

    for ix in instructions {
        let Some(program_id) = account_keys.get(ix.program_id_index as usize) else { continue };
        if *program_id != spl_token::id() {
            continue;
        }

        let Ok(parsed) = spl_token::instruction::TokenInstruction::unpack(&ix.data) else { continue };
        let (amount, dest_index) = match parsed {
            spl_token::instruction::TokenInstruction::Transfer { amount } => (amount, ix.accounts.get(1)),
            spl_token::instruction::TokenInstruction::TransferChecked { amount, .. } => {
                (amount, ix.accounts.get(2))
            }
            _ => continue,
        };

        let Some(dest_index) = dest_index else { continue };
        let Some(dest) = account_keys.get(*dest_index as usize) else { continue };

        if dest == treasury_ata && amount == expected_amount {
            return true;
        }
    }

    false
}

fn drains_fee_payer_native_balance(
    tx: &VersionedTransaction,
    account_keys: &[Pubkey],
    fee_payer_key: &Pubkey,
) -> bool {
    let instructions = match &tx.message {
        VersionedMessage::Legacy(m) => &m.instructions,
        VersionedMessage::V0(m) => &m.instructions,
    };

    for ix in instructions {
        let Some(program_id) = account_keys.get(ix.program_id_index as usize) else { continue };
        if *program_id != system_program::id() {
            continue;
        }

        let Ok(parsed) = bincode::deserialize::<SystemInstruction>(&ix.data) else { continue };
        let is_transfer_like = matches!(
            parsed,
            SystemInstruction::Transfer { .. }
                | SystemInstruction::TransferWithSeed { .. }
                | SystemInstruction::WithdrawNonceAccount(_)
        );
        if !is_transfer_like {
            continue;
        }

        if let Some(source_index) = ix.accounts.first() {
            if account_keys.get(*source_index as usize) == Some(fee_payer_key) {
                return true;
            }
        }
    }

    false
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use solana_sdk::{
        hash::Hash,
        message::Message,
        signature::{Keypair, Signer},
        system_instruction,
        transaction::Transaction,
    };

    use super::*;

    fn treasury_and_mint() -> (Pubkey, Pubkey) {
        (
            Pubkey::from_str("TReasury1111111111111111111111111111111111").unwrap_or_else(|_| Pubkey::new_unique()),
            Pubkey::from_str("Mint111111111111111111111111111111111111111").unwrap_or_else(|_| Pubkey::new_unique()),
        )
    }

    fn build_fee_transfer_tx(
        fee_payer: &Pubkey,
        user: &Keypair,
        treasury: &Pubkey,
        mint: &Pubkey,
        amount: u64,
    ) -> VersionedTransaction {
        let treasury_ata = get_associated_token_address(treasury, mint);
        let user_ata = get_associated_token_address(&user.pubkey(), mint);

        let transfer_ix = spl_token::instruction::transfer(
            &spl_token::id(),
            &user_ata,
            &treasury_ata,
            &user.pubkey(),
            &[],
            amount,
        )
        .unwrap();

        let message = Message::new(&[transfer_ix], Some(fee_payer));
        let mut tx = Transaction::new_unsigned(message);
        tx.message.recent_blockhash = Hash::new_from_array([7u8; 32]);
        tx.partial_sign(&[user], tx.message.recent_blockhash);
        VersionedTransaction::from(tx)
    }

    #[test]
    fn validate_size_rejects_oversized_payload() {
        let bytes = vec![0u8; MAX_TX_WIRE_BYTES + 1];
        assert!(matches!(TxValidator::validate_size(&bytes), Err(RelayError::TxTooLarge)));
    }

    #[test]
    fn validate_size_accepts_payload_at_limit() {
        let bytes = vec![0u8; MAX_TX_WIRE_BYTES];
        assert!(TxValidator::validate_size(&bytes).is_ok());
    }

    #[test]
    fn deserialize_rejects_garbage_bytes() {
        let bytes = vec![0xffu8; 64];
        assert!(matches!(TxValidator::deserialize(&bytes), Err(RelayError::InvalidTxFormat)));
    }

    #[test]
    fn compute_fingerprint_is_deterministic_over_identical_bytes() {
        let bytes = b"some signed transaction bytes".to_vec();
        assert_eq!(TxValidator::compute_fingerprint(&bytes), TxValidator::compute_fingerprint(&bytes));
    }

    #[test]
    fn compute_fingerprint_differs_for_different_bytes() {
        assert_ne!(
            TxValidator::compute_fingerprint(b"a"),
            TxValidator::compute_fingerprint(b"b")
        );
    }

    #[test]
    fn validate_structure_accepts_well_formed_fee_transfer() {
        let fee_payer = Pubkey::new_unique();
        let user = Keypair::new();
        let (treasury, mint) = treasury_and_mint();
        let amount = 1_000u64;

        let tx = build_fee_transfer_tx(&fee_payer, &user, &treasury, &mint, amount);
        let result = TxValidator::validate_structure(&tx, amount as u128, &treasury, &mint);

        assert!(result.is_ok(), "expected structure to validate, got {result:?}");
        let validated = result.unwrap();
        assert_eq!(validated.fee_payer_key, fee_payer);
        assert_eq!(validated.user_key, user.pubkey());
    }

    #[test]
    fn validate_structure_rejects_amount_mismatch() {
        let fee_payer = Pubkey::new_unique();
        let user = Keypair::new();
        let (treasury, mint) = treasury_and_mint();

        let tx = build_fee_transfer_tx(&fee_payer, &user, &treasury, &mint, 1_000);
        let result = TxValidator::validate_structure(&tx, 2_000u128, &treasury, &mint);

        assert!(result.is_err());
    }

    #[test]
    fn validate_structure_rejects_native_drain_from_fee_payer() {
        let fee_payer_kp = Keypair::new();
        let user = Keypair::new();
        let (treasury, mint) = treasury_and_mint();
        let treasury_ata = get_associated_token_address(&treasury, &mint);
        let user_ata = get_associated_token_address(&user.pubkey(), &mint);

        let transfer_ix = spl_token::instruction::transfer(
            &spl_token::id(),
            &user_ata,
            &treasury_ata,
            &user.pubkey(),
            &[],
            1_000,
        )
        .unwrap();
        let drain_ix = system_instruction::transfer(&fee_payer_kp.pubkey(), &user.pubkey(), 1_000_000);

        let message = Message::new(&[transfer_ix, drain_ix], Some(&fee_payer_kp.pubkey()));
        let mut tx = Transaction::new_unsigned(message);
        tx.message.recent_blockhash = Hash::new_from_array([9u8; 32]);
        tx.partial_sign(&[&user], tx.message.recent_blockhash);
        let tx = VersionedTransaction::from(tx);

        let result = TxValidator::validate_structure(&tx, 1_000u128, &treasury, &mint);
        assert!(result.is_err());
        let reasons = result.unwrap_err();
        assert!(reasons.iter().any(|r| r.contains("native balance")));
    }

    #[test]
    fn get_blockhash_reads_declared_recent_blockhash() {
        let fee_payer = Pubkey::new_unique();
        let user = Keypair::new();
        let (treasury, mint) = treasury_and_mint();
        let tx = build_fee_transfer_tx(&fee_payer, &user, &treasury, &mint, 1_000);
        assert_eq!(TxValidator::get_blockhash(&tx), Hash::new_from_array([7u8; 32]));
    }

}
