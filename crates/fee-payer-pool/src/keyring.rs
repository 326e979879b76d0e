use std::collections::HashMap;

use solana_sdk::{signature::Keypair, signer::Signer};

/// Holds the relayer's signing keys. Never cloned, never logged, never
/// touched by the mutex guarding the rest of the pool's bookkeeping —
/// signing keys don't change at runtime, so they need no lock.
pub struct Keyring {
    keys: HashMap<solana_sdk::pubkey::Pubkey, Keypair>,
}

impl Keyring {
    pub fn from_base58_keys(encoded: &[String]) -> Result<Self, String> {
        let mut keys = HashMap::with_capacity(encoded.len());
        for raw in encoded {
            let bytes = bs58::decode(raw.trim())
                .into_vec()
                .map_err(|e| format!("invalid base58 fee payer key: {e}"))?;
            let keypair = Keypair::from_bytes(&bytes)
                .map_err(|e| format!("invalid fee payer keypair bytes: {e}"))?;
            keys.insert(keypair.pubkey(), keypair);
        }
        Ok(Self { keys })
    }

    #[cfg(any(test, feature = "test-utils"))]
    pub fn from_keypairs(keypairs: Vec<Keypair>) -> Self {
        Self { keys: keypairs.into_iter().map(|k| (k.pubkey(), k)).collect() }
    }

    pub fn pubkeys(&self) -> Vec<solana_sdk::pubkey::Pubkey> {
        self.keys.keys().copied().collect()
    }

    pub fn get(&self, pubkey: &solana_sdk::pubkey::Pubkey) -> Option<&Keypair> {
        self.keys.get(pubkey)
    }
}

impl std::fmt::Debug for Keyring {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Keyring").field("payers", &self.keys.len()).finish()
    }
}
