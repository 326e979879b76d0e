use std::fmt;

use sha2::{Digest, Sha256};

/// Canonical 32-byte digest of a signed transaction's wire bytes, used for
/// replay detection and in-flight dedup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TxFingerprint(pub [u8; 32]);

impl TxFingerprint {
    pub fn from_signed_bytes(bytes: &[u8]) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(bytes);
        Self(hasher.finalize().into())
    }
}

impl fmt::Display for TxFingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", bs58::encode(self.0).into_string())
    }
}
