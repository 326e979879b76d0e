use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use solana_sdk::pubkey::Pubkey;
use uuid::Uuid;

use crate::tiers::HolderTier;

/// Opaque 128-bit quote identifier, handed to the client as a UUID.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct QuoteId(pub Uuid);

impl QuoteId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for QuoteId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for QuoteId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for QuoteId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

/// A priced, time-bounded offer to co-sign a transaction as fee payer.
///
/// Exactly one of `{expired, consumed, live}` holds at any instant; callers
/// determine this from `expires_at` and `consumed` rather than a tri-state
/// field, since "expired" is a function of wall clock, not stored state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Quote {
    pub id: QuoteId,
    pub user_key: Pubkey,
    pub payment_mint: Pubkey,
    pub fee_payer_key: Pubkey,
    pub fee_amount_native: u64,
    pub fee_amount_payment_token: u128,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub holder_tier: HolderTier,
    pub compute_unit_estimate: u32,
    pub consumed: bool,
}

impl Quote {
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }

    pub fn ttl_seconds(&self) -> i64 {
        (self.expires_at - self.created_at).num_seconds()
    }
}
