use chrono::{DateTime, Utc};
use solana_sdk::pubkey::Pubkey;

use crate::quote::QuoteId;

/// Pool-side capacity hold backing a live quote.
///
/// `expires_at` must be `>= ` the quote's own `expires_at` (RESERVATION_TTL
/// is configured `>=` QUOTE_TTL) so that clock skew between the quote
/// store's sweeper and the pool's sweeper never strands a reservation whose
/// quote has already been swept.
#[derive(Debug, Clone)]
pub struct Reservation {
    pub quote_id: QuoteId,
    pub payer_key: Pubkey,
    pub amount: u64,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl Reservation {
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }
}
