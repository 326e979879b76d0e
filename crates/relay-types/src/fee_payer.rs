use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use solana_sdk::pubkey::Pubkey;

use crate::quote::QuoteId;

/// Rotation lifecycle of a fee payer. See `fee-payer-pool`'s state machine
/// doc for the full transition table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RotationState {
    Active,
    Retiring { forced: bool },
    Retired { forced: bool },
}

impl RotationState {
    pub fn accepts_new_reservations(&self) -> bool {
        matches!(self, RotationState::Active)
    }

    pub fn can_process_submit(&self) -> bool {
        matches!(self, RotationState::Active | RotationState::Retiring { .. })
    }

    pub fn is_retired(&self) -> bool {
        matches!(self, RotationState::Retired { .. })
    }
}

/// In-memory view of one signing identity the pool can assign as fee payer.
///
/// The secret signing key is intentionally absent from this type: it lives
/// only inside `fee-payer-pool`'s keyring and never crosses an API boundary
/// or gets logged/serialized alongside the rest of this bookkeeping state.
#[derive(Debug, Clone)]
pub struct FeePayer {
    pub pub_key: Pubkey,
    pub observed_balance: u64,
    pub last_refresh: DateTime<Utc>,
    pub balance_stale: bool,
    pub unhealthy_until: Option<DateTime<Utc>>,
    pub rotation_state: RotationState,
    pub reservations: HashSet<QuoteId>,
}

impl FeePayer {
    pub fn new(pub_key: Pubkey, now: DateTime<Utc>) -> Self {
        Self {
            pub_key,
            observed_balance: 0,
            last_refresh: now,
            balance_stale: true,
            unhealthy_until: None,
            rotation_state: RotationState::Active,
            reservations: HashSet::new(),
        }
    }

    pub fn is_healthy_at(&self, now: DateTime<Utc>) -> bool {
        self.unhealthy_until.map(|until| now > until).unwrap_or(true)
    }

    pub fn reserved_amount(&self, reservations: &[crate::Reservation]) -> u64 {
        reservations
            .iter()
            .filter(|r| self.reservations.contains(&r.quote_id))
            .map(|r| r.amount)
            .sum()
    }
}
