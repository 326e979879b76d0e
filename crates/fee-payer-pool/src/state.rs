use std::collections::HashMap;

use chrono::{DateTime, Utc};
use relay_types::{FeePayer, QuoteId, Reservation, RotationState};
use solana_sdk::pubkey::Pubkey;

use crate::config::PoolConfig;

/// Everything that reserve/release/rotation mutate, behind one lock. Spec §5
/// mandates this be serialized by a single mutex because the critical
/// sections are short.
pub struct PoolState {
    pub payers: HashMap<Pubkey, FeePayer>,
    /// Stable iteration order for the round-robin cursor; rotation doesn't
    /// remove entries from here until a payer is fully RETIRED.
    pub order: Vec<Pubkey>,
    pub reservations: HashMap<QuoteId, Reservation>,
    pub cursor: usize,
    pub consecutive_failures: u32,
    pub breaker_open_until: Option<DateTime<Utc>>,
}

/// Read-only view for health checks / admin endpoints.
#[derive(Debug, Clone)]
pub struct PoolSnapshot {
    pub payers: Vec<PayerSnapshot>,
    pub breaker_open: bool,
    pub total_reservations: usize,
}

#[derive(Debug, Clone)]
pub struct PayerSnapshot {
    pub pub_key: Pubkey,
    pub observed_balance: u64,
    pub balance_stale: bool,
    pub rotation_state: RotationState,
    pub reservation_count: usize,
    pub healthy: bool,
}

impl PoolState {
    pub fn new(pubkeys: Vec<Pubkey>, now: DateTime<Utc>) -> Self {
        let payers = pubkeys.iter().map(|pk| (*pk, FeePayer::new(*pk, now))).collect();
        Self {
            payers,
            order: pubkeys,
            reservations: HashMap::new(),
            cursor: 0,
            consecutive_failures: 0,
            breaker_open_until: None,
        }
    }

    /// Step 1 of reserve: drop reservations past their own TTL. O(#reservations).
    pub fn sweep_expired_reservations(&mut self, now: DateTime<Utc>) {
        let expired: Vec<QuoteId> =
            self.reservations.iter().filter(|(_, r)| r.is_expired_at(now)).map(|(id, _)| *id).collect();
        for id in expired {
            self.remove_reservation(id);
        }
    }

    pub fn breaker_open(&self, now: DateTime<Utc>) -> bool {
        self.breaker_open_until.map(|until| now <= until).unwrap_or(false)
    }

    fn reserved_for(&self, payer: &Pubkey) -> u64 {
        self.payers
            .get(payer)
            .map(|p| p.reservations.iter().filter_map(|id| self.reservations.get(id)).map(|r| r.amount).sum())
            .unwrap_or(0)
    }

    fn is_reservable(&self, payer: &FeePayer, now: DateTime<Utc>, config: &PoolConfig) -> bool {
        payer.rotation_state.accepts_new_reservations()
            && payer.is_healthy_at(now)
            && payer.observed_balance >= config.min_healthy_balance_lamports
            && payer.reservations.len() < config.max_reservations_per_payer
    }

    /// Steps 3-4 of reserve: scan from `cursor`, wrapping once, for the
    /// first payer with enough headroom.
    pub fn find_candidate(&self, amount: u64, now: DateTime<Utc>, config: &PoolConfig) -> Option<Pubkey> {
        let n = self.order.len();
        if n == 0 {
            return None;
        }
        for offset in 0..n {
            let idx = (self.cursor + offset) % n;
            let pubkey = self.order[idx];
            let Some(payer) = self.payers.get(&pubkey) else { continue };
            if !self.is_reservable(payer, now, config) {
                continue;
            }
            let available = payer.observed_balance.saturating_sub(self.reserved_for(&pubkey));
            let needed = amount.saturating_add(config.min_healthy_balance_lamports);
            if available >= needed {
                return Some(pubkey);
            }
        }
        None
    }

    pub fn record_reservation(&mut self, payer_key: Pubkey, reservation: Reservation) {
        if let Some(payer) = self.payers.get_mut(&payer_key) {
            payer.reservations.insert(reservation.quote_id);
        }
        self.reservations.insert(reservation.quote_id, reservation);
    }

    pub fn remove_reservation(&mut self, quote_id: QuoteId) -> Option<Reservation> {
        let reservation = self.reservations.remove(&quote_id)?;
        if let Some(payer) = self.payers.get_mut(&reservation.payer_key) {
            payer.reservations.remove(&quote_id);
        }
        Some(reservation)
    }

    pub fn advance_cursor(&mut self) {
        if !self.order.is_empty() {
            self.cursor = (self.cursor + 1) % self.order.len();
        }
    }

    pub fn snapshot(&self, now: DateTime<Utc>, config: &PoolConfig) -> PoolSnapshot {
        let payers = self
            .order
            .iter()
            .filter_map(|pk| self.payers.get(pk))
            .map(|p| PayerSnapshot {
                pub_key: p.pub_key,
                observed_balance: p.observed_balance,
                balance_stale: p.balance_stale,
                rotation_state: p.rotation_state,
                reservation_count: p.reservations.len(),
                healthy: self.is_reservable(p, now, config),
            })
            .collect();
        PoolSnapshot { payers, breaker_open: self.breaker_open(now), total_reservations: self.reservations.len() }
    }
}
