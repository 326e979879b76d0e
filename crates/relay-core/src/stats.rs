//! Burn-worker accounting and the counters backing `GET /v1/stats` (spec §6).
//!
//! The buy-and-burn worker itself is an external collaborator (spec §1); this
//! struct is the handoff point — the submit path records what it collected
//! here (spec §4.8 step 12: "record burn-worker accounting"), and the worker
//! (or an admin action standing in for it until that worker exists) reports
//! back how much it actually burned.

use std::sync::atomic::{AtomicU64, Ordering};

/// Point-in-time view returned to `relay-http`'s `/v1/stats` handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatsSnapshot {
    pub total_transactions: u64,
    pub total_fees_collected_lamports: u64,
    pub total_burned_lamports: u64,
}

/// Lock-free counters: every field is independently monotonic, so plain
/// atomics are enough — there's no cross-field invariant that needs a mutex
/// the way the pool's reservation bookkeeping does.
#[derive(Default)]
pub struct RelayStats {
    total_transactions: AtomicU64,
    total_fees_collected_lamports: AtomicU64,
    total_burned_lamports: AtomicU64,
}

impl RelayStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Called once per confirmed submit (spec §4.8 step 12).
    pub fn record_submit_success(&self, fee_amount_native: u64) {
        self.total_transactions.fetch_add(1, Ordering::Relaxed);
        self.total_fees_collected_lamports.fetch_add(fee_amount_native, Ordering::Relaxed);
        metrics::counter!("relayer.stats.fees_collected_lamports", fee_amount_native);
    }

    /// Called when the buy-and-burn worker reports a completed burn cycle.
    pub fn record_burn_report(&self, burned_lamports: u64) {
        self.total_burned_lamports.fetch_add(burned_lamports, Ordering::Relaxed);
        metrics::counter!("relayer.stats.burned_lamports", burned_lamports);
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            total_transactions: self.total_transactions.load(Ordering::Relaxed),
            total_fees_collected_lamports: self.total_fees_collected_lamports.load(Ordering::Relaxed),
            total_burned_lamports: self.total_burned_lamports.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_accumulate_across_calls() {
        let stats = RelayStats::new();
        stats.record_submit_success(100_000);
        stats.record_submit_success(50_000);
        stats.record_burn_report(30_000);

        let snapshot = stats.snapshot();
        assert_eq!(snapshot.total_transactions, 2);
        assert_eq!(snapshot.total_fees_collected_lamports, 150_000);
        assert_eq!(snapshot.total_burned_lamports, 30_000);
    }
}
