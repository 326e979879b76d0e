//! Replay Set (spec C3) and the provisional in-flight dedup set spec §4.8/§9
//! layer on top of it.
//!
//! The fingerprint is inserted into the durable [`ReplaySet`] only after a
//! successful send, so a client whose first attempt fails transiently isn't
//! permanently locked out. That leaves a narrow window where two concurrent
//! submits of byte-identical signed transactions could both reach the chain
//! adapter; [`InFlightSet`] closes it with a short-lived per-fingerprint
//! hold (spec's "Design Notes" mitigation).
//!
//! Single-instance deployments may use the local time-indexed set here
//! directly; a multi-instance deployment MUST back this with a shared store
//! instead (spec §9) — that swap is a drop-in behind the same two types.

use std::{collections::HashMap, time::Duration};

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use relay_types::TxFingerprint;

const DEFAULT_REPLAY_TTL: Duration = Duration::from_secs(120);
const DEFAULT_INFLIGHT_TTL: Duration = Duration::from_secs(60);

/// Durable-for-N-minutes set of submitted transaction fingerprints (spec
/// §3's `TxFingerprint` entity, §4.3's contract).
pub struct ReplaySet {
    ttl: chrono::Duration,
    seen: Mutex<HashMap<TxFingerprint, DateTime<Utc>>>,
}

impl ReplaySet {
    pub fn new(ttl: Duration) -> Self {
        Self { ttl: chrono::Duration::from_std(ttl).unwrap_or(chrono::Duration::seconds(120)), seen: Mutex::new(HashMap::new()) }
    }

    /// Returns `true` on first insert, `false` if already present (spec
    /// §8's round-trip property: `markAndTest(fp)` then `markAndTest(fp)` ->
    /// `true, false`).
    pub fn mark_and_test(&self, fingerprint: TxFingerprint) -> bool {
        let now = Utc::now();
        let mut seen = self.seen.lock();
        sweep_locked(&mut seen, now);

        if seen.contains_key(&fingerprint) {
            metrics::counter!("relayer.replay_set.duplicate_detected", 1);
            false
        } else {
            seen.insert(fingerprint, now + self.ttl);
            true
        }
    }

    /// Non-mutating membership check, swept first so an expired entry never
    /// reports as present. Used by the submit path to reject an already-seen
    /// fingerprint (spec §4.8 step 5) without this call itself counting as
    /// the insert — that only happens after a successful send (spec §9).
    pub fn contains(&self, fingerprint: TxFingerprint) -> bool {
        let now = Utc::now();
        let mut seen = self.seen.lock();
        sweep_locked(&mut seen, now);
        seen.contains_key(&fingerprint)
    }

    pub fn len(&self) -> usize {
        self.seen.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for ReplaySet {
    fn default() -> Self {
        Self::new(DEFAULT_REPLAY_TTL)
    }
}

fn sweep_locked(map: &mut HashMap<TxFingerprint, DateTime<Utc>>, now: DateTime<Utc>) {
    map.retain(|_, expires_at| *expires_at > now);
}

/// Short-lived hold used to dedupe concurrent submits of the same signed
/// bytes while a send is in flight, before the fingerprint is durably
/// recorded. Acquire returns `false` if another caller already holds it.
pub struct InFlightSet {
    ttl: chrono::Duration,
    holds: Mutex<HashMap<TxFingerprint, DateTime<Utc>>>,
}

impl InFlightSet {
    pub fn new(ttl: Duration) -> Self {
        Self { ttl: chrono::Duration::from_std(ttl).unwrap_or(chrono::Duration::seconds(60)), holds: Mutex::new(HashMap::new()) }
    }

    pub fn try_acquire(&self, fingerprint: TxFingerprint) -> bool {
        let now = Utc::now();
        let mut holds = self.holds.lock();
        sweep_locked(&mut holds, now);

        if holds.contains_key(&fingerprint) {
            false
        } else {
            holds.insert(fingerprint, now + self.ttl);
            true
        }
    }

    pub fn release(&self, fingerprint: &TxFingerprint) {
        self.holds.lock().remove(fingerprint);
    }
}

impl Default for InFlightSet {
    fn default() -> Self {
        Self::new(DEFAULT_INFLIGHT_TTL)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fp(byte: u8) -> TxFingerprint {
        TxFingerprint([byte; 32])
    }

    #[test]
    fn mark_and_test_is_true_then_false() {
        let set = ReplaySet::default();
        assert!(set.mark_and_test(fp(1)));
        assert!(!set.mark_and_test(fp(1)));
    }

    #[test]
    fn distinct_fingerprints_are_independent() {
        let set = ReplaySet::default();
        assert!(set.mark_and_test(fp(1)));
        assert!(set.mark_and_test(fp(2)));
    }

    #[test]
    fn expired_entries_are_swept_and_reusable() {
        let set = ReplaySet::new(Duration::from_millis(1));
        assert!(set.mark_and_test(fp(9)));
        std::thread::sleep(Duration::from_millis(5));
        assert!(set.mark_and_test(fp(9)));
    }

    #[test]
    fn contains_does_not_consume_the_entry() {
        let set = ReplaySet::default();
        set.mark_and_test(fp(4));
        assert!(set.contains(fp(4)));
        assert!(set.contains(fp(4)));
        assert!(!set.contains(fp(5)));
    }

    #[test]
    fn in_flight_guards_concurrent_duplicate_sends() {
        let set = InFlightSet::default();
        assert!(set.try_acquire(fp(3)));
        assert!(!set.try_acquire(fp(3)));
        set.release(&fp(3));
        assert!(set.try_acquire(fp(3)));
    }
}
