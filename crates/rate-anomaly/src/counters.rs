use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;

/// Per-event-type counts a [`WalletBucket`]/[`IpBucket`] tracks (spec §3,
/// §4.9): quote requests, submit requests, and failed submits (the latter
/// feeds the anomaly detector even though it isn't separately rate-limited).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    Quote,
    Submit,
    Failure,
}

/// Timestamped occurrences of one event kind, trimmed to a window on every
/// access. A `VecDeque` rather than an atomic counter because spec §4.9 needs
/// both a 60s rate-limit view and a 5-minute anomaly view of the same stream;
/// storing raw timestamps lets both windows be derived from one log.
#[derive(Default)]
struct EventLog {
    timestamps: VecDeque<DateTime<Utc>>,
}

impl EventLog {
    fn record(&mut self, now: DateTime<Utc>) {
        self.timestamps.push_back(now);
    }

    /// Count of events within `window` of `now`, trimming anything older
    /// than the larger of the two windows this bucket is asked about.
    fn count_within(&mut self, now: DateTime<Utc>, window: chrono::Duration) {
        while let Some(front) = self.timestamps.front() {
            if now - *front > window {
                self.timestamps.pop_front();
            } else {
                break;
            }
        }
    }

    fn count(&self) -> usize {
        self.timestamps.len()
    }

    fn oldest(&self) -> Option<DateTime<Utc>> {
        self.timestamps.front().copied()
    }
}

/// Sliding-window activity for one subject (a wallet or an IP). Keeps the
/// longer of the two windows (5 min anomaly, 60s rate-limit) materialized and
/// derives the shorter one by trimming a copy, so a single record feeds both
/// (spec §4.9: "two sliding-window counters ... each with per-event-type
/// sub-counters").
pub struct Bucket {
    quote: Mutex<EventLog>,
    submit: Mutex<EventLog>,
    failure: Mutex<EventLog>,
    pub last_activity: Mutex<DateTime<Utc>>,
}

const RATE_WINDOW: chrono::Duration = chrono::Duration::seconds(60);
const ANOMALY_WINDOW: chrono::Duration = chrono::Duration::seconds(5 * 60);

impl Bucket {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            quote: Mutex::new(EventLog::default()),
            submit: Mutex::new(EventLog::default()),
            failure: Mutex::new(EventLog::default()),
            last_activity: Mutex::new(now),
        }
    }

    fn log(&self, kind: EventKind) -> &Mutex<EventLog> {
        match kind {
            EventKind::Quote => &self.quote,
            EventKind::Submit => &self.submit,
            EventKind::Failure => &self.failure,
        }
    }

    pub fn record(&self, kind: EventKind, now: DateTime<Utc>) {
        let mut log = self.log(kind).lock();
        log.record(now);
        log.count_within(now, ANOMALY_WINDOW);
        *self.last_activity.lock() = now;
    }

    /// Count of `kind` events in the last 60s (rate-limit window).
    pub fn count_60s(&self, kind: EventKind, now: DateTime<Utc>) -> usize {
        let mut log = self.log(kind).lock();
        log.count_within(now, RATE_WINDOW);
        log.timestamps.iter().filter(|t| now - **t <= RATE_WINDOW).count()
    }

    /// Count of `kind` events in the last 5 minutes (anomaly window).
    pub fn count_5min(&self, kind: EventKind, now: DateTime<Utc>) -> usize {
        let mut log = self.log(kind).lock();
        log.count_within(now, ANOMALY_WINDOW);
        log.count()
    }

    pub fn total_5min(&self, now: DateTime<Utc>) -> usize {
        self.count_5min(EventKind::Quote, now)
            + self.count_5min(EventKind::Submit, now)
            + self.count_5min(EventKind::Failure, now)
    }

    /// `true` once every log has been empty for longer than `idle_after`
    /// (spec §3: "GC'd when empty for >5 min").
    pub fn is_idle(&self, now: DateTime<Utc>, idle_after: chrono::Duration) -> bool {
        let last = *self.last_activity.lock();
        now - last > idle_after
            && [&self.quote, &self.submit, &self.failure].iter().all(|l| l.lock().oldest().is_none())
    }
}
