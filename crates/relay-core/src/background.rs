//! Background ticks (spec §5): balance refresh, quote-store sweep, the
//! anomaly detector's baseline rederive + rate-limiter gc, and the audit
//! ring flush. Each runs on its own interval inside a `tokio::select!` loop
//! that also watches a `CancellationToken`, the same shutdown shape the
//! teacher's long-running tasks use, so `bin/relayer` can stop all four with
//! one `token.cancel()` on SIGTERM.

use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::RelayCore;

const BALANCE_REFRESH_INTERVAL: Duration = Duration::from_secs(30);
const QUOTE_SWEEP_INTERVAL: Duration = Duration::from_secs(30);
const ANOMALY_TICK_INTERVAL: Duration = Duration::from_secs(30);
const AUDIT_FLUSH_INTERVAL: Duration = Duration::from_secs(10);

impl RelayCore {
    /// Spawns the four background loops and returns immediately; callers
    /// hold the `CancellationToken` and cancel it to join a graceful
    /// shutdown (the handles themselves are not returned since the caller
    /// only ever needs to cancel, never to inspect task output).
    pub fn spawn_background_tasks(&self, shutdown: CancellationToken) {
        tokio::spawn(self.clone().run_balance_refresher(shutdown.clone()));
        tokio::spawn(self.clone().run_quote_sweeper(shutdown.clone()));
        tokio::spawn(self.clone().run_anomaly_tick(shutdown.clone()));
        tokio::spawn(self.clone().run_audit_flusher(shutdown));
    }

    async fn run_balance_refresher(self, shutdown: CancellationToken) {
        let mut interval = tokio::time::interval(BALANCE_REFRESH_INTERVAL);
        loop {
            tokio::select! {
                _ = interval.tick() => self.refresh_balances_once().await,
                _ = shutdown.cancelled() => {
                    info!("balance refresher shutting down");
                    return;
                }
            }
        }
    }

    async fn refresh_balances_once(&self) {
        let keys: Vec<_> = self.pool.snapshot().payers.into_iter().map(|p| p.pub_key).collect();
        if keys.is_empty() {
            return;
        }
        match self.chain.batch_balances(&keys).await {
            Ok(balances) => {
                let snapshot = balances.into_iter().collect();
                self.pool.apply_balance_snapshot(snapshot, true, chrono::Utc::now());
            }
            Err(err) => {
                tracing::warn!(%err, "balance refresh RPC call failed, marking payers stale");
                self.pool.apply_balance_snapshot(Default::default(), false, chrono::Utc::now());
            }
        }
    }

    async fn run_quote_sweeper(self, shutdown: CancellationToken) {
        let mut interval = tokio::time::interval(QUOTE_SWEEP_INTERVAL);
        loop {
            tokio::select! {
                _ = interval.tick() => self.quote_store.sweep().await,
                _ = shutdown.cancelled() => {
                    info!("quote sweeper shutting down");
                    return;
                }
            }
        }
    }

    async fn run_anomaly_tick(self, shutdown: CancellationToken) {
        let mut interval = tokio::time::interval(ANOMALY_TICK_INTERVAL);
        loop {
            tokio::select! {
                _ = interval.tick() => {
                    let events = self.rate_anomaly.tick_anomaly_detector();
                    for event in events {
                        tracing::warn!(?event, "anomaly detector flagged a subject");
                    }
                    self.rate_anomaly.gc();
                }
                _ = shutdown.cancelled() => {
                    info!("anomaly tick shutting down");
                    return;
                }
            }
        }
    }

    async fn run_audit_flusher(self, shutdown: CancellationToken) {
        let mut interval = tokio::time::interval(AUDIT_FLUSH_INTERVAL);
        loop {
            tokio::select! {
                _ = interval.tick() => self.audit.flush().await,
                _ = shutdown.cancelled() => {
                    info!("audit flusher shutting down, draining remaining events");
                    self.audit.flush().await;
                    return;
                }
            }
        }
    }
}
