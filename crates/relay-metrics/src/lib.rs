//! Central description registry for the `metrics` names emitted across the
//! workspace. Every crate calls `metrics::counter!`/`gauge!` directly at the
//! point of use (that's the whole point of the macros resolving against a
//! globally installed recorder); this crate just gives each name a
//! human-readable description once, up front, so whatever exporter the
//! binary installs (Prometheus, statsd, ...) renders them with HELP text
//! instead of a bare name.
//!
//! `describe_all` is idempotent and cheap enough to call unconditionally at
//! startup, before a recorder is even installed — `metrics` buffers
//! descriptions until one is.

use metrics::{describe_counter, describe_gauge, Unit};

/// Registers descriptions for every counter/gauge name used across the
/// relayer. Keep this in sync with the call sites; a name with no entry here
/// still works, it just shows up undocumented in the exporter.
pub fn describe_all() {
    describe_pool_metrics();
    describe_quote_store_metrics();
    describe_chain_adapter_metrics();
    describe_rate_anomaly_metrics();
    describe_replay_metrics();
    describe_audit_metrics();
    describe_core_metrics();
    describe_http_metrics();
}

fn describe_pool_metrics() {
    describe_counter!(
        "relayer.pool.reservations_created",
        Unit::Count,
        "Fee-payer reservations successfully created"
    );
    describe_counter!(
        "relayer.pool.reservations_released",
        Unit::Count,
        "Fee-payer reservations released back to the pool"
    );
    describe_counter!(
        "relayer.pool.reserve_rejected_no_capacity",
        Unit::Count,
        "Reserve calls rejected because no fee payer had a free reservation slot"
    );
    describe_counter!(
        "relayer.pool.reserve_rejected_circuit_open",
        Unit::Count,
        "Reserve calls rejected because every fee payer's circuit breaker was open"
    );
    describe_counter!(
        "relayer.pool.circuit_opened",
        Unit::Count,
        "Fee-payer circuit breakers tripped open after consecutive failures"
    );
    describe_counter!(
        "relayer.pool.payer_marked_unhealthy",
        Unit::Count,
        "Fee payers marked unhealthy by a balance refresh"
    );
    describe_gauge!(
        "relayer.pool.payer_balance_lamports",
        Unit::Count,
        "Last observed on-chain balance of a fee payer, in lamports"
    );
}

fn describe_quote_store_metrics() {
    describe_counter!(
        "relayer.quote_store.swept",
        Unit::Count,
        "Expired quotes removed by the periodic sweep"
    );
    describe_gauge!("relayer.quote_store.size", Unit::Count, "Live quotes currently held");
}

fn describe_chain_adapter_metrics() {
    describe_counter!(
        "relayer.chain_adapter.breaker_opened",
        Unit::Count,
        "RPC endpoint circuit breakers tripped open after consecutive failures"
    );
}

fn describe_rate_anomaly_metrics() {
    describe_counter!(
        "relayer.rate_limit.ip_global_exceeded",
        Unit::Count,
        "Requests rejected for exceeding the per-IP global rate limit"
    );
    describe_counter!(
        "relayer.rate_limit.ip_exceeded",
        Unit::Count,
        "Requests rejected for exceeding a per-IP, per-operation rate limit"
    );
    describe_counter!(
        "relayer.rate_limit.wallet_exceeded",
        Unit::Count,
        "Requests rejected for exceeding a per-wallet, per-operation rate limit"
    );
    describe_gauge!(
        "relayer.anomaly.global_5min_total",
        Unit::Count,
        "Total quote + submit + failure events observed globally in the trailing 5 minutes"
    );
    describe_counter!(
        "relayer.anomaly.detected",
        Unit::Count,
        "Anomalous traffic events raised by the learned-baseline detector"
    );
}

fn describe_replay_metrics() {
    describe_counter!(
        "relayer.replay_set.duplicate_detected",
        Unit::Count,
        "Transactions rejected as replays of an already-seen fingerprint"
    );
}

fn describe_audit_metrics() {
    describe_counter!("relayer.audit.logged", Unit::Count, "Audit events appended to the in-memory ring");
    describe_counter!(
        "relayer.audit.flushed",
        Unit::Count,
        "Audit events drained from the ring and handed to the sink"
    );
}

fn describe_core_metrics() {
    describe_counter!("relayer.quote.created", Unit::Count, "Quotes successfully issued");
    describe_counter!("relayer.quote.rejected", Unit::Count, "Quote requests rejected before issuance");
    describe_counter!("relayer.submit.success", Unit::Count, "Submitted transactions confirmed on chain");
    describe_counter!(
        "relayer.submit.rejected",
        Unit::Count,
        "Submit requests rejected by validation before being sent to the chain"
    );
    describe_counter!(
        "relayer.submit.failed",
        Unit::Count,
        "Submitted transactions that failed after being sent to the chain"
    );
    describe_counter!(
        "relayer.submit.retried",
        Unit::Count,
        "Submit attempts retried after a transient chain-adapter failure"
    );
}

fn describe_http_metrics() {
    describe_counter!("relayer.http.requests", Unit::Count, "HTTP requests handled, by route and status");
    describe_gauge!(
        "relayer.http.request_duration_seconds",
        Unit::Seconds,
        "Latency of the most recently completed HTTP request, by route"
    );
}
