use chrono::{DateTime, Utc};
use serde::Serialize;

/// Closed set of audit event types named in spec §4.10.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum AuditEventKind {
    QuoteCreated,
    QuoteRejected,
    SubmitSuccess,
    SubmitRejected,
    SubmitFailed,
    SecurityReplayAttack,
    SecurityBlockhashExpired,
    SecuritySimulationFailed,
    SecurityFeePayerMismatch,
    SecurityValidationFailed,
    RatelimitIp,
    RatelimitWallet,
    PayerReservationFailed,
    PayerBalanceLow,
    PayerMarkedUnhealthy,
    CircuitOpened,
    CircuitClosed,
}

impl AuditEventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditEventKind::QuoteCreated => "quote.created",
            AuditEventKind::QuoteRejected => "quote.rejected",
            AuditEventKind::SubmitSuccess => "submit.success",
            AuditEventKind::SubmitRejected => "submit.rejected",
            AuditEventKind::SubmitFailed => "submit.failed",
            AuditEventKind::SecurityReplayAttack => "security.replay_attack",
            AuditEventKind::SecurityBlockhashExpired => "security.blockhash_expired",
            AuditEventKind::SecuritySimulationFailed => "security.simulation_failed",
            AuditEventKind::SecurityFeePayerMismatch => "security.fee_payer_mismatch",
            AuditEventKind::SecurityValidationFailed => "security.validation_failed",
            AuditEventKind::RatelimitIp => "ratelimit.ip",
            AuditEventKind::RatelimitWallet => "ratelimit.wallet",
            AuditEventKind::PayerReservationFailed => "payer.reservation_failed",
            AuditEventKind::PayerBalanceLow => "payer.balance_low",
            AuditEventKind::PayerMarkedUnhealthy => "payer.marked_unhealthy",
            AuditEventKind::CircuitOpened => "circuit.opened",
            AuditEventKind::CircuitClosed => "circuit.closed",
        }
    }

    /// Security-tagged kinds are the ones spec §7 says feed the anomaly
    /// counters under the subject wallet, beyond just being logged at WARN.
    pub fn is_security(&self) -> bool {
        self.as_str().starts_with("security.")
    }
}

/// One audit record. `wallet`/`ip` are truncated to their first 12 characters
/// before they're ever stored (spec §4.10: "truncated ... for privacy") —
/// callers must pass already-truncated values in via [`truncate12`].
#[derive(Debug, Clone, Serialize)]
pub struct AuditEvent {
    pub kind: AuditEventKind,
    pub wallet: Option<String>,
    pub ip: Option<String>,
    pub detail: Option<String>,
    pub at: DateTime<Utc>,
}

impl AuditEvent {
    pub fn new(kind: AuditEventKind) -> Self {
        Self { kind, wallet: None, ip: None, detail: None, at: Utc::now() }
    }

    pub fn with_wallet(mut self, wallet: impl AsRef<str>) -> Self {
        self.wallet = Some(truncate12(wallet.as_ref()));
        self
    }

    pub fn with_ip(mut self, ip: impl AsRef<str>) -> Self {
        self.ip = Some(truncate12(ip.as_ref()));
        self
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }
}

/// First 12 characters of `s`, the privacy truncation spec §4.10 mandates
/// for any wallet/IP carried on an audit event.
pub fn truncate12(s: &str) -> String {
    s.chars().take(12).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncates_to_twelve_chars() {
        assert_eq!(truncate12("4Nd1m1dNpQwK8Mh5ZZZZZZZ"), "4Nd1m1dNpQwK");
    }

    #[test]
    fn shorter_strings_pass_through_unchanged() {
        assert_eq!(truncate12("short"), "short");
    }
}
