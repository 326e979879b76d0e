use async_trait::async_trait;

use crate::event::AuditEvent;

/// The persistent event log spec §1 names as an external collaborator: this
/// crate owns batching/flushing; writing the batch somewhere durable is the
/// sink's job, which `relay-http`/the binary plug in at wiring time.
#[async_trait]
pub trait AuditSink: Send + Sync {
    async fn write(&self, events: Vec<AuditEvent>);
}

/// Fallback sink: logs each event through `tracing` and drops it. Used when
/// no external event sink is configured, and by tests.
#[derive(Default)]
pub struct TracingAuditSink;

#[async_trait]
impl AuditSink for TracingAuditSink {
    async fn write(&self, events: Vec<AuditEvent>) {
        for event in events {
            tracing::info!(
                kind = event.kind.as_str(),
                wallet = event.wallet.as_deref(),
                ip = event.ip.as_deref(),
                detail = event.detail.as_deref(),
                "audit event flushed"
            );
        }
    }
}
