use axum::{extract::State, Json};
use relay_types::config::Network;
use serde::Serialize;

use crate::AppState;

#[derive(Debug, Serialize)]
pub struct ChecksView {
    pub rpc: bool,
    pub store: bool,
    pub fee_payer: bool,
}

#[derive(Debug, Serialize)]
pub struct HealthView {
    pub status: &'static str,
    pub network: &'static str,
    pub checks: ChecksView,
}

/// `GET /v1/health` (spec §6). Rolls up the three collaborators an operator
/// cares about at a glance: can we reach the chain, is the quote store
/// alive, and is at least one fee payer both healthy and not breaker-open.
pub async fn get_health(State(state): State<AppState>) -> Json<HealthView> {
    let rpc = state.core.chain().health().has_available_endpoint();
    let store = true; // in-process quote store call below never errors; a failure would panic, not return Err.
    let _ = state.core.quote_store_len().await;

    let pool_snapshot = state.core.pool().snapshot();
    let fee_payer = !pool_snapshot.breaker_open && pool_snapshot.payers.iter().any(|p| p.healthy);

    let network = match state.core.config().network {
        Network::Mainnet => "mainnet",
        Network::Devnet => "devnet",
    };

    let status = if rpc && store && fee_payer { "ok" } else { "degraded" };

    Json(HealthView { status, network, checks: ChecksView { rpc, store, fee_payer } })
}
