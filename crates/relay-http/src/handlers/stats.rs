use axum::{extract::State, Json};
use serde::Serialize;

use crate::AppState;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TreasuryView {
    pub address: String,
    pub balance_lamports: Option<u64>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsView {
    pub total_burned: u64,
    pub total_transactions: u64,
    pub treasury: TreasuryView,
}

/// `GET /v1/stats` (spec §6). The treasury balance lookup is best-effort:
/// an RPC hiccup here shouldn't turn an otherwise-healthy stats page into a
/// 500, so a failed lookup just omits `balanceLamports`.
pub async fn get_stats(State(state): State<AppState>) -> Json<StatsView> {
    let snapshot = state.core.stats_snapshot();
    let treasury = state.core.treasury();
    let balance_lamports = state.core.chain().batch_balances(&[treasury]).await.ok().and_then(|v| v.first().map(|(_, bal)| *bal));

    Json(StatsView {
        total_burned: snapshot.total_burned_lamports,
        total_transactions: snapshot.total_transactions,
        treasury: TreasuryView { address: treasury.to_string(), balance_lamports },
    })
}
