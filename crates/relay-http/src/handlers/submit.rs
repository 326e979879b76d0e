use std::{net::SocketAddr, str::FromStr};

use axum::{
    extract::{ConnectInfo, Extension, State},
    Json,
};
use base64::Engine;
use relay_core::SubmitRequest;
use relay_types::{QuoteId, RelayError};
use serde::{Deserialize, Serialize};
use solana_sdk::pubkey::Pubkey;

use crate::{middleware::RequestId, ApiError, AppState};

/// `POST /v1/submit` request body (spec §6): `transaction` is base64-encoded
/// wire bytes of the user's partially-signed transaction.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitBody {
    pub quote_id: String,
    pub transaction: String,
    pub user_pubkey: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitView {
    pub signature: String,
    pub status: &'static str,
    pub attempts: u32,
    pub explorer: String,
}

pub async fn post_submit(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    Json(body): Json<SubmitBody>,
) -> Result<Json<SubmitView>, ApiError> {
    let err = |e: RelayError| ApiError::new(e, Some(request_id.clone()));

    let quote_id = QuoteId::from_str(&body.quote_id).map_err(|_| err(RelayError::QuoteNotFound))?;
    let claimed_user_key =
        Pubkey::from_str(&body.user_pubkey).map_err(|_| err(RelayError::ValidationFailed(vec!["invalid userPubkey".to_string()])))?;
    let tx_bytes = base64::engine::general_purpose::STANDARD
        .decode(&body.transaction)
        .map_err(|_| err(RelayError::InvalidTxFormat))?;

    let outcome = state
        .core
        .submit(SubmitRequest { quote_id, claimed_user_key, tx_bytes, ip: addr.ip() })
        .await
        .map_err(|e| err(e))?;

    Ok(Json(SubmitView {
        signature: outcome.signature.to_string(),
        status: "submitted",
        attempts: outcome.attempts,
        explorer: outcome.explorer_url,
    }))
}
