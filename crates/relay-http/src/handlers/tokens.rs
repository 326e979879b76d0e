use std::str::FromStr;

use axum::{
    extract::{Extension, Path, State},
    Json,
};
use oracle_gateway::TokenInfo;
use relay_types::RelayError;
use serde::Serialize;
use solana_sdk::pubkey::Pubkey;

use crate::{middleware::RequestId, ApiError, AppState};

#[derive(Debug, Serialize)]
pub struct TokensView {
    pub tokens: Vec<TokenInfo>,
}

pub async fn get_tokens(State(state): State<AppState>, Extension(request_id): Extension<RequestId>) -> Result<Json<TokensView>, ApiError> {
    let tokens = state.core.oracle().list_accepted_tokens().await.map_err(|e| ApiError::new(e, Some(request_id)))?;
    Ok(Json(TokensView { tokens }))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenCheckView {
    pub mint: String,
    pub accepted: bool,
    pub reason: Option<&'static str>,
}

pub async fn get_token_check(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    Path(mint): Path<String>,
) -> Result<Json<TokenCheckView>, ApiError> {
    let mint_key = Pubkey::from_str(&mint)
        .map_err(|_| ApiError::new(RelayError::InvalidMint, Some(request_id.clone())))?;

    let accepted = state.core.oracle().is_token_accepted(&mint_key).await.map_err(|e| ApiError::new(e, Some(request_id)))?;

    Ok(Json(TokenCheckView {
        mint,
        accepted,
        reason: if accepted { None } else { Some("mint not on the accepted-token list") },
    }))
}
