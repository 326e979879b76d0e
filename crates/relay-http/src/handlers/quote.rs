use std::{net::SocketAddr, str::FromStr};

use axum::{
    extract::{ConnectInfo, Extension, State},
    Json,
};
use relay_core::QuoteRequest;
use relay_types::RelayError;
use serde::{Deserialize, Serialize};
use solana_sdk::pubkey::Pubkey;

use crate::{middleware::RequestId, ApiError, AppState};

/// `POST /v1/quote` request body (spec §6).
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuoteBody {
    pub user_pubkey: String,
    pub payment_token: String,
    pub estimated_compute_units: Option<u32>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentTokenView {
    pub mint: String,
    pub amount: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HolderTierView {
    pub name: String,
    pub discount: f64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuoteView {
    pub quote_id: String,
    pub fee_payer: String,
    pub fee_amount: String,
    pub fee_amount_formatted: String,
    pub payment_token: PaymentTokenView,
    pub holder_tier: HolderTierView,
    pub expires_at: chrono::DateTime<chrono::Utc>,
    pub ttl: i64,
}

pub async fn post_quote(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    Json(body): Json<QuoteBody>,
) -> Result<Json<QuoteView>, ApiError> {
    let err = |e: RelayError| ApiError::new(e, Some(request_id.clone()));

    let user_key = Pubkey::from_str(&body.user_pubkey).map_err(|_| err(RelayError::ValidationFailed(vec!["invalid userPubkey".to_string()])))?;
    let payment_mint =
        Pubkey::from_str(&body.payment_token).map_err(|_| err(RelayError::ValidationFailed(vec!["invalid paymentToken mint".to_string()])))?;

    let quote = state
        .core
        .quote(QuoteRequest { user_key, ip: addr.ip(), payment_mint, cu_estimate: body.estimated_compute_units })
        .await
        .map_err(|e| err(e))?;

    Ok(Json(QuoteView {
        quote_id: quote.id.to_string(),
        fee_payer: quote.fee_payer_key.to_string(),
        fee_amount: quote.fee_amount_native.to_string(),
        fee_amount_formatted: quote.fee_amount_payment_token.to_string(),
        payment_token: PaymentTokenView { mint: quote.payment_mint.to_string(), amount: quote.fee_amount_payment_token.to_string() },
        holder_tier: HolderTierView { name: quote.holder_tier.name.clone(), discount: quote.holder_tier.discount },
        expires_at: quote.expires_at,
        ttl: quote.ttl_seconds(),
    }))
}
