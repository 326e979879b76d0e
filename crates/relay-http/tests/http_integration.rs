//! End-to-end exercise of the router spec §6 describes: a real `axum::Router`
//! built by `build_router`, driven with `tower::ServiceExt::oneshot` against
//! fakes from `relay-testkit`, the same harness shape the teacher's `rpc`
//! crate integration tests drive its `jsonrpsee` server with.

use std::sync::Arc;

use audit_log::{AuditLog, TracingAuditSink};
use axum::{
    extract::connect_info::ConnectInfo,
    http::{Request, StatusCode},
};
use chrono::Utc;
use fee_payer_pool::{BalanceSnapshot, Keyring, Pool, PoolConfig};
use http_body_util::BodyExt;
use quote_store::InMemoryQuoteStore;
use rate_anomaly::RateAnomalyLayer;
use relay_core::RelayCore;
use relay_testkit::{build_fee_transfer_tx, FakeChainAdapter, FakeOracleGateway};
use relay_types::{
    config::{AnomalyConfig, Network, RateLimitConfig},
    RelayConfig,
};
use serde_json::{json, Value};
use solana_sdk::{
    hash::Hash,
    signature::{Keypair, Signer},
};
use tower::ServiceExt;

fn test_config() -> RelayConfig {
    RelayConfig {
        fee_payer_private_keys: vec![],
        treasury_address: solana_sdk::pubkey::Pubkey::new_unique(),
        rpc_urls: vec!["http://localhost".to_string()],
        store_url: None,
        oracle_url: "http://localhost".to_string(),
        network: Network::Devnet,
        base_fee_lamports: 5_000,
        network_fee_lamports: 5_000,
        quote_ttl: std::time::Duration::from_secs(60),
        reservation_ttl: std::time::Duration::from_millis(90_000),
        min_healthy_balance_lamports: 50_000_000,
        max_reservations_per_payer: 50,
        rate_limits: RateLimitConfig::default(),
        anomaly: AnomalyConfig::default(),
        allowed_origins: vec![],
        metrics_api_key: None,
    }
}

struct Harness {
    router: axum::Router,
    treasury: solana_sdk::pubkey::Pubkey,
    mint: solana_sdk::pubkey::Pubkey,
    fee_payer: solana_sdk::pubkey::Pubkey,
    user: Keypair,
}

fn build_harness() -> Harness {
    let keypair = Keypair::new();
    let fee_payer = keypair.pubkey();
    let keyring = Keyring::from_keypairs(vec![keypair]);
    let pool = Arc::new(Pool::new(keyring, PoolConfig::default()));
    let mut balances = BalanceSnapshot::new();
    balances.insert(fee_payer, 1_000_000_000);
    pool.apply_balance_snapshot(balances, true, Utc::now());

    let treasury = solana_sdk::pubkey::Pubkey::new_unique();
    let mint = solana_sdk::pubkey::Pubkey::new_unique();
    let user = Keypair::new();

    let core = RelayCore::new(
        Arc::new(test_config()),
        pool,
        Arc::new(InMemoryQuoteStore::default()),
        Arc::new(replay_set::ReplaySet::default()),
        Arc::new(replay_set::InFlightSet::default()),
        Arc::new(FakeChainAdapter::default()),
        Arc::new(FakeOracleGateway::accepting(mint)),
        Arc::new(RateAnomalyLayer::new(RateLimitConfig::default(), AnomalyConfig::default())),
        AuditLog::new(Arc::new(TracingAuditSink)),
        treasury,
    );

    Harness { router: relay_http::build_router(core), treasury, mint, fee_payer, user }
}

async fn json_body(response: axum::response::Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

/// `ConnectInfo` is normally populated by `into_make_service_with_connect_info`
/// on accept; a bare `oneshot` call needs it inserted by hand.
fn test_addr() -> ConnectInfo<std::net::SocketAddr> {
    ConnectInfo(std::net::SocketAddr::from(([203, 0, 113, 7], 54321)))
}

#[tokio::test]
async fn quote_then_submit_round_trip_succeeds() {
    let h = build_harness();

    let quote_req = Request::builder()
        .method("POST")
        .uri("/v1/quote")
        .header("content-type", "application/json")
        .extension(test_addr())
        .body(axum::body::Body::from(
            json!({"userPubkey": h.user.pubkey().to_string(), "paymentToken": h.mint.to_string()}).to_string(),
        ))
        .unwrap();

    let quote_response = h.router.clone().oneshot(quote_req).await.unwrap();
    assert_eq!(quote_response.status(), StatusCode::OK);
    assert!(quote_response.headers().contains_key("x-request-id"));
    let quote_body = json_body(quote_response).await;

    let quote_id = quote_body["quoteId"].as_str().unwrap().to_string();
    let fee_amount: u64 = quote_body["feeAmount"].as_str().unwrap().parse().unwrap();
    assert_eq!(quote_body["feePayer"].as_str().unwrap(), h.fee_payer.to_string());

    let tx_bytes = build_fee_transfer_tx(&h.fee_payer, &h.user, &h.treasury, &h.mint, fee_amount, Hash::new_from_array([1u8; 32]));
    let tx_b64 = base64::Engine::encode(&base64::engine::general_purpose::STANDARD, tx_bytes);

    let submit_req = Request::builder()
        .method("POST")
        .uri("/v1/submit")
        .header("content-type", "application/json")
        .extension(test_addr())
        .body(axum::body::Body::from(
            json!({"quoteId": quote_id, "transaction": tx_b64, "userPubkey": h.user.pubkey().to_string()}).to_string(),
        ))
        .unwrap();

    let submit_response = h.router.clone().oneshot(submit_req).await.unwrap();
    assert_eq!(submit_response.status(), StatusCode::OK);
    let submit_body = json_body(submit_response).await;
    assert_eq!(submit_body["status"].as_str().unwrap(), "submitted");
    assert_eq!(submit_body["attempts"].as_u64().unwrap(), 1);
}

#[tokio::test]
async fn submit_with_unknown_quote_id_returns_quote_not_found() {
    let h = build_harness();

    let tx_bytes = build_fee_transfer_tx(&h.fee_payer, &h.user, &h.treasury, &h.mint, 1_000, Hash::new_from_array([2u8; 32]));
    let tx_b64 = base64::Engine::encode(&base64::engine::general_purpose::STANDARD, tx_bytes);

    let req = Request::builder()
        .method("POST")
        .uri("/v1/submit")
        .header("content-type", "application/json")
        .extension(test_addr())
        .body(axum::body::Body::from(
            json!({"quoteId": uuid::Uuid::new_v4().to_string(), "transaction": tx_b64, "userPubkey": h.user.pubkey().to_string()}).to_string(),
        ))
        .unwrap();

    let response = h.router.oneshot(req).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = json_body(response).await;
    assert_eq!(body["code"].as_str().unwrap(), "QUOTE_NOT_FOUND");
    assert!(body["requestId"].is_string());
}

#[tokio::test]
async fn quote_for_unaccepted_token_is_rejected() {
    let h = build_harness();
    let other_mint = solana_sdk::pubkey::Pubkey::new_unique();

    let req = Request::builder()
        .method("POST")
        .uri("/v1/quote")
        .header("content-type", "application/json")
        .extension(test_addr())
        .body(axum::body::Body::from(json!({"userPubkey": h.user.pubkey().to_string(), "paymentToken": other_mint.to_string()}).to_string()))
        .unwrap();

    let response = h.router.oneshot(req).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = json_body(response).await;
    assert_eq!(body["code"].as_str().unwrap(), "TOKEN_NOT_ACCEPTED");
}

#[tokio::test]
async fn unversioned_quote_alias_carries_deprecation_headers() {
    let h = build_harness();

    let req = Request::builder()
        .method("POST")
        .uri("/quote")
        .header("content-type", "application/json")
        .extension(test_addr())
        .body(axum::body::Body::from(json!({"userPubkey": h.user.pubkey().to_string(), "paymentToken": h.mint.to_string()}).to_string()))
        .unwrap();

    let response = h.router.oneshot(req).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers().get("deprecation").unwrap(), "true");
    assert!(response.headers().contains_key("sunset"));
}

#[tokio::test]
async fn health_reports_ok_with_a_funded_payer() {
    let h = build_harness();
    let req = Request::builder().method("GET").uri("/v1/health").body(axum::body::Body::empty()).unwrap();
    let response = h.router.oneshot(req).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["status"].as_str().unwrap(), "ok");
}
