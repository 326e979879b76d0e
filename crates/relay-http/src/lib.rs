//! Thin HTTP framing layer over [`relay_core::RelayCore`] (spec §6). This
//! crate owns request/response JSON shapes, header propagation, and status
//! code mapping; it holds no business rules of its own — every decision
//! still lives in `relay-core` and the crates beneath it. Shaped after the
//! `axum` + `tower-http` server the wider example pack uses for its thin
//! framing layers, since the teacher's own `rpc` crate speaks `jsonrpsee`
//! rather than a JSON-over-HTTP surface like this one.

mod compat;
mod error;
mod handlers;
mod middleware;

use std::{sync::Arc, time::Duration};

use axum::{
    routing::{get, post},
    Router,
};
use relay_core::RelayCore;
use tower_http::cors::{AllowOrigin, CorsLayer};

pub use error::ApiError;

/// Shared state handed to every handler; `RelayCore` is already cheap to
/// clone so this is just a thin wrapper for axum's extractor ergonomics.
#[derive(Clone)]
pub struct AppState {
    pub core: Arc<RelayCore>,
}

/// Builds the full router: the versioned `/v1/*` surface plus unversioned
/// aliases that answer the same handlers but add the `Deprecation`/`Sunset`
/// headers spec §6 requires during the migration window.
pub fn build_router(core: RelayCore) -> Router {
    let state = AppState { core: Arc::new(core) };
    let allowed_origins = state.core.config().allowed_origins.clone();

    let cors = if allowed_origins.is_empty() {
        CorsLayer::new().allow_origin(AllowOrigin::any())
    } else {
        let origins: Vec<_> = allowed_origins.iter().filter_map(|o| o.parse().ok()).collect();
        CorsLayer::new().allow_origin(origins)
    }
    .allow_methods(tower_http::cors::Any)
    .allow_headers(tower_http::cors::Any);

    let versioned = Router::new()
        .route("/v1/quote", post(handlers::quote::post_quote))
        .route("/v1/submit", post(handlers::submit::post_submit))
        .route("/v1/tokens", get(handlers::tokens::get_tokens))
        .route("/v1/tokens/:mint/check", get(handlers::tokens::get_token_check))
        .route("/v1/stats", get(handlers::stats::get_stats))
        .route("/v1/health", get(handlers::health::get_health));

    Router::new()
        .merge(versioned)
        .merge(compat::unversioned_aliases())
        .layer(axum::middleware::from_fn(middleware::request_id))
        .layer(cors)
        .with_state(state)
}

/// `Sunset` timestamp for unversioned-path compatibility, a fixed date far
/// enough out that it's a real deadline rather than a decorative header.
pub(crate) const SUNSET_DURATION: Duration = Duration::from_secs(180 * 24 * 60 * 60);
