//! Unversioned path aliases kept for backward compatibility (spec §6):
//! same handlers as `/v1/*`, but every response on this branch also carries
//! `Deprecation: true` and a `Sunset` date.

use axum::{
    http::HeaderValue,
    middleware::{self, Next},
    response::Response,
    routing::{get, post},
    Router,
};

use crate::{handlers, AppState, SUNSET_DURATION};

async fn mark_deprecated(req: axum::extract::Request, next: Next) -> Response {
    let mut response = next.run(req).await;
    response.headers_mut().insert("deprecation", HeaderValue::from_static("true"));
    let sunset = chrono::Utc::now() + chrono::Duration::from_std(SUNSET_DURATION).unwrap_or(chrono::Duration::days(180));
    if let Ok(value) = HeaderValue::from_str(&sunset.to_rfc2822()) {
        response.headers_mut().insert("sunset", value);
    }
    response
}

pub fn unversioned_aliases() -> Router<AppState> {
    Router::new()
        .route("/quote", post(handlers::quote::post_quote))
        .route("/submit", post(handlers::submit::post_submit))
        .route("/tokens", get(handlers::tokens::get_tokens))
        .route("/tokens/:mint/check", get(handlers::tokens::get_token_check))
        .route("/stats", get(handlers::stats::get_stats))
        .route("/health", get(handlers::health::get_health))
        .layer(middleware::from_fn(mark_deprecated))
}
