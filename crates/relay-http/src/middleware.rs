use axum::{extract::Request, http::HeaderValue, middleware::Next, response::Response};

/// Per-request identifier, generated unless the caller already supplied one
/// (spec §6: "every inbound response carries `X-Request-Id`").
#[derive(Debug, Clone)]
pub struct RequestId(pub String);

const REQUEST_ID_HEADER: &str = "x-request-id";
const CORRELATION_ID_HEADER: &str = "x-correlation-id";

/// Stamps every request with a `RequestId` extension and every response
/// with `X-Request-Id` / `X-Correlation-Id` (spec §6's request tracing
/// contract). A caller-supplied `X-Request-Id` is honored rather than
/// overwritten, so a gateway in front of this service can thread its own id
/// through.
pub async fn request_id(mut req: Request, next: Next) -> Response {
    let incoming = req
        .headers()
        .get(REQUEST_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

    req.extensions_mut().insert(RequestId(incoming.clone()));

    let mut response = next.run(req).await;

    if let Ok(value) = HeaderValue::from_str(&incoming) {
        response.headers_mut().insert(REQUEST_ID_HEADER, value.clone());
        response.headers_mut().insert(CORRELATION_ID_HEADER, value);
    }

    response
}
