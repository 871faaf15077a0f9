use axum::{
    extract::Request,
    http::{header::HeaderName, HeaderValue},
    middleware::Next,
    response::Response,
};
use tracing::Instrument;
use uuid::Uuid;

const REQUEST_ID_HEADER: &str = "x-request-id";
const CORRELATION_ID_HEADER: &str = "x-correlation-id";
const MAX_INBOUND_ID_LEN: usize = 128;

/// Correlation ID of the HTTP exchange, available as a request extension.
#[derive(Clone, Debug)]
pub struct CorrelationId(pub String);

fn inbound_id(req: &Request) -> Option<String> {
    req.headers()
        .get(HeaderName::from_static(REQUEST_ID_HEADER))
        .or_else(|| req.headers().get(HeaderName::from_static(CORRELATION_ID_HEADER)))
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty() && v.len() <= MAX_INBOUND_ID_LEN)
        .map(str::to_string)
}

/// Propagates `x-request-id` (or `x-correlation-id`) and runs the rest of the
/// stack inside a span carrying it.
pub async fn request_id(mut req: Request, next: Next) -> Response {
    let id = inbound_id(&req).unwrap_or_else(|| Uuid::new_v4().to_string());
    req.extensions_mut().insert(CorrelationId(id.clone()));

    let span = tracing::info_span!(
        "http_request",
        request_id = %id,
        method = %req.method(),
        path = %req.uri().path(),
    );
    let mut response = next.run(req).instrument(span).await;

    if let Ok(value) = HeaderValue::from_str(&id) {
        response
            .headers_mut()
            .insert(HeaderName::from_static(REQUEST_ID_HEADER), value);
    }
    response
}
