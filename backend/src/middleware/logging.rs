use axum::{
    body::{to_bytes, Body},
    http::{header::CONTENT_TYPE, Request},
    middleware::Next,
    response::Response,
};
use std::time::Instant;

use crate::middleware::request_id::CorrelationId;

const MAX_BUFFERED_BODY_BYTES: usize = 64 * 1024;
const MAX_LOGGED_BODY_BYTES: usize = 2048;

/// Logs every 4xx/5xx answer. JSON error bodies are buffered so the error
/// code shows up in the log line; other bodies (HTML, PDF) pass untouched.
pub async fn log_error_responses(req: Request<Body>, next: Next) -> Response {
    let method = req.method().to_string();
    let uri = req.uri().to_string();
    let request_id = req
        .extensions()
        .get::<CorrelationId>()
        .map(|id| id.0.clone())
        .unwrap_or_default();
    let start = Instant::now();

    let response = next.run(req).await;
    let status = response.status();
    if !(status.is_client_error() || status.is_server_error()) {
        return response;
    }
    let latency_ms = start.elapsed().as_millis() as u64;

    let is_json = response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.starts_with("application/json"));
    if !is_json {
        log_error_event(status.as_u16(), &method, &uri, &request_id, latency_ms, "");
        return response;
    }

    let (parts, body) = response.into_parts();
    match to_bytes(body, MAX_BUFFERED_BODY_BYTES).await {
        Ok(bytes) => {
            let end = bytes.len().min(MAX_LOGGED_BODY_BYTES);
            let preview = String::from_utf8_lossy(&bytes[..end]);
            log_error_event(status.as_u16(), &method, &uri, &request_id, latency_ms, &preview);
            Response::from_parts(parts, Body::from(bytes))
        }
        Err(err) => {
            tracing::warn!(status = status.as_u16(), %method, %uri, %request_id, error = ?err, "failed to read error response body");
            let mut parts = parts;
            parts.headers.remove(axum::http::header::CONTENT_LENGTH);
            Response::from_parts(parts, Body::empty())
        }
    }
}

fn log_error_event(
    status: u16,
    method: &str,
    uri: &str,
    request_id: &str,
    latency_ms: u64,
    body_preview: &str,
) {
    if status >= 500 {
        tracing::error!(
            status,
            method,
            uri,
            request_id,
            latency_ms,
            body = body_preview,
            "request completed with error status"
        );
    } else {
        tracing::warn!(
            status,
            method,
            uri,
            request_id,
            latency_ms,
            body = body_preview,
            "request completed with error status"
        );
    }
}
