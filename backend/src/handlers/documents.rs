use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::{Html, IntoResponse, Response},
};

use crate::{error::AppError, handlers::response::parse_request_id, state::AppState};

/// Streams the authorization PDF for a request.
pub async fn download_document(
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
) -> Result<Response, AppError> {
    let id = parse_request_id(&raw_id)?;
    let download = state.engine.download(id).await?;
    let disposition = format!("attachment; filename=\"{}\"", download.filename);
    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "application/pdf".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        download.bytes,
    )
        .into_response())
}

/// Public page reached from the QR code. Always answers 200 with either the
/// confirmation or the generic invalid view.
pub async fn verify_document(
    State(state): State<AppState>,
    Path(document_id): Path<String>,
) -> Response {
    render_verification(&state, &document_id).await
}

/// `/api/verify` and `/api/verify/` carry no ID and get the invalid view.
pub async fn verify_without_id(State(state): State<AppState>) -> Response {
    render_verification(&state, "").await
}

async fn render_verification(state: &AppState, document_id: &str) -> Response {
    let view = state.verifier.verify(document_id).await;
    (
        [(header::CACHE_CONTROL, "no-store")],
        Html(view.render()),
    )
        .into_response()
}
