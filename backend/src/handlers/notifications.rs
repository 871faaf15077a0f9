use axum::{extract::rejection::JsonRejection, extract::State, Json};
use validator::Validate;

use crate::{
    error::AppError, handlers::response::ApiResponse, models::RegisterDevicePayload,
    state::AppState,
};

/// Stores the push token of a user's current device.
pub async fn register_device(
    State(state): State<AppState>,
    payload: Result<Json<RegisterDevicePayload>, JsonRejection>,
) -> Result<ApiResponse<serde_json::Value>, AppError> {
    let Json(payload) = payload?;
    payload.validate()?;

    let email = payload.email.trim().to_lowercase();
    if !state
        .notifier
        .register_device(&email, payload.token.trim())
        .await?
    {
        return Err(AppError::NotFound(format!("No user registered with {email}")));
    }
    tracing::info!(email = %email, "device token registered");
    Ok(ApiResponse::with_message(
        "Device registered",
        serde_json::json!({ "email": email }),
    ))
}
