use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use utoipa::{IntoParams, ToSchema};

use crate::{
    error::AppError,
    handlers::response::{parse_request_id, ApiResponse},
    models::{
        request::{
            EditRequestPayload, HodDecisionPayload, StaffDecisionPayload, SubmitRequestPayload,
        },
        AbsenceRequest, LeaveType, OverallStatus, RequestKindTag, RequestResponse, StageStatus,
    },
    repositories::RequestFilter,
    state::AppState,
};

#[derive(Debug, Deserialize, IntoParams, ToSchema)]
#[into_params(parameter_in = Query)]
pub struct StaffQueueQuery {
    pub department: Option<String>,
    pub year: Option<String>,
    pub section: Option<String>,
    pub kind: Option<RequestKindTag>,
}

#[derive(Debug, Deserialize, IntoParams, ToSchema)]
#[into_params(parameter_in = Query)]
pub struct HodQueueQuery {
    pub department: Option<String>,
    pub kind: Option<RequestKindTag>,
}

#[derive(Debug, Deserialize, IntoParams, ToSchema)]
#[into_params(parameter_in = Query)]
pub struct AllRequestsQuery {
    pub department: Option<String>,
    pub year: Option<String>,
    pub section: Option<String>,
    pub status: Option<OverallStatus>,
    pub kind: Option<RequestKindTag>,
    /// Storage or display name, e.g. `sick` or `Sick Leave`.
    pub leave_type: Option<String>,
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

fn responses(requests: Vec<AbsenceRequest>) -> ApiResponse<Vec<RequestResponse>> {
    ApiResponse::list(requests.into_iter().map(RequestResponse::from).collect())
}

pub async fn submit_request(
    State(state): State<AppState>,
    payload: Result<Json<SubmitRequestPayload>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Json(payload) = payload?;
    let created = state.engine.submit(payload).await?;
    let body = ApiResponse::with_message(
        format!("{} request submitted", created.kind_tag().label()),
        RequestResponse::from(created),
    );
    Ok((StatusCode::CREATED, Json(body)))
}

pub async fn list_student_requests(
    State(state): State<AppState>,
    Path(email): Path<String>,
) -> Result<ApiResponse<Vec<RequestResponse>>, AppError> {
    let filter = RequestFilter {
        student_email: Some(email.trim().to_lowercase()),
        ..Default::default()
    };
    Ok(responses(state.engine.list(&filter).await?))
}

pub async fn list_staff_queue(
    State(state): State<AppState>,
    Query(query): Query<StaffQueueQuery>,
) -> Result<ApiResponse<Vec<RequestResponse>>, AppError> {
    let filter = RequestFilter {
        kind: query.kind,
        department: non_empty(query.department),
        year: non_empty(query.year),
        section: non_empty(query.section),
        ..Default::default()
    };
    Ok(responses(state.engine.list(&filter).await?))
}

/// Requests forwarded by staff and waiting for the HOD.
pub async fn list_hod_queue(
    State(state): State<AppState>,
    Query(query): Query<HodQueueQuery>,
) -> Result<ApiResponse<Vec<RequestResponse>>, AppError> {
    let filter = RequestFilter {
        kind: query.kind,
        department: non_empty(query.department),
        staff_status: Some(StageStatus::Approved),
        hod_status: Some(StageStatus::Pending),
        ..Default::default()
    };
    Ok(responses(state.engine.list(&filter).await?))
}

pub async fn list_all_requests(
    State(state): State<AppState>,
    Query(query): Query<AllRequestsQuery>,
) -> Result<ApiResponse<Vec<RequestResponse>>, AppError> {
    let leave_type = non_empty(query.leave_type)
        .map(|raw| raw.parse::<LeaveType>())
        .transpose()
        .map_err(AppError::validation)?;
    let filter = RequestFilter {
        kind: query.kind,
        department: non_empty(query.department),
        year: non_empty(query.year),
        section: non_empty(query.section),
        status: query.status,
        leave_type,
        ..Default::default()
    };
    Ok(responses(state.engine.list(&filter).await?))
}

pub async fn get_request(
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
) -> Result<ApiResponse<RequestResponse>, AppError> {
    let id = parse_request_id(&raw_id)?;
    let request = state.engine.get(id).await?;
    Ok(ApiResponse::ok(request.into()))
}

pub async fn edit_request(
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
    payload: Result<Json<EditRequestPayload>, JsonRejection>,
) -> Result<ApiResponse<RequestResponse>, AppError> {
    let id = parse_request_id(&raw_id)?;
    let Json(payload) = payload?;
    let updated = state.engine.edit(id, payload).await?;
    Ok(ApiResponse::with_message("Request updated", updated.into()))
}

pub async fn delete_request(
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
) -> Result<ApiResponse<serde_json::Value>, AppError> {
    let id = parse_request_id(&raw_id)?;
    state.engine.delete(id).await?;
    Ok(ApiResponse::with_message(
        "Request deleted",
        serde_json::json!({ "id": id }),
    ))
}

pub async fn update_staff_status(
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
    payload: Result<Json<StaffDecisionPayload>, JsonRejection>,
) -> Result<ApiResponse<RequestResponse>, AppError> {
    let id = parse_request_id(&raw_id)?;
    let Json(payload) = payload?;
    let updated = state.engine.staff_decision(id, payload).await?;
    let message = match updated.status {
        OverallStatus::Rejected => "Request rejected by staff",
        _ => "Request forwarded to HOD",
    };
    Ok(ApiResponse::with_message(message, updated.into()))
}

pub async fn update_hod_status(
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
    payload: Result<Json<HodDecisionPayload>, JsonRejection>,
) -> Result<ApiResponse<RequestResponse>, AppError> {
    let id = parse_request_id(&raw_id)?;
    let Json(payload) = payload?;
    let updated = state.engine.hod_decision(id, payload).await?;
    let message = match (updated.status, updated.document.is_some()) {
        (OverallStatus::Accepted, true) => "Request accepted and document issued",
        (OverallStatus::Accepted, false) => {
            "Request accepted; the document will be generated on first download"
        }
        _ => "Request rejected by HOD",
    };
    Ok(ApiResponse::with_message(message, updated.into()))
}
