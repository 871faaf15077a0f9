#![allow(dead_code)] // OpenAPI doc stubs are only referenced by utoipa macros.

use crate::{
    error::ErrorResponse,
    handlers::requests::{AllRequestsQuery, HodQueueQuery, StaffQueueQuery},
    models::{
        request::{
            DocumentInfo, EditRequestPayload, HodDecisionPayload, StaffDecisionPayload,
            SubmitRequestPayload,
        },
        Decision, LeaveType, OverallStatus, RegisterDevicePayload, RejectedBy, RequestKindTag,
        RequestResponse, StageStatus,
    },
};
use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    paths(
        submit_request_doc,
        student_requests_doc,
        staff_queue_doc,
        hod_queue_doc,
        all_requests_doc,
        get_request_doc,
        edit_request_doc,
        delete_request_doc,
        staff_status_doc,
        hod_status_doc,
        download_doc,
        verify_doc,
        register_device_doc,
        health_doc
    ),
    components(
        schemas(
            SubmitRequestPayload,
            EditRequestPayload,
            StaffDecisionPayload,
            HodDecisionPayload,
            RequestResponse,
            DocumentInfo,
            RequestKindTag,
            LeaveType,
            StageStatus,
            OverallStatus,
            RejectedBy,
            Decision,
            RegisterDevicePayload,
            StaffQueueQuery,
            HodQueueQuery,
            AllRequestsQuery,
            ErrorResponse
        )
    ),
    tags(
        (name = "Requests", description = "Leave and On-Duty submissions and review"),
        (name = "Documents", description = "Authorization PDFs and public verification"),
        (name = "Notifications", description = "Push device registration"),
        (name = "System", description = "Liveness")
    )
)]
pub struct ApiDoc;

#[utoipa::path(
    post,
    path = "/api/requests",
    request_body = SubmitRequestPayload,
    responses(
        (status = 201, description = "Request created", body = RequestResponse),
        (status = 400, description = "Missing or invalid fields", body = ErrorResponse)
    ),
    tag = "Requests"
)]
fn submit_request_doc() {}

#[utoipa::path(
    get,
    path = "/api/requests/student/{email}",
    params(("email" = String, Path, description = "Student email")),
    responses((status = 200, description = "Requests of one student, newest first", body = [RequestResponse])),
    tag = "Requests"
)]
fn student_requests_doc() {}

#[utoipa::path(
    get,
    path = "/api/requests/staff",
    params(StaffQueueQuery),
    responses((status = 200, description = "Requests of a class", body = [RequestResponse])),
    tag = "Requests"
)]
fn staff_queue_doc() {}

#[utoipa::path(
    get,
    path = "/api/requests/hod",
    params(HodQueueQuery),
    responses((status = 200, description = "Forwarded requests awaiting the HOD", body = [RequestResponse])),
    tag = "Requests"
)]
fn hod_queue_doc() {}

#[utoipa::path(
    get,
    path = "/api/requests/all",
    params(AllRequestsQuery),
    responses(
        (status = 200, description = "Filtered listing", body = [RequestResponse]),
        (status = 400, description = "Unknown leave type", body = ErrorResponse)
    ),
    tag = "Requests"
)]
fn all_requests_doc() {}

#[utoipa::path(
    get,
    path = "/api/requests/{id}",
    params(("id" = String, Path, description = "Request ID")),
    responses(
        (status = 200, body = RequestResponse),
        (status = 404, body = ErrorResponse)
    ),
    tag = "Requests"
)]
fn get_request_doc() {}

#[utoipa::path(
    put,
    path = "/api/requests/{id}",
    params(("id" = String, Path, description = "Request ID")),
    request_body = EditRequestPayload,
    responses(
        (status = 200, body = RequestResponse),
        (status = 404, body = ErrorResponse),
        (status = 409, description = "Request already decided", body = ErrorResponse)
    ),
    tag = "Requests"
)]
fn edit_request_doc() {}

#[utoipa::path(
    delete,
    path = "/api/requests/{id}",
    params(("id" = String, Path, description = "Request ID")),
    responses(
        (status = 200, description = "Deleted"),
        (status = 404, body = ErrorResponse)
    ),
    tag = "Requests"
)]
fn delete_request_doc() {}

#[utoipa::path(
    put,
    path = "/api/requests/{id}/staff-status",
    params(("id" = String, Path, description = "Request ID")),
    request_body = StaffDecisionPayload,
    responses(
        (status = 200, body = RequestResponse),
        (status = 400, description = "Invalid decision", body = ErrorResponse),
        (status = 404, body = ErrorResponse),
        (status = 409, description = "Already reviewed or changed concurrently", body = ErrorResponse)
    ),
    tag = "Requests"
)]
fn staff_status_doc() {}

#[utoipa::path(
    put,
    path = "/api/requests/{id}/hod-status",
    params(("id" = String, Path, description = "Request ID")),
    request_body = HodDecisionPayload,
    responses(
        (status = 200, body = RequestResponse),
        (status = 400, description = "Invalid decision or staff has not approved", body = ErrorResponse),
        (status = 404, body = ErrorResponse),
        (status = 409, description = "Already decided or changed concurrently", body = ErrorResponse)
    ),
    tag = "Requests"
)]
fn hod_status_doc() {}

#[utoipa::path(
    get,
    path = "/api/requests/{id}/download",
    params(("id" = String, Path, description = "Request ID, wrapped forms like ObjectId(\"...\") accepted")),
    responses(
        (status = 200, description = "Authorization PDF", content_type = "application/pdf"),
        (status = 404, body = ErrorResponse)
    ),
    tag = "Documents"
)]
fn download_doc() {}

#[utoipa::path(
    get,
    path = "/api/verify/{document_id}",
    params(("document_id" = String, Path, description = "Document ID printed on the PDF")),
    responses((status = 200, description = "Verification page, valid or invalid", content_type = "text/html")),
    tag = "Documents"
)]
fn verify_doc() {}

#[utoipa::path(
    post,
    path = "/api/notifications/devices",
    request_body = RegisterDevicePayload,
    responses(
        (status = 200, description = "Token stored"),
        (status = 404, description = "Unknown email", body = ErrorResponse)
    ),
    tag = "Notifications"
)]
fn register_device_doc() {}

#[utoipa::path(
    get,
    path = "/api/health",
    responses((status = 200, description = "Service is up")),
    tag = "System"
)]
fn health_doc() {}
