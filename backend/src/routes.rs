use axum::{
    http::Method,
    middleware as axum_middleware,
    routing::{get, post, put},
    Router,
};
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::{docs::ApiDoc, handlers, middleware, state::AppState};

/// Full HTTP surface with shared layers applied.
pub fn build_router(state: AppState) -> Router {
    let request_routes = Router::new()
        .route("/api/requests", post(handlers::requests::submit_request))
        .route(
            "/api/requests/student/{email}",
            get(handlers::requests::list_student_requests),
        )
        .route(
            "/api/requests/staff",
            get(handlers::requests::list_staff_queue),
        )
        .route("/api/requests/hod", get(handlers::requests::list_hod_queue))
        .route(
            "/api/requests/all",
            get(handlers::requests::list_all_requests),
        )
        .route(
            "/api/requests/{id}",
            get(handlers::requests::get_request)
                .put(handlers::requests::edit_request)
                .delete(handlers::requests::delete_request),
        )
        .route(
            "/api/requests/{id}/staff-status",
            put(handlers::requests::update_staff_status),
        )
        .route(
            "/api/requests/{id}/hod-status",
            put(handlers::requests::update_hod_status),
        )
        .route(
            "/api/requests/{id}/download",
            get(handlers::documents::download_document),
        );

    let public_routes = Router::new()
        .route("/api/verify", get(handlers::documents::verify_without_id))
        .route("/api/verify/", get(handlers::documents::verify_without_id))
        .route(
            "/api/verify/{document_id}",
            get(handlers::documents::verify_document),
        )
        .route(
            "/api/notifications/devices",
            post(handlers::notifications::register_device),
        )
        .route("/api/health", get(handlers::health::health));

    Router::new()
        .merge(request_routes)
        .merge(public_routes)
        .merge(SwaggerUi::new("/swagger-ui").url("/api/docs/openapi.json", ApiDoc::openapi()))
        .layer(
            ServiceBuilder::new()
                .layer(axum_middleware::from_fn(middleware::request_id))
                .layer(TraceLayer::new_for_http())
                .layer(axum_middleware::from_fn(middleware::log_error_responses))
                .layer(
                    CorsLayer::new()
                        .allow_origin(Any)
                        .allow_methods([
                            Method::GET,
                            Method::POST,
                            Method::PUT,
                            Method::DELETE,
                            Method::OPTIONS,
                        ])
                        .allow_headers(Any)
                        .max_age(std::time::Duration::from_secs(24 * 60 * 60)),
                ),
        )
        .with_state(state)
}
