//! Router construction.

use axum::extract::DefaultBodyLimit;
use axum::{
    middleware as axum_mw,
    routing::{delete, get, post, put},
    Extension, Router,
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::middleware::jwt::{jwt_auth, JwtConfig};
use crate::state::SharedState;
use crate::storage::{MAX_IMAGE_BYTES, MAX_PARTS_PER_REQUEST};

/// Build the full axum router with all routes and middleware.
pub fn build_router(state: SharedState, jwt_config: JwtConfig) -> Router {
    // Routes that require JWT authentication
    let protected = Router::new()
        .route(
            "/inspections/section-answers",
            post(handlers::answers::write_section),
        )
        .route(
            "/inspections/:id/signature-image",
            post(handlers::answers::signature_image),
        )
        .route(
            "/inspections/:id/question-images",
            post(handlers::images::upload_base64).get(handlers::images::list_question_images),
        )
        .route(
            "/inspections/:id/upload-images",
            post(handlers::images::upload_multipart),
        )
        .route(
            "/inspections/:id/image-gallery",
            get(handlers::images::image_gallery),
        )
        .route(
            "/inspections/:id/question-images/:imageId",
            delete(handlers::images::delete_question_image),
        )
        .route(
            "/inspections/by-schedule-type/:scheduleType",
            get(handlers::inspections::by_schedule_type),
        )
        .route("/inspections", get(handlers::inspections::list))
        .route(
            "/inspections/:id",
            get(handlers::inspections::get).delete(handlers::inspections::delete),
        )
        .route(
            "/inspections/:id/assign",
            put(handlers::inspections::assign),
        )
        .route(
            "/documents/answers/:answerId/docx",
            get(handlers::documents::answer_docx),
        )
        .layer(axum_mw::from_fn(jwt_auth))
        .layer(Extension(jwt_config));

    // Public routes (no auth)
    let public = Router::new().route("/health", get(handlers::health::health));

    public
        .merge(protected)
        .layer(Extension(state))
        // 10 parts × 10 MiB plus envelope headroom
        .layer(DefaultBodyLimit::max(MAX_IMAGE_BYTES * MAX_PARTS_PER_REQUEST + 1024 * 1024))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}
