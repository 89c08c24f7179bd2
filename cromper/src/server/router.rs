use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use tower_http::trace::TraceLayer;

use super::handlers;
use super::state::AppState;

/// Objects travel base64-encoded inside JSON bodies.
const MAX_BODY_SIZE: usize = 64 * 1024 * 1024;

pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Jobs
        .route("/compile", post(handlers::compile))
        .route("/assemble", post(handlers::assemble))
        .route("/diff", post(handlers::diff))
        .route("/decompile", post(handlers::decompile))
        // Catalog
        .route("/platform", get(handlers::list_platforms))
        .route("/platform/:id", get(handlers::get_platform))
        .route("/compiler", get(handlers::list_compilers))
        .route("/compiler/:platform_id", get(handlers::platform_compilers))
        .route("/compiler/:platform_id/:compiler_id", get(handlers::get_compiler))
        .route("/library", get(handlers::list_libraries))
        .route("/health", get(handlers::health_check))
        .layer(DefaultBodyLimit::max(MAX_BODY_SIZE))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
