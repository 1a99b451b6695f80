//! API Routes
//!
//! Configures the Axum router with all export server endpoints.

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use super::handlers::{cache_operation_handler, export_handler, health_handler, AppState};

/// Creates the main router with all endpoints configured.
///
/// The static `/api/export/cache` route takes precedence over the
/// `:format` capture.
///
/// # Middleware
/// - CORS: Allows any origin (configurable for production)
/// - Tracing: Logs all requests for debugging
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/export/cache", post(cache_operation_handler))
        .route("/api/export/:format", post(export_handler))
        .route("/health", get(health_handler))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
