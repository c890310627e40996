use axum::{
    Router,
    routing::{get, post},
};
use std::sync::Arc;
use tower_http::compression::CompressionLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use super::handlers;
use super::state::AppState;

// API Routes - two-phase protocol plus cache administration
pub fn api_routes() -> Router<Arc<AppState>> {
    Router::new().nest(
        "/api",
        Router::new()
            // Two-phase protocol
            .route("/extract", post(handlers::api::extract))
            .route("/prepare", post(handlers::api::prepare))
            .route("/execute", post(handlers::api::execute))
            // Schema
            .route("/tables", get(handlers::api::list_tables))
            // Cache administration
            .route(
                "/cache",
                get(handlers::api::list_cache).delete(handlers::api::clear_cache),
            )
            .route("/cache/stats", get(handlers::api::cache_stats))
            .route("/cache/delete", post(handlers::api::delete_cache_entry))
            .route("/cache/cleanup", post(handlers::api::cleanup_cache)),
    )
}

pub fn build_router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(handlers::api::health))
        .merge(api_routes())
        .layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new())
        .layer(cors)
        .with_state(state)
}
