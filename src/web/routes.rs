//! Route definitions

use super::handlers;
use super::state::AppState;
use axum::{
    routing::{get, post},
    Router,
};
use tower_http::compression::CompressionLayer;
use tower_http::cors::{Any, CorsLayer};

/// Create the application router with all routes
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(handlers::index))
        .route("/offers", post(handlers::search))
        .route("/offers/:id", get(handlers::detail))
        .route("/stats", get(handlers::stats))
        .route("/health", get(handlers::health))
        .layer(CompressionLayer::new())
        .layer(cors)
        .with_state(state)
}
