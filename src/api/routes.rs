//! API route definitions

use axum::routing::{get, post};
use axum::Router;

use super::handlers;
use super::server::AppState;

/// Create the API router with all routes
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health::health_check))
        .route("/ready", get(handlers::health::ready_check))
        .nest("/api/v1", proxy_routes())
        .with_state(state)
}

fn proxy_routes() -> Router<AppState> {
    Router::new()
        .route("/proxy", get(handlers::proxy::next_proxy))
        .route("/proxy/random", get(handlers::proxy::random_proxy))
        .route("/proxy/geo/:country_code", get(handlers::proxy::geo_proxy))
        .route("/proxy/stats", get(handlers::proxy::proxy_stats))
        .route("/proxy/:id/error", post(handlers::proxy::report_proxy_error))
}
