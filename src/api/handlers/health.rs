//! Service health handlers

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use chrono::Utc;
use serde_json::json;

use crate::api::server::AppState;

/// Liveness check
pub async fn health_check() -> impl IntoResponse {
    Json(json!({
        "status": "healthy",
        "timestamp": Utc::now(),
    }))
}

/// Readiness check: ready once at least one proxy is healthy
pub async fn ready_check(State(state): State<AppState>) -> impl IntoResponse {
    let total = state.pool.stats().len();
    let healthy = state.pool.healthy_count();

    if healthy == 0 {
        return (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({
                "status": "not ready",
                "reason": "No healthy proxies available",
            })),
        );
    }

    (
        StatusCode::OK,
        Json(json!({
            "status": "ready",
            "healthy_proxies": healthy,
            "total_proxies": total,
        })),
    )
}
