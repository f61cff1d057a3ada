//! Proxy selection and reporting handlers

use axum::extract::{Path, Query, State};
use axum::response::IntoResponse;
use axum::Json;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::api::server::AppState;
use crate::error::CarouselError;
use crate::models::{ProxyConfig, ProxyStats, SelectedProxy};
use crate::pool::rotation::RotationStrategy;

/// Query parameters for the next-proxy endpoint
#[derive(Debug, Deserialize, Default)]
pub struct NextProxyQuery {
    pub strategy: Option<String>,
    pub country: Option<String>,
}

/// The subset of a proxy config exposed to selection clients
#[derive(Debug, Serialize)]
pub struct ProxySummary {
    pub id: String,
    pub name: String,
    pub provider: String,
    pub location: Option<String>,
    pub country_code: Option<String>,
}

impl From<&ProxyConfig> for ProxySummary {
    fn from(config: &ProxyConfig) -> Self {
        Self {
            id: config.id.clone(),
            name: config.name.clone(),
            provider: config.provider.clone(),
            location: config.location.clone(),
            country_code: config.country_code.clone(),
        }
    }
}

/// Selection response: the client-facing URL plus a config summary
#[derive(Debug, Serialize)]
pub struct SelectionResponse {
    pub url: String,
    pub proxy: ProxySummary,
}

impl From<SelectedProxy> for SelectionResponse {
    fn from(selected: SelectedProxy) -> Self {
        Self {
            url: selected.url,
            proxy: ProxySummary::from(&selected.proxy),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct HealthSummary {
    pub is_healthy: bool,
    pub last_check_time: DateTime<Utc>,
    pub success_rate: f64,
    pub avg_response_time: i64,
    pub last_error: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct UsageSummary {
    pub usage_count: i64,
    pub last_used_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct ProxyStatsSummary {
    pub id: String,
    pub name: String,
    pub provider: String,
    pub location: Option<String>,
    pub country_code: Option<String>,
    pub is_active: bool,
    pub health: HealthSummary,
    pub usage: UsageSummary,
}

impl From<ProxyStats> for ProxyStatsSummary {
    fn from(stats: ProxyStats) -> Self {
        Self {
            id: stats.proxy.id,
            name: stats.proxy.name,
            provider: stats.proxy.provider,
            location: stats.proxy.location,
            country_code: stats.proxy.country_code,
            is_active: stats.proxy.is_active,
            health: HealthSummary {
                is_healthy: stats.health.is_healthy,
                last_check_time: stats.health.last_check_time,
                success_rate: stats.health.success_rate(),
                avg_response_time: stats.health.avg_response_time.round() as i64,
                last_error: stats.health.last_error,
            },
            usage: UsageSummary {
                usage_count: stats.usage.usage_count,
                last_used_at: stats.usage.last_used_at,
            },
        }
    }
}

/// Request body for reporting a proxy failure
#[derive(Debug, Deserialize)]
pub struct ReportFailureRequest {
    pub error: String,
}

/// Get the next proxy according to the requested strategy
pub async fn next_proxy(
    State(state): State<AppState>,
    Query(query): Query<NextProxyQuery>,
) -> Result<impl IntoResponse, CarouselError> {
    let strategy = match query.strategy.as_deref() {
        Some(s) => RotationStrategy::from_str(s).ok_or_else(|| {
            CarouselError::InvalidRequest(format!("unknown rotation strategy: {}", s))
        })?,
        None => RotationStrategy::default(),
    };

    let country = query.country.map(validate_country_code).transpose()?;

    let selected = state.pool.select_proxy(strategy, country.as_deref()).await?;
    Ok(Json(SelectionResponse::from(selected)))
}

/// Get a uniformly random proxy
pub async fn random_proxy(
    State(state): State<AppState>,
) -> Result<impl IntoResponse, CarouselError> {
    let selected = state
        .pool
        .select_proxy(RotationStrategy::Random, None)
        .await?;
    Ok(Json(SelectionResponse::from(selected)))
}

/// Get a proxy for a specific country
pub async fn geo_proxy(
    State(state): State<AppState>,
    Path(country_code): Path<String>,
) -> Result<impl IntoResponse, CarouselError> {
    let country = validate_country_code(country_code)?;

    let selected = state
        .pool
        .select_proxy(RotationStrategy::Location, Some(&country))
        .await?;
    Ok(Json(SelectionResponse::from(selected)))
}

/// Get per-proxy health and usage statistics
pub async fn proxy_stats(State(state): State<AppState>) -> impl IntoResponse {
    let stats = state.pool.stats();

    let total = stats.len();
    let healthy = stats.iter().filter(|s| s.health.is_healthy).count();
    let proxies: Vec<ProxyStatsSummary> =
        stats.into_iter().map(ProxyStatsSummary::from).collect();

    Json(json!({
        "total_proxies": total,
        "healthy_proxies": healthy,
        "proxies": proxies,
    }))
}

/// Report a proxy failure observed outside the probe loop
pub async fn report_proxy_error(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<ReportFailureRequest>,
) -> Result<impl IntoResponse, CarouselError> {
    if req.error.trim().is_empty() {
        return Err(CarouselError::InvalidRequest(
            "error message is required".to_string(),
        ));
    }

    state.pool.report_failure(&id, &req.error).await?;
    Ok(Json(json!({ "message": "Proxy marked as unhealthy" })))
}

/// Normalize a country code parameter to uppercase ISO-3166 alpha-2
fn validate_country_code(raw: String) -> Result<String, CarouselError> {
    let code = raw.trim().to_uppercase();
    if code.len() != 2 || !code.chars().all(|c| c.is_ascii_alphabetic()) {
        return Err(CarouselError::InvalidRequest(
            "country code must be 2 letters".to_string(),
        ));
    }
    Ok(code)
}
