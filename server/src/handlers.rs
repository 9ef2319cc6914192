//! HTTP adapter for the scheduled catch-up trigger.

use axum::{
    extract::{Query, State},
    http::{header, HeaderMap},
    Json,
};
use serde::Deserialize;
use shared::FleetResult;

use crate::config::AppConfig;
use crate::db::DbPool;
use crate::error::{ApiError, ApiResult};
use crate::sync::service::catch_up_fleet;

#[derive(Clone)]
pub struct AppState {
    pub pool: DbPool,
    pub config: AppConfig,
}

#[derive(Debug, Deserialize)]
pub struct CatchUpParams {
    pub email: Option<String>,
}

/// GET /api/cron/catch-up
///
/// Scheduled trigger. Requires the shared cron secret as a bearer token;
/// anything else gets a bare 401. Per-account failures are reported in
/// the aggregated body, never as a non-2xx response.
pub async fn cron_catch_up(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(params): Query<CatchUpParams>,
) -> ApiResult<Json<FleetResult>> {
    if !has_cron_secret(&headers, &state.config.cron_secret) {
        tracing::error!("Unauthorized request: /api/cron/catch-up");
        return Err(ApiError::Unauthorized);
    }

    let result = catch_up_fleet(&state.pool, &state.config, params.email.as_deref()).await?;

    Ok(Json(result))
}

fn has_cron_secret(headers: &HeaderMap, secret: &str) -> bool {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(|token| token == secret)
        .unwrap_or(false)
}
