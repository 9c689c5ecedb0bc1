//! Cache administration endpoints

use axum::{extract::State, Json};
use serde::Serialize;
use tracing::info;

use vodgate_core::cache::CacheStatus;

use super::middleware::CallerIdentity;
use super::{AppResult, AppState};

/// GET /videos/cache/status
pub async fn cache_status(
    _identity: CallerIdentity,
    State(state): State<AppState>,
) -> AppResult<Json<CacheStatus>> {
    let status = state.cache.status()?;
    Ok(Json(status))
}

#[derive(Debug, Serialize)]
pub struct ClearResponse {
    pub removed: usize,
}

/// POST /videos/cache/clear
pub async fn cache_clear(
    identity: CallerIdentity,
    State(state): State<AppState>,
) -> AppResult<Json<ClearResponse>> {
    let removed = state.cache.clear()?;
    info!(by = %identity.login, removed, "cache cleared via API");
    Ok(Json(ClearResponse { removed }))
}
