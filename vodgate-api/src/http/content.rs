//! Path-based content passthrough
//!
//! Legacy URLs and live segments that do not use the identifier scheme go
//! straight to the origin proxy gateway.

use axum::{
    extract::{Path, State},
    http::HeaderMap,
    response::Response,
};

use super::AppState;

/// GET /content/{*path}
pub async fn proxy_content(
    State(state): State<AppState>,
    Path(path): Path<String>,
    headers: HeaderMap,
) -> Response {
    state.gateway.forward(&path, &headers).await
}
