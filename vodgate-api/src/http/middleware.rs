// HTTP middleware

use axum::{
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};

use super::{AppError, AppState};

/// Trusted header set by the upstream authentication layer.
pub const USER_HEADER: &str = "x-vodgate-user";
/// Optional per-request origin server override.
pub const SERVER_HEADER: &str = "x-vodgate-server";

/// Verified caller identity, resolved by the authentication layer in
/// front of this service. Missing identity is a 401, not a guess.
#[derive(Debug, Clone)]
pub struct CallerIdentity {
    pub login: String,
    pub server_id: String,
}

impl<S> FromRequestParts<S> for CallerIdentity
where
    S: Send + Sync,
    AppState: FromRef<S>,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let app_state = AppState::from_ref(state);

        let login = parts
            .headers
            .get(USER_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .ok_or_else(|| AppError::unauthorized("missing caller identity"))?
            .to_string();

        let server_id = parts
            .headers
            .get(SERVER_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map_or_else(|| app_state.config.origin.host.clone(), ToString::to_string);

        Ok(Self { login, server_id })
    }
}
