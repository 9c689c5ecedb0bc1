// HTTP error handling

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Result type for HTTP handlers
pub type AppResult<T> = Result<T, AppError>;

/// Application error with HTTP status code and taxonomy category
#[derive(Debug)]
pub struct AppError {
    pub status: StatusCode,
    pub category: &'static str,
    pub message: String,
}

impl AppError {
    pub fn new(status: StatusCode, category: &'static str, message: impl Into<String>) -> Self {
        Self {
            status,
            category,
            message: message.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, "invalid_input", message)
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, "unauthorized", message)
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(StatusCode::FORBIDDEN, "access_denied", message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, "not_found", message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, "internal", message)
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.status, self.message)
    }
}

impl std::error::Error for AppError {}

/// Error response JSON structure
#[derive(Debug, Serialize, Deserialize)]
struct ErrorResponse {
    error: String,
    category: String,
    status: u16,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status;
        let body = Json(ErrorResponse {
            error: self.message,
            category: self.category.to_string(),
            status: status.as_u16(),
        });
        (status, body).into_response()
    }
}

/// Convert core errors to HTTP errors. Messages with internal detail are
/// replaced; paths and credentials never reach clients.
impl From<vodgate_core::Error> for AppError {
    fn from(err: vodgate_core::Error) -> Self {
        use vodgate_core::Error;

        let category = err.category();
        match err {
            Error::NotFound(msg) => Self::new(StatusCode::NOT_FOUND, category, msg),
            Error::AccessDenied(msg) => Self::new(StatusCode::FORBIDDEN, category, msg),
            Error::InvalidInput(msg) => Self::new(StatusCode::BAD_REQUEST, category, msg),
            Error::UnsupportedFormat(msg) => {
                Self::new(StatusCode::UNSUPPORTED_MEDIA_TYPE, category, msg)
            }
            Error::UpstreamUnavailable(msg) => {
                tracing::warn!("Upstream unavailable: {msg}");
                Self::new(
                    StatusCode::BAD_GATEWAY,
                    category,
                    "origin server unavailable",
                )
            }
            Error::TransferFailed(msg) => {
                tracing::warn!("Transfer failed: {msg}");
                Self::new(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    category,
                    "transfer failed",
                )
            }
            Error::ProbeUnavailable(msg) => {
                // Callers normally substitute defaults before this point
                tracing::warn!("Probe unavailable surfaced to HTTP layer: {msg}");
                Self::new(StatusCode::INTERNAL_SERVER_ERROR, category, "probe failed")
            }
            Error::Io(e) => {
                tracing::error!("I/O error: {e}");
                Self::new(StatusCode::INTERNAL_SERVER_ERROR, category, "internal error")
            }
        }
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        tracing::error!("Internal error: {err:#}");
        Self::internal("internal error")
    }
}
