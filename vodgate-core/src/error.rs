use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Access denied: {0}")]
    AccessDenied(String),

    #[error("Upstream unavailable: {0}")]
    UpstreamUnavailable(String),

    #[error("Transfer failed: {0}")]
    TransferFailed(String),

    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    #[error("Probe unavailable: {0}")]
    ProbeUnavailable(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Stable category code used in JSON error bodies.
    pub fn category(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "not_found",
            Self::AccessDenied(_) => "access_denied",
            Self::UpstreamUnavailable(_) => "upstream_unavailable",
            Self::TransferFailed(_) => "transfer_failed",
            Self::UnsupportedFormat(_) => "unsupported_format",
            Self::ProbeUnavailable(_) => "probe_unavailable",
            Self::InvalidInput(_) => "invalid_input",
            Self::Io(_) => "io",
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
