//! Error types for the remote service client.

use thiserror::Error;

/// Errors produced while talking to the remote raster-analysis service.
#[derive(Error, Debug)]
pub enum CloudError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Non-2xx response. `body` is truncated.
    #[error("HTTP {status} from {url}: {body}")]
    Status {
        status: u16,
        url: String,
        body: String,
    },

    #[error("invalid endpoint URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("malformed response from {url}: {reason}")]
    Decode { url: String, reason: String },

    #[error("authentication error: {0}")]
    Auth(String),

    #[error("network error: {0}")]
    Network(String),

    #[error("core error: {0}")]
    Core(#[from] verdex_core::Error),
}

impl CloudError {
    /// Whether a retry could succeed (timeouts, connection failures, 5xx).
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Http(e) => e.is_timeout() || e.is_connect(),
            Self::Status { status, .. } => *status >= 500,
            Self::Network(_) => true,
            _ => false,
        }
    }
}

impl From<CloudError> for verdex_core::Error {
    fn from(e: CloudError) -> Self {
        match e {
            CloudError::Core(inner) => inner,
            other => verdex_core::Error::data_source(other.to_string()),
        }
    }
}

/// Result alias for cloud operations.
pub type Result<T> = std::result::Result<T, CloudError>;
