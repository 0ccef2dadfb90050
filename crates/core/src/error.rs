//! Error types for verdex

use thiserror::Error;

/// Main error type for verdex operations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    /// The request was rejected before contacting the remote service.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// A remote raster-analysis call failed (auth, quota, network, malformed
    /// response). The originating message is kept verbatim.
    #[error("service error: {message}")]
    DataSource { message: String },

    #[error("Invalid region geometry: {0}")]
    InvalidGeometry(String),

    #[error("Invalid parameter: {name} = {value} ({reason})")]
    InvalidParameter {
        name: &'static str,
        value: String,
        reason: String,
    },

    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Shorthand for a [`Error::DataSource`] carrying `message`.
    pub fn data_source(message: impl Into<String>) -> Self {
        Error::DataSource {
            message: message.into(),
        }
    }

    /// Whether this error was raised before any remote call.
    pub fn is_caller_error(&self) -> bool {
        matches!(
            self,
            Error::InvalidRequest(_) | Error::InvalidGeometry(_) | Error::InvalidParameter { .. }
        )
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Other(format!("JSON error: {e}"))
    }
}

/// Result type alias for verdex operations
pub type Result<T> = std::result::Result<T, Error>;
