//! Request authentication for the remote service.

mod bearer;
mod none;

pub use bearer::{BearerToken, TOKEN_ENV};
pub use none::NoAuth;

use crate::error::Result;

/// Adds authentication headers to outgoing requests.
pub trait CloudAuth: Send + Sync {
    /// Push auth headers for a `method` request to `url` onto `headers`.
    fn sign_request(
        &self,
        url: &str,
        method: &str,
        headers: &mut Vec<(String, String)>,
    ) -> Result<()>;
}
