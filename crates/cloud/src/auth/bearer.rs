//! OAuth-style bearer token authentication.

use crate::auth::CloudAuth;
use crate::error::{CloudError, Result};

/// Environment variable read by [`BearerToken::from_env`].
pub const TOKEN_ENV: &str = "VERDEX_TOKEN";

/// Sends `Authorization: Bearer <token>` with every request.
#[derive(Clone)]
pub struct BearerToken {
    token: String,
}

impl BearerToken {
    pub fn new(token: impl Into<String>) -> Result<Self> {
        let token = token.into();
        if token.trim().is_empty() {
            return Err(CloudError::Auth("empty bearer token".into()));
        }
        Ok(Self { token })
    }

    /// Read the token from `VERDEX_TOKEN`.
    pub fn from_env() -> Result<Self> {
        let token = std::env::var(TOKEN_ENV)
            .map_err(|_| CloudError::Auth(format!("{TOKEN_ENV} not set")))?;
        Self::new(token)
    }
}

impl std::fmt::Debug for BearerToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BearerToken").field("token", &"***").finish()
    }
}

impl CloudAuth for BearerToken {
    fn sign_request(
        &self,
        _url: &str,
        _method: &str,
        headers: &mut Vec<(String, String)>,
    ) -> Result<()> {
        headers.push(("Authorization".into(), format!("Bearer {}", self.token)));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn adds_authorization_header() {
        let auth = BearerToken::new("abc123").unwrap();
        let mut headers = Vec::new();
        auth.sign_request("https://x", "GET", &mut headers).unwrap();
        assert_eq!(
            headers,
            vec![("Authorization".to_string(), "Bearer abc123".to_string())]
        );
    }

    #[test]
    fn empty_token_rejected() {
        assert!(matches!(BearerToken::new("  "), Err(CloudError::Auth(_))));
    }

    #[test]
    fn debug_hides_token() {
        let auth = BearerToken::new("secret").unwrap();
        assert!(!format!("{auth:?}").contains("secret"));
    }
}
