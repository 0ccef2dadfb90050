//! JSON-over-HTTP transport with auth and retry.

use std::time::Duration;

use reqwest::{Client, Method, Url};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, warn};

use crate::auth::CloudAuth;
use crate::error::{CloudError, Result};

/// Longest response-body excerpt kept in error messages.
const BODY_EXCERPT: usize = 500;

/// HTTP transport bound to one API base URL.
pub struct HttpClient {
    client: Client,
    base: Url,
    auth: Box<dyn CloudAuth>,
    max_retries: u32,
    request_timeout: Duration,
}

impl HttpClient {
    pub fn new(
        base_url: &str,
        auth: Box<dyn CloudAuth>,
        request_timeout: Duration,
        max_retries: u32,
    ) -> Result<Self> {
        let base = Url::parse(base_url).map_err(|e| CloudError::InvalidUrl {
            url: base_url.to_string(),
            reason: e.to_string(),
        })?;
        if base.cannot_be_a_base() {
            return Err(CloudError::InvalidUrl {
                url: base_url.to_string(),
                reason: "not a base URL".into(),
            });
        }

        let client = Client::builder()
            .timeout(request_timeout)
            .build()
            .map_err(|e| CloudError::Network(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            base,
            auth,
            max_retries,
            request_timeout,
        })
    }

    /// `base` joined with `segments`, each percent-encoded as one path segment.
    pub fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|_| CloudError::InvalidUrl {
                url: self.base.to_string(),
                reason: "not a base URL".into(),
            })?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    pub async fn get_json<T: DeserializeOwned>(&self, segments: &[&str]) -> Result<T> {
        let url = self.endpoint(segments)?;
        self.send_json(Method::GET, url, Option::<&()>::None).await
    }

    pub async fn post_json<B: Serialize, T: DeserializeOwned>(
        &self,
        segments: &[&str],
        body: &B,
    ) -> Result<T> {
        let url = self.endpoint(segments)?;
        self.send_json(Method::POST, url, Some(body)).await
    }

    async fn send_json<B: Serialize, T: DeserializeOwned>(
        &self,
        method: Method,
        url: Url,
        body: Option<&B>,
    ) -> Result<T> {
        let mut auth_headers = Vec::new();
        self.auth
            .sign_request(url.as_str(), method.as_str(), &mut auth_headers)?;

        let mut last_err = None;
        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                // Exponential backoff: 500ms, 1s, 2s, ...
                let delay = Duration::from_millis(500 * (1 << (attempt - 1).min(6)));
                warn!(%url, attempt, ?delay, "retrying request");
                #[cfg(feature = "native")]
                tokio::time::sleep(delay).await;
            }

            let mut req = self
                .client
                .request(method.clone(), url.clone())
                .header("Accept", "application/json");
            for (key, value) in &auth_headers {
                req = req.header(key.as_str(), value.as_str());
            }
            if let Some(body) = body {
                req = req.json(body);
            }

            debug!(%method, %url, "sending request");
            match self.receive(req, &url).await {
                Ok(value) => return Ok(value),
                Err(e) if e.is_transient() && attempt < self.max_retries => last_err = Some(e),
                Err(e) => return Err(e),
            }
        }

        Err(last_err.unwrap_or_else(|| CloudError::Network(format!("request to {url} failed"))))
    }

    async fn receive<T: DeserializeOwned>(
        &self,
        req: reqwest::RequestBuilder,
        url: &Url,
    ) -> Result<T> {
        let resp = req.send().await?;
        let status = resp.status();
        let text = resp.text().await?;

        if !status.is_success() {
            return Err(CloudError::Status {
                status: status.as_u16(),
                url: url.to_string(),
                body: text.chars().take(BODY_EXCERPT).collect(),
            });
        }

        serde_json::from_str(&text).map_err(|e| CloudError::Decode {
            url: url.to_string(),
            reason: e.to_string(),
        })
    }

    pub fn request_timeout(&self) -> Duration {
        self.request_timeout
    }

    pub fn base_url(&self) -> &Url {
        &self.base
    }
}
