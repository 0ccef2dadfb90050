//! Async client for the raster-analysis REST API.
//!
//! One method per endpoint. Handles returned by the server are wrapped in the
//! engine's [`CollectionHandle`] / [`ImageHandle`] value types.

use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::debug;
use verdex_core::Region;
use verdex_engine::{CollectionHandle, CollectionQuery, Expr, ImageHandle, ReductionPolicy};

use crate::auth::{CloudAuth, NoAuth};
use crate::error::{CloudError, Result};
use crate::http::HttpClient;
use crate::models::{
    BandsResponse, CompositeRequest, ExpressionRequest, FilterRequest, HandleResponse,
    ReduceRequest, ReduceResponse, SizeResponse, TimestampsResponse,
};

/// Environment variable holding the API base URL.
pub const ENDPOINT_ENV: &str = "VERDEX_ENDPOINT";

// ---------------------------------------------------------------------------
// Options
// ---------------------------------------------------------------------------

/// Configuration for [`RemoteClient`].
#[derive(Debug, Clone)]
pub struct RemoteClientOptions {
    /// Per-request timeout (default 120 s). Server-side reductions can be slow.
    pub request_timeout: Duration,
    /// Retries on timeouts, connection failures and 5xx (default 0).
    pub max_retries: u32,
}

impl Default for RemoteClientOptions {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(120),
            max_retries: 0,
        }
    }
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

/// Async client bound to one service endpoint.
pub struct RemoteClient {
    http: HttpClient,
}

impl RemoteClient {
    pub fn new(
        base_url: &str,
        auth: Box<dyn CloudAuth>,
        options: RemoteClientOptions,
    ) -> Result<Self> {
        let http = HttpClient::new(
            base_url,
            auth,
            options.request_timeout,
            options.max_retries,
        )?;
        Ok(Self { http })
    }

    /// Unauthenticated client, mostly for local deployments.
    pub fn anonymous(base_url: &str) -> Result<Self> {
        Self::new(base_url, Box::new(NoAuth), RemoteClientOptions::default())
    }

    pub fn base_url(&self) -> &str {
        self.http.base_url().as_str()
    }

    // ── Collections ─────────────────────────────────────────────────

    pub async fn filter_collection(&self, query: &CollectionQuery) -> Result<CollectionHandle> {
        let body = FilterRequest {
            collection: &query.collection_id,
            filters: &query.filters,
        };
        let resp: HandleResponse = self
            .http
            .post_json(&["collections", "filter"], &body)
            .await?;
        debug!(collection = %query.collection_id, handle = %resp.handle, "collection filtered");
        Ok(CollectionHandle::new(resp.handle, query.clone()))
    }

    pub async fn collection_size(&self, collection: &CollectionHandle) -> Result<usize> {
        let resp: SizeResponse = self
            .http
            .get_json(&["collections", collection.id(), "size"])
            .await?;
        Ok(resp.count)
    }

    pub async fn composite(&self, collection: &CollectionHandle) -> Result<ImageHandle> {
        let resp: HandleResponse = self
            .http
            .post_json(
                &["collections", collection.id(), "composite"],
                &CompositeRequest::median(),
            )
            .await?;
        Ok(ImageHandle::new(resp.handle))
    }

    pub async fn scene_timestamps(
        &self,
        collection: &CollectionHandle,
    ) -> Result<Vec<DateTime<Utc>>> {
        let segments = ["collections", collection.id(), "timestamps"];
        let resp: TimestampsResponse = self.http.get_json(&segments).await?;
        resp.to_datetimes().map_err(|ms| CloudError::Decode {
            url: segments.join("/"),
            reason: format!("timestamp {ms} out of range"),
        })
    }

    pub async fn image_at(
        &self,
        collection: &CollectionHandle,
        position: usize,
    ) -> Result<ImageHandle> {
        let position = position.to_string();
        let resp: HandleResponse = self
            .http
            .get_json(&["collections", collection.id(), "images", position.as_str()])
            .await?;
        Ok(ImageHandle::new(resp.handle))
    }

    // ── Images ──────────────────────────────────────────────────────

    pub async fn band_names(&self, image: &ImageHandle) -> Result<Vec<String>> {
        let resp: BandsResponse = self.http.get_json(&["images", image.id(), "bands"]).await?;
        Ok(resp.bands)
    }

    pub async fn evaluate(&self, image: &ImageHandle, expression: &Expr) -> Result<ImageHandle> {
        let body = ExpressionRequest {
            expression: expression.to_string(),
        };
        let resp: HandleResponse = self
            .http
            .post_json(&["images", image.id(), "expression"], &body)
            .await?;
        Ok(ImageHandle::new(resp.handle))
    }

    /// Region mean; `None` when the server reports no statistic.
    pub async fn reduce_mean(
        &self,
        image: &ImageHandle,
        region: &Region,
        policy: &ReductionPolicy,
    ) -> Result<Option<f64>> {
        let body = ReduceRequest::mean(region.to_geojson(), policy);
        let resp: ReduceResponse = self
            .http
            .post_json(&["images", image.id(), "reduce"], &body)
            .await?;
        Ok(resp.value.filter(|v| v.is_finite()))
    }
}
