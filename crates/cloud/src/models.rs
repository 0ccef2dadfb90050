//! Wire types for the raster-analysis REST API.
//!
//! Requests are sent as JSON with camelCase keys. Handles are opaque strings
//! minted by the server.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use verdex_engine::{CollectionFilter, ReductionPolicy};

// ---------------------------------------------------------------------------
// Requests
// ---------------------------------------------------------------------------

/// Body for `POST collections/filter`.
#[derive(Debug, Clone, Serialize)]
pub struct FilterRequest<'a> {
    pub collection: &'a str,
    pub filters: &'a [CollectionFilter],
}

/// Body for `POST collections/{h}/composite`.
#[derive(Debug, Clone, Serialize)]
pub struct CompositeRequest {
    pub reducer: &'static str,
}

impl CompositeRequest {
    pub fn median() -> Self {
        Self { reducer: "median" }
    }
}

/// Body for `POST images/{h}/expression`.
#[derive(Debug, Clone, Serialize)]
pub struct ExpressionRequest {
    /// Fully parenthesised band-math formula.
    pub expression: String,
}

/// Body for `POST images/{h}/reduce`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReduceRequest {
    pub reducer: &'static str,
    pub geometry: serde_json::Value,
    pub scale: f64,
    pub max_pixels: f64,
    pub best_effort: bool,
}

impl ReduceRequest {
    pub fn mean(geometry: serde_json::Value, policy: &ReductionPolicy) -> Self {
        Self {
            reducer: "mean",
            geometry,
            scale: policy.scale_m,
            max_pixels: policy.max_pixels,
            best_effort: policy.best_effort,
        }
    }
}

// ---------------------------------------------------------------------------
// Responses
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct HandleResponse {
    pub handle: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SizeResponse {
    pub count: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BandsResponse {
    pub bands: Vec<String>,
}

/// `value` is `null` when the region had no valid pixels.
#[derive(Debug, Clone, Deserialize)]
pub struct ReduceResponse {
    pub value: Option<f64>,
}

/// Acquisition times as epoch milliseconds.
#[derive(Debug, Clone, Deserialize)]
pub struct TimestampsResponse {
    pub timestamps: Vec<i64>,
}

impl TimestampsResponse {
    /// Convert to UTC instants; `Err` carries the first out-of-range value.
    pub fn to_datetimes(&self) -> std::result::Result<Vec<DateTime<Utc>>, i64> {
        self.timestamps
            .iter()
            .map(|ms| DateTime::from_timestamp_millis(*ms).ok_or(*ms))
            .collect()
    }
}
