//! Remote raster-analysis service abstraction.
//!
//! The engine never holds live remote objects. Collections and images are
//! plain value handles returned by a [`RasterService`], and every operation is
//! a blocking call that either yields a value or a
//! [`verdex_core::Error::DataSource`].

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use verdex_core::{BBox, Region, Result};

use crate::config::ReductionPolicy;
use crate::expr::Expr;

// ---------------------------------------------------------------------------
// Queries and handles
// ---------------------------------------------------------------------------

/// One server-side filter applied to a collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CollectionFilter {
    /// Acquisition date in `[start, end_exclusive)`.
    Date {
        start: NaiveDate,
        end_exclusive: NaiveDate,
    },
    /// Scene footprint intersects the region.
    Bounds {
        bbox: BBox,
        geometry: serde_json::Value,
    },
    /// Scene property strictly below a threshold.
    PropertyLessThan { property: String, value: f64 },
}

/// A collection identifier plus its ordered filters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollectionQuery {
    pub collection_id: String,
    pub filters: Vec<CollectionFilter>,
}

impl CollectionQuery {
    pub fn new(collection_id: impl Into<String>) -> Self {
        Self {
            collection_id: collection_id.into(),
            filters: Vec::new(),
        }
    }

    pub fn filter(mut self, filter: CollectionFilter) -> Self {
        self.filters.push(filter);
        self
    }

    /// Canonical text form; equal queries give equal fingerprints.
    pub fn fingerprint(&self) -> String {
        // serde_json maps are sorted, so this is stable across runs.
        serde_json::to_string(self).unwrap_or_else(|_| format!("{self:?}"))
    }
}

/// Opaque reference to a filtered, server-side image collection.
#[derive(Debug, Clone, PartialEq)]
pub struct CollectionHandle {
    id: String,
    query: CollectionQuery,
}

impl CollectionHandle {
    pub fn new(id: impl Into<String>, query: CollectionQuery) -> Self {
        Self {
            id: id.into(),
            query,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// The query this handle was resolved from.
    pub fn query(&self) -> &CollectionQuery {
        &self.query
    }
}

/// Opaque reference to a single server-side raster.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ImageHandle(String);

impl ImageHandle {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn id(&self) -> &str {
        &self.0
    }
}

// ---------------------------------------------------------------------------
// Service trait
// ---------------------------------------------------------------------------

/// Blocking operations the engine needs from a remote raster service.
pub trait RasterService: Send + Sync {
    /// Instantiate a named collection with filters applied in query order.
    fn filter_collection(&self, query: &CollectionQuery) -> Result<CollectionHandle>;

    /// Number of scenes in a collection.
    fn collection_size(&self, collection: &CollectionHandle) -> Result<usize>;

    /// Per-pixel median composite of a collection.
    fn composite(&self, collection: &CollectionHandle) -> Result<ImageHandle>;

    /// Band names of an image.
    fn band_names(&self, image: &ImageHandle) -> Result<Vec<String>>;

    /// Evaluate a band expression into a new single-band image.
    fn evaluate(&self, image: &ImageHandle, expression: &Expr) -> Result<ImageHandle>;

    /// Spatial mean of a single-band image over `region`.
    ///
    /// `Ok(None)` means the service produced no statistic (no valid pixels).
    fn reduce_mean(
        &self,
        image: &ImageHandle,
        region: &Region,
        policy: &ReductionPolicy,
    ) -> Result<Option<f64>>;

    /// Acquisition timestamps, in collection order.
    fn scene_timestamps(&self, collection: &CollectionHandle) -> Result<Vec<DateTime<Utc>>>;

    /// Scene at `position` in collection order.
    fn image_at(&self, collection: &CollectionHandle, position: usize) -> Result<ImageHandle>;
}

impl<S: RasterService + ?Sized> RasterService for Box<S> {
    fn filter_collection(&self, query: &CollectionQuery) -> Result<CollectionHandle> {
        (**self).filter_collection(query)
    }

    fn collection_size(&self, collection: &CollectionHandle) -> Result<usize> {
        (**self).collection_size(collection)
    }

    fn composite(&self, collection: &CollectionHandle) -> Result<ImageHandle> {
        (**self).composite(collection)
    }

    fn band_names(&self, image: &ImageHandle) -> Result<Vec<String>> {
        (**self).band_names(image)
    }

    fn evaluate(&self, image: &ImageHandle, expression: &Expr) -> Result<ImageHandle> {
        (**self).evaluate(image, expression)
    }

    fn reduce_mean(
        &self,
        image: &ImageHandle,
        region: &Region,
        policy: &ReductionPolicy,
    ) -> Result<Option<f64>> {
        (**self).reduce_mean(image, region, policy)
    }

    fn scene_timestamps(&self, collection: &CollectionHandle) -> Result<Vec<DateTime<Utc>>> {
        (**self).scene_timestamps(collection)
    }

    fn image_at(&self, collection: &CollectionHandle, position: usize) -> Result<ImageHandle> {
        (**self).image_at(collection, position)
    }
}

impl<S: RasterService + ?Sized> RasterService for &S {
    fn filter_collection(&self, query: &CollectionQuery) -> Result<CollectionHandle> {
        (**self).filter_collection(query)
    }

    fn collection_size(&self, collection: &CollectionHandle) -> Result<usize> {
        (**self).collection_size(collection)
    }

    fn composite(&self, collection: &CollectionHandle) -> Result<ImageHandle> {
        (**self).composite(collection)
    }

    fn band_names(&self, image: &ImageHandle) -> Result<Vec<String>> {
        (**self).band_names(image)
    }

    fn evaluate(&self, image: &ImageHandle, expression: &Expr) -> Result<ImageHandle> {
        (**self).evaluate(image, expression)
    }

    fn reduce_mean(
        &self,
        image: &ImageHandle,
        region: &Region,
        policy: &ReductionPolicy,
    ) -> Result<Option<f64>> {
        (**self).reduce_mean(image, region, policy)
    }

    fn scene_timestamps(&self, collection: &CollectionHandle) -> Result<Vec<DateTime<Utc>>> {
        (**self).scene_timestamps(collection)
    }

    fn image_at(&self, collection: &CollectionHandle, position: usize) -> Result<ImageHandle> {
        (**self).image_at(collection, position)
    }
}
