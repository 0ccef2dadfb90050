//! Collection resolution: (source, dates, region) → filtered collection.

use tracing::debug;
use verdex_core::{DateRange, Region, Result};

use crate::service::{CollectionFilter, CollectionHandle, CollectionQuery, RasterService};
use crate::source::SourceProfile;

/// A filtered collection and the number of scenes it holds.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedCollection {
    pub handle: CollectionHandle,
    pub scene_count: usize,
}

impl ResolvedCollection {
    pub fn is_empty(&self) -> bool {
        self.scene_count == 0
    }
}

/// Build the query for `profile`: date range, then region bounds, then the
/// cloud-cover threshold when the catalog has one.
pub fn collection_query(
    profile: &SourceProfile,
    dates: &DateRange,
    region: &Region,
    cloud_threshold: Option<f64>,
) -> CollectionQuery {
    let mut query = CollectionQuery::new(profile.collection_id)
        .filter(CollectionFilter::Date {
            start: dates.start(),
            end_exclusive: dates.end_exclusive(),
        })
        .filter(CollectionFilter::Bounds {
            bbox: region.bbox(),
            geometry: region.to_geojson(),
        });

    if let Some(cloud) = profile.cloud_cover {
        query = query.filter(CollectionFilter::PropertyLessThan {
            property: cloud.property.to_string(),
            value: cloud_threshold.unwrap_or(cloud.max_percent),
        });
    }
    query
}

/// Resolve and count the collection for one analysis.
pub fn resolve_collection<S: RasterService + ?Sized>(
    service: &S,
    profile: &SourceProfile,
    dates: &DateRange,
    region: &Region,
    cloud_threshold: Option<f64>,
) -> Result<ResolvedCollection> {
    let query = collection_query(profile, dates, region, cloud_threshold);
    debug!(collection = profile.collection_id, filters = query.filters.len(), "filtering collection");

    let handle = service.filter_collection(&query)?;
    let scene_count = service.collection_size(&handle)?;
    debug!(handle = handle.id(), scene_count, "collection resolved");

    Ok(ResolvedCollection {
        handle,
        scene_count,
    })
}
