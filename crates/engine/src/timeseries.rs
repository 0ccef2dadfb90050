//! Time-series sampling of one index over a collection.
//!
//! Scene timestamps are listed once, sorted and truncated up front; the
//! per-scene work then happens lazily as the iterator is driven. Scenes that
//! fail, lack the index's bands, or reduce to no data are skipped.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use verdex_core::{Region, Result};

use crate::calculator::{evaluate_index, Evaluation};
use crate::config::ReductionPolicy;
use crate::index::VegetationIndex;
use crate::service::{CollectionHandle, RasterService};
use crate::source::SourceProfile;

/// Upper bound on the number of sampled scenes.
pub const DEFAULT_MAX_POINTS: usize = 10;

/// One index value at one acquisition time.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimeSeriesPoint {
    pub timestamp: DateTime<Utc>,
    pub value: f64,
}

/// Lazy iterator over the sampled scenes of a collection.
///
/// Yields at most `max_points` points in non-decreasing timestamp order. Not
/// restartable: build a new one with [`sample_time_series`] to sample again.
pub struct TimeSeries<'a, S: RasterService + ?Sized> {
    service: &'a S,
    collection: &'a CollectionHandle,
    profile: &'a SourceProfile,
    index: VegetationIndex,
    region: &'a Region,
    policy: ReductionPolicy,
    /// (timestamp, collection position), already sorted and truncated.
    pending: std::vec::IntoIter<(DateTime<Utc>, usize)>,
}

impl<S: RasterService + ?Sized> TimeSeries<'_, S> {
    /// Scenes not yet visited.
    pub fn remaining(&self) -> usize {
        self.pending.len()
    }

    fn sample(&self, position: usize, timestamp: DateTime<Utc>) -> Result<Evaluation> {
        let image = self.service.image_at(self.collection, position)?;
        let bands = self.service.band_names(&image)?;
        evaluate_index(
            self.service,
            &image,
            &bands,
            self.profile,
            self.index,
            self.region,
            &self.policy,
        )
        .inspect(|_| debug!(position, %timestamp, "scene sampled"))
    }
}

impl<S: RasterService + ?Sized> Iterator for TimeSeries<'_, S> {
    type Item = TimeSeriesPoint;

    fn next(&mut self) -> Option<Self::Item> {
        while let Some((timestamp, position)) = self.pending.next() {
            match self.sample(position, timestamp) {
                Ok(Evaluation::Value(Some(value))) => {
                    return Some(TimeSeriesPoint { timestamp, value })
                }
                Ok(Evaluation::Value(None)) => {
                    debug!(position, %timestamp, index = %self.index, "no data, scene skipped")
                }
                Ok(Evaluation::Unavailable(reason)) => {
                    warn!(position, %timestamp, index = %self.index, %reason, "scene skipped")
                }
                Err(e) => {
                    warn!(position, %timestamp, index = %self.index, error = %e, "scene skipped")
                }
            }
        }
        None
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (0, Some(self.pending.len()))
    }
}

/// Start sampling `index` over `collection`.
///
/// Lists the scene timestamps (a failure here is returned), orders scenes by
/// acquisition time with ties kept in collection order, and keeps the first
/// `max_points`.
pub fn sample_time_series<'a, S: RasterService + ?Sized>(
    service: &'a S,
    collection: &'a CollectionHandle,
    profile: &'a SourceProfile,
    index: VegetationIndex,
    region: &'a Region,
    policy: ReductionPolicy,
    max_points: usize,
) -> Result<TimeSeries<'a, S>> {
    let timestamps = service.scene_timestamps(collection)?;
    let mut scenes: Vec<(DateTime<Utc>, usize)> = timestamps
        .into_iter()
        .enumerate()
        .map(|(position, ts)| (ts, position))
        .collect();
    scenes.sort();
    scenes.truncate(max_points.min(DEFAULT_MAX_POINTS));
    debug!(%index, scenes = scenes.len(), "time series planned");

    Ok(TimeSeries {
        service,
        collection,
        profile,
        index,
        region,
        policy,
        pending: scenes.into_iter(),
    })
}
