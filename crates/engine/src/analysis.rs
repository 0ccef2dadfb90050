//! Analysis orchestrator.
//!
//! [`VegetationEngine::analyze`] runs one request end to end: validate,
//! resolve the collection, composite, compute every requested index, then
//! sample a short time series for one of them.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::Serialize;
use tracing::{debug, info};
use verdex_core::{AdminPath, DateRange, Error, Region, Result};

use crate::band::Unavailable;
use crate::calculator::{compute_index, IndexOutcome};
use crate::config::EngineConfig;
use crate::index::{IndexResult, VegetationIndex};
use crate::maybe_rayon::map_indices;
use crate::resolver::resolve_collection;
use crate::service::RasterService;
use crate::source::Source;
use crate::summary::SeriesSummary;
use crate::timeseries::{sample_time_series, TimeSeriesPoint};

// ---------------------------------------------------------------------------
// Request / report
// ---------------------------------------------------------------------------

/// What to analyze: where, when, which catalog and which indices.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisRequest {
    pub region: Region,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub source: Source,
    /// Requested indices; duplicates are dropped, first occurrence wins.
    pub indices: Vec<VegetationIndex>,
    /// Index to sample over time; the first requested index when `None`.
    pub series_index: Option<VegetationIndex>,
}

impl AnalysisRequest {
    pub fn new(
        region: Region,
        start_date: NaiveDate,
        end_date: NaiveDate,
        source: Source,
        indices: Vec<VegetationIndex>,
    ) -> Self {
        Self {
            region,
            start_date,
            end_date,
            source,
            indices,
            series_index: None,
        }
    }

    pub fn with_series_index(mut self, index: VegetationIndex) -> Self {
        self.series_index = Some(index);
        self
    }

    /// Requested indices without duplicates, in request order.
    pub fn unique_indices(&self) -> Vec<VegetationIndex> {
        let mut seen = Vec::with_capacity(self.indices.len());
        for index in &self.indices {
            if !seen.contains(index) {
                seen.push(*index);
            }
        }
        seen
    }

    fn validate(&self) -> Result<(DateRange, Vec<VegetationIndex>, VegetationIndex)> {
        let dates = DateRange::new(self.start_date, self.end_date)?;
        let indices = self.unique_indices();
        let first = *indices
            .first()
            .ok_or_else(|| Error::InvalidRequest("no vegetation index requested".into()))?;
        let series_index = self.series_index.unwrap_or(first);
        if !indices.contains(&series_index) {
            return Err(Error::InvalidRequest(format!(
                "time-series index {series_index} is not among the requested indices"
            )));
        }
        Ok((dates, indices, series_index))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportStatus {
    Complete,
    /// The filtered collection was empty; nothing was computed.
    NoImagery,
}

/// Result of one analysis.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisReport {
    pub region: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub admin_path: Option<AdminPath>,
    pub source: Source,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub status: ReportStatus,
    pub scene_count: usize,
    pub per_index: BTreeMap<VegetationIndex, IndexResult>,
    pub unavailable: BTreeMap<VegetationIndex, Unavailable>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub series_index: Option<VegetationIndex>,
    pub time_series: Vec<TimeSeriesPoint>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub series_summary: Option<SeriesSummary>,
}

impl AnalysisReport {
    fn empty(request: &AnalysisRequest, status: ReportStatus, scene_count: usize) -> Self {
        Self {
            region: request.region.label().to_string(),
            admin_path: request.region.admin_path().cloned(),
            source: request.source,
            start_date: request.start_date,
            end_date: request.end_date,
            status,
            scene_count,
            per_index: BTreeMap::new(),
            unavailable: BTreeMap::new(),
            series_index: None,
            time_series: Vec::new(),
            series_summary: None,
        }
    }

    pub fn has_imagery(&self) -> bool {
        self.status != ReportStatus::NoImagery
    }
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

/// Runs analyses against one [`RasterService`].
pub struct VegetationEngine<S> {
    service: S,
    config: EngineConfig,
}

impl<S: RasterService> VegetationEngine<S> {
    pub fn new(service: S) -> Self {
        Self {
            service,
            config: EngineConfig::default(),
        }
    }

    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    pub fn service(&self) -> &S {
        &self.service
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Run one analysis.
    ///
    /// Caller errors are reported before the service is contacted. An empty
    /// collection is not an error: the report comes back with
    /// [`ReportStatus::NoImagery`] and nothing else is requested. Any remote
    /// failure while computing indices or listing the series scenes aborts the
    /// analysis with [`Error::DataSource`].
    pub fn analyze(&self, request: &AnalysisRequest) -> Result<AnalysisReport> {
        self.config.validate()?;
        let (dates, indices, series_index) = request.validate()?;
        let profile = request.source.profile();
        let policy = self.config.policy_for(profile);

        info!(
            region = request.region.label(),
            source = %request.source,
            start = %dates.start(),
            end = %dates.end(),
            indices = indices.len(),
            "starting analysis"
        );

        let collection = resolve_collection(
            &self.service,
            profile,
            &dates,
            &request.region,
            self.config.cloud_threshold,
        )?;
        if collection.is_empty() {
            info!(region = request.region.label(), "no imagery found");
            return Ok(AnalysisReport::empty(request, ReportStatus::NoImagery, 0));
        }

        let composite = self.service.composite(&collection.handle)?;
        let band_names = self.service.band_names(&composite)?;
        debug!(image = composite.id(), bands = ?band_names, "composite ready");

        let compute = |index: VegetationIndex| {
            let outcome = compute_index(
                &self.service,
                &composite,
                &band_names,
                profile,
                index,
                &request.region,
                &policy,
            );
            (index, outcome)
        };
        let outcomes: Vec<(VegetationIndex, Result<IndexOutcome>)> =
            map_indices(&indices, self.config.parallel, compute);

        let mut report =
            AnalysisReport::empty(request, ReportStatus::Complete, collection.scene_count);
        for (index, outcome) in outcomes {
            match outcome? {
                IndexOutcome::Computed(result) => {
                    debug!(%index, mean = ?result.mean, "index computed");
                    report.per_index.insert(index, result);
                }
                IndexOutcome::Unavailable(reason) => {
                    info!(%index, source = %request.source, %reason, "index unavailable");
                    report.unavailable.insert(index, reason);
                }
            }
        }

        if report.per_index.contains_key(&series_index) {
            let points: Vec<TimeSeriesPoint> = sample_time_series(
                &self.service,
                &collection.handle,
                profile,
                series_index,
                &request.region,
                policy,
                self.config.series_max_points,
            )?
            .collect();
            report.series_summary = SeriesSummary::from_points(&points);
            report.series_index = Some(series_index);
            report.time_series = points;
        }

        info!(
            scenes = report.scene_count,
            computed = report.per_index.len(),
            unavailable = report.unavailable.len(),
            series_points = report.time_series.len(),
            "analysis complete"
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use verdex_core::BBox;

    fn region() -> Region {
        Region::from_bbox("r", BBox::new(0.0, 0.0, 1.0, 1.0)).unwrap()
    }

    fn date(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    #[test]
    fn duplicates_dropped_in_order() {
        let req = AnalysisRequest::new(
            region(),
            date("2023-01-01"),
            date("2023-02-01"),
            Source::Sentinel2,
            vec![
                VegetationIndex::SAVI,
                VegetationIndex::NDVI,
                VegetationIndex::SAVI,
            ],
        );
        assert_eq!(
            req.unique_indices(),
            vec![VegetationIndex::SAVI, VegetationIndex::NDVI]
        );
        let (_, _, series) = req.validate().unwrap();
        assert_eq!(series, VegetationIndex::SAVI);
    }

    #[test]
    fn series_index_must_be_requested() {
        let req = AnalysisRequest::new(
            region(),
            date("2023-01-01"),
            date("2023-02-01"),
            Source::Sentinel2,
            vec![VegetationIndex::NDVI],
        )
        .with_series_index(VegetationIndex::EVI);
        assert!(matches!(req.validate(), Err(Error::InvalidRequest(_))));
    }

    #[test]
    fn empty_indices_rejected() {
        let req = AnalysisRequest::new(
            region(),
            date("2023-01-01"),
            date("2023-02-01"),
            Source::Modis,
            vec![],
        );
        assert!(matches!(req.validate(), Err(Error::InvalidRequest(_))));
    }
}
