//! # verdex engine
//!
//! Vegetation index analysis over a remote raster-analysis service.
//!
//! The engine never touches pixels itself. It resolves a filtered image
//! collection for a [`Source`], builds one band-math [`Expr`] per
//! [`VegetationIndex`], asks the service to evaluate and reduce it over the
//! region, and samples a short time series. All of this goes through the
//! blocking [`RasterService`] trait; [`MemoryService`] implements it over
//! synthetic scenes for tests and demos.
//!
//! ```no_run
//! use verdex_core::{BBox, Region};
//! use verdex_engine::prelude::*;
//!
//! let region = Region::from_bbox("plot", BBox::new(-47.1, -22.9, -47.0, -22.8))?;
//! let dates = verdex_core::DateRange::parse("2023-01-01", "2023-12-31")?;
//! let engine = VegetationEngine::new(MemoryService::demo(&region, &dates));
//! let request = AnalysisRequest::new(
//!     region,
//!     dates.start(),
//!     dates.end(),
//!     Source::Sentinel2,
//!     vec![VegetationIndex::NDVI, VegetationIndex::EVI],
//! );
//! let report = engine.analyze(&request)?;
//! println!("{:?}", report.per_index);
//! # Ok::<(), verdex_core::Error>(())
//! ```

pub mod analysis;
pub mod band;
pub mod calculator;
pub mod config;
pub mod expr;
pub mod index;
mod maybe_rayon;
pub mod memory;
pub mod resolver;
pub mod service;
pub mod source;
pub mod summary;
pub mod timeseries;

pub use analysis::{AnalysisReport, AnalysisRequest, ReportStatus, VegetationEngine};
pub use band::{select_bands, BandRole, BandRoles, BandSelection, Unavailable};
pub use calculator::{compute_index, evaluate_index, Evaluation, IndexOutcome};
pub use config::{EngineConfig, ReductionPolicy};
pub use expr::Expr;
pub use index::{IndexInfo, IndexResult, VegetationIndex};
pub use memory::{MemoryService, ServiceCall, SyntheticScene};
pub use resolver::{collection_query, resolve_collection, ResolvedCollection};
pub use service::{CollectionFilter, CollectionHandle, CollectionQuery, ImageHandle, RasterService};
pub use source::{Source, SourceProfile};
pub use summary::{SeriesSummary, Trend};
pub use timeseries::{sample_time_series, TimeSeries, TimeSeriesPoint};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::analysis::{AnalysisReport, AnalysisRequest, ReportStatus, VegetationEngine};
    pub use crate::config::{EngineConfig, ReductionPolicy};
    pub use crate::index::{IndexResult, VegetationIndex};
    pub use crate::memory::MemoryService;
    pub use crate::service::RasterService;
    pub use crate::source::Source;
}
