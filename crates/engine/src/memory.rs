//! In-memory [`RasterService`] over synthetic scenes.
//!
//! Scenes are small `ndarray` grids holding stored (unscaled) band values.
//! Every grid is taken to cover the analysis region, so a reduction averages
//! the whole grid. Handles are derived from their inputs, so the same query or
//! expression always yields the same handle.
//!
//! Besides backing the CLI `--demo` mode, the service records every call and
//! can inject failures, which the engine tests rely on.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::f64::consts::PI;

use chrono::{DateTime, Datelike, Days, NaiveTime, TimeZone, Utc};
use ndarray::Array2;
use parking_lot::Mutex;
use verdex_core::{BBox, DateRange, Error, Region, Result};

use crate::config::ReductionPolicy;
use crate::expr::{evaluate_grid, Expr};
use crate::service::{CollectionFilter, CollectionHandle, CollectionQuery, ImageHandle, RasterService};
use crate::source::{Source, SourceProfile};

/// Grid shape used by [`SyntheticScene::with_constant_band`].
pub const GRID_SHAPE: (usize, usize) = (4, 4);

/// Name of the single band produced by [`RasterService::evaluate`].
pub const RESULT_BAND: &str = "value";

type Bands = BTreeMap<String, Array2<f64>>;

// ---------------------------------------------------------------------------
// Scenes
// ---------------------------------------------------------------------------

/// One acquisition in a synthetic catalog.
#[derive(Debug, Clone, PartialEq)]
pub struct SyntheticScene {
    pub id: String,
    pub timestamp: DateTime<Utc>,
    pub footprint: BBox,
    pub properties: BTreeMap<String, f64>,
    pub bands: Bands,
}

impl SyntheticScene {
    pub fn new(id: impl Into<String>, timestamp: DateTime<Utc>, footprint: BBox) -> Self {
        Self {
            id: id.into(),
            timestamp,
            footprint,
            properties: BTreeMap::new(),
            bands: BTreeMap::new(),
        }
    }

    pub fn with_band(mut self, name: impl Into<String>, grid: Array2<f64>) -> Self {
        self.bands.insert(name.into(), grid);
        self
    }

    /// Band with the same value in every pixel of a [`GRID_SHAPE`] grid.
    pub fn with_constant_band(self, name: impl Into<String>, value: f64) -> Self {
        self.with_band(name, Array2::from_elem(GRID_SHAPE, value))
    }

    pub fn with_property(mut self, name: impl Into<String>, value: f64) -> Self {
        self.properties.insert(name.into(), value);
        self
    }

    fn matches(&self, filter: &CollectionFilter) -> bool {
        match filter {
            CollectionFilter::Date {
                start,
                end_exclusive,
            } => {
                let day = self.timestamp.date_naive();
                day >= *start && day < *end_exclusive
            }
            CollectionFilter::Bounds { bbox, .. } => self.footprint.intersects(bbox),
            CollectionFilter::PropertyLessThan { property, value } => self
                .properties
                .get(property)
                .is_some_and(|v| *v < *value),
        }
    }
}

// ---------------------------------------------------------------------------
// Call log
// ---------------------------------------------------------------------------

/// Service operations, as recorded in the call log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ServiceCall {
    FilterCollection,
    CollectionSize,
    Composite,
    BandNames,
    Evaluate,
    ReduceMean,
    SceneTimestamps,
    ImageAt,
}

#[derive(Debug, Default)]
struct State {
    calls: Vec<ServiceCall>,
    failures: HashMap<ServiceCall, String>,
    failing_images: HashSet<String>,
    reductions: Vec<ReductionPolicy>,
    /// Query fingerprint → collection handle id.
    queries: HashMap<String, String>,
    /// Collection handle id → scene indices into the catalog, in catalog order.
    collections: HashMap<String, (String, Vec<usize>)>,
    images: HashMap<String, Bands>,
}

/// Deterministic in-memory raster service.
#[derive(Debug, Default)]
pub struct MemoryService {
    catalogs: BTreeMap<String, Vec<SyntheticScene>>,
    state: Mutex<State>,
}

impl MemoryService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a scene to `collection_id`. Collection order is insertion order.
    pub fn add_scene(&mut self, collection_id: impl Into<String>, scene: SyntheticScene) {
        self.state
            .get_mut()
            .images
            .insert(scene_image_id(&scene.id), scene.bands.clone());
        self.catalogs
            .entry(collection_id.into())
            .or_default()
            .push(scene);
    }

    pub fn with_scene(mut self, collection_id: impl Into<String>, scene: SyntheticScene) -> Self {
        self.add_scene(collection_id, scene);
        self
    }

    /// Make every future `call` fail with `message`.
    pub fn fail_on(&self, call: ServiceCall, message: impl Into<String>) {
        self.state.lock().failures.insert(call, message.into());
    }

    /// Make band listing and evaluation fail for one scene.
    pub fn fail_image(&self, scene_id: &str) {
        self.state.lock().failing_images.insert(scene_image_id(scene_id));
    }

    pub fn calls(&self) -> Vec<ServiceCall> {
        self.state.lock().calls.clone()
    }

    pub fn call_count(&self) -> usize {
        self.state.lock().calls.len()
    }

    pub fn count(&self, call: ServiceCall) -> usize {
        self.state.lock().calls.iter().filter(|c| **c == call).count()
    }

    /// Policies passed to every `reduce_mean` call so far.
    pub fn reductions(&self) -> Vec<ReductionPolicy> {
        self.state.lock().reductions.clone()
    }

    pub fn scenes(&self, collection_id: &str) -> &[SyntheticScene] {
        self.catalogs
            .get(collection_id)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Log `call` and return the injected failure for it, if any.
    fn enter(&self, state: &mut State, call: ServiceCall) -> Result<()> {
        state.calls.push(call);
        match state.failures.get(&call) {
            Some(message) => Err(Error::data_source(message.clone())),
            None => Ok(()),
        }
    }

    fn image_bands<'s>(state: &'s State, image: &ImageHandle) -> Result<&'s Bands> {
        if state.failing_images.contains(image.id()) {
            return Err(Error::data_source(format!(
                "image '{}' could not be read",
                image.id()
            )));
        }
        state
            .images
            .get(image.id())
            .ok_or_else(|| Error::data_source(format!("unknown image '{}'", image.id())))
    }

    fn collection_scenes<'s>(
        state: &'s State,
        collection: &CollectionHandle,
    ) -> Result<(&'s str, &'s [usize])> {
        state
            .collections
            .get(collection.id())
            .map(|(catalog, members)| (catalog.as_str(), members.as_slice()))
            .ok_or_else(|| {
                Error::data_source(format!("unknown collection '{}'", collection.id()))
            })
    }
}

fn scene_image_id(scene_id: &str) -> String {
    format!("scene/{scene_id}")
}

impl RasterService for MemoryService {
    fn filter_collection(&self, query: &CollectionQuery) -> Result<CollectionHandle> {
        let mut state = self.state.lock();
        self.enter(&mut state, ServiceCall::FilterCollection)?;

        let scenes = self.catalogs.get(&query.collection_id).ok_or_else(|| {
            Error::data_source(format!(
                "image collection '{}' not found",
                query.collection_id
            ))
        })?;

        let fingerprint = query.fingerprint();
        if let Some(id) = state.queries.get(&fingerprint) {
            return Ok(CollectionHandle::new(id.clone(), query.clone()));
        }

        let members: Vec<usize> = scenes
            .iter()
            .enumerate()
            .filter(|(_, scene)| query.filters.iter().all(|f| scene.matches(f)))
            .map(|(i, _)| i)
            .collect();

        let id = format!("collection/{}", state.queries.len());
        state.queries.insert(fingerprint, id.clone());
        state
            .collections
            .insert(id.clone(), (query.collection_id.clone(), members));
        Ok(CollectionHandle::new(id, query.clone()))
    }

    fn collection_size(&self, collection: &CollectionHandle) -> Result<usize> {
        let mut state = self.state.lock();
        self.enter(&mut state, ServiceCall::CollectionSize)?;
        Ok(Self::collection_scenes(&state, collection)?.1.len())
    }

    fn composite(&self, collection: &CollectionHandle) -> Result<ImageHandle> {
        let mut state = self.state.lock();
        self.enter(&mut state, ServiceCall::Composite)?;

        let id = format!("{}/median", collection.id());
        if state.images.contains_key(&id) {
            return Ok(ImageHandle::new(id));
        }

        let (catalog, members) = Self::collection_scenes(&state, collection)?;
        let scenes: Vec<&SyntheticScene> = members
            .iter()
            .filter_map(|i| self.catalogs.get(catalog).and_then(|c| c.get(*i)))
            .collect();
        let bands = median_composite(&scenes)?;
        state.images.insert(id.clone(), bands);
        Ok(ImageHandle::new(id))
    }

    fn band_names(&self, image: &ImageHandle) -> Result<Vec<String>> {
        let mut state = self.state.lock();
        self.enter(&mut state, ServiceCall::BandNames)?;
        Ok(Self::image_bands(&state, image)?.keys().cloned().collect())
    }

    fn evaluate(&self, image: &ImageHandle, expression: &Expr) -> Result<ImageHandle> {
        let mut state = self.state.lock();
        self.enter(&mut state, ServiceCall::Evaluate)?;

        let id = format!("{}|{}", image.id(), expression);
        if state.images.contains_key(&id) {
            return Ok(ImageHandle::new(id));
        }

        let bands = Self::image_bands(&state, image)?;
        let grid = evaluate_grid(expression, bands).map_err(|e| Error::data_source(e.to_string()))?;
        state
            .images
            .insert(id.clone(), BTreeMap::from([(RESULT_BAND.to_string(), grid)]));
        Ok(ImageHandle::new(id))
    }

    fn reduce_mean(
        &self,
        image: &ImageHandle,
        _region: &Region,
        policy: &ReductionPolicy,
    ) -> Result<Option<f64>> {
        let mut state = self.state.lock();
        self.enter(&mut state, ServiceCall::ReduceMean)?;
        state.reductions.push(*policy);

        let bands = Self::image_bands(&state, image)?;
        let mut grids = bands.values();
        let grid = match (grids.next(), grids.next()) {
            (Some(grid), None) => grid,
            _ => {
                return Err(Error::data_source(format!(
                    "mean reduction expects a single-band image, got {} bands",
                    bands.len()
                )))
            }
        };
        region_mean(grid, policy)
    }

    fn scene_timestamps(&self, collection: &CollectionHandle) -> Result<Vec<DateTime<Utc>>> {
        let mut state = self.state.lock();
        self.enter(&mut state, ServiceCall::SceneTimestamps)?;
        let (catalog, members) = Self::collection_scenes(&state, collection)?;
        let scenes = self.scenes(catalog);
        Ok(members
            .iter()
            .filter_map(|i| scenes.get(*i))
            .map(|s| s.timestamp)
            .collect())
    }

    fn image_at(&self, collection: &CollectionHandle, position: usize) -> Result<ImageHandle> {
        let mut state = self.state.lock();
        self.enter(&mut state, ServiceCall::ImageAt)?;
        let (catalog, members) = Self::collection_scenes(&state, collection)?;
        let scene = members
            .get(position)
            .and_then(|i| self.scenes(catalog).get(*i))
            .ok_or_else(|| {
                Error::data_source(format!(
                    "position {position} out of range for collection of {}",
                    members.len()
                ))
            })?;
        Ok(ImageHandle::new(scene_image_id(&scene.id)))
    }
}

// ---------------------------------------------------------------------------
// Reducers
// ---------------------------------------------------------------------------

/// Per-band, per-pixel median over `scenes`, skipping NaN.
fn median_composite(scenes: &[&SyntheticScene]) -> Result<Bands> {
    let names: BTreeSet<&String> = scenes.iter().flat_map(|s| s.bands.keys()).collect();
    let mut out = Bands::new();

    for name in names {
        let grids: Vec<&Array2<f64>> = scenes.iter().filter_map(|s| s.bands.get(name)).collect();
        let shape = grids[0].dim();
        if grids.iter().any(|g| g.dim() != shape) {
            return Err(Error::data_source(format!(
                "band '{name}' has inconsistent grid shapes across scenes"
            )));
        }

        let mut values = Vec::with_capacity(grids.len());
        let composite = Array2::from_shape_fn(shape, |(r, c)| {
            values.clear();
            values.extend(grids.iter().map(|g| g[[r, c]]).filter(|v| !v.is_nan()));
            median(&mut values)
        });
        out.insert(name.clone(), composite);
    }
    Ok(out)
}

fn median(values: &mut [f64]) -> f64 {
    let count = values.len();
    if count == 0 {
        return f64::NAN;
    }
    values.sort_by(f64::total_cmp);
    if count % 2 == 0 {
        (values[count / 2 - 1] + values[count / 2]) / 2.0
    } else {
        values[count / 2]
    }
}

/// Mean of the non-NaN pixels of `grid` under the policy's pixel cap.
///
/// Over the cap, `best_effort` samples every n-th row and column, with n the
/// smallest stride that reads at most `max_pixels`; otherwise the reduction fails.
fn region_mean(grid: &Array2<f64>, policy: &ReductionPolicy) -> Result<Option<f64>> {
    let pixels = grid.len() as f64;
    let stride = if pixels > policy.max_pixels {
        if !policy.best_effort {
            return Err(Error::data_source(format!(
                "too many pixels in the region: {pixels} > maxPixels {}",
                policy.max_pixels
            )));
        }
        sample_stride(grid.dim(), policy.max_pixels)
    } else {
        1
    };

    let (mut sum, mut count) = (0.0, 0usize);
    for ((r, c), v) in grid.indexed_iter() {
        if r % stride != 0 || c % stride != 0 || v.is_nan() {
            continue;
        }
        sum += v;
        count += 1;
    }
    Ok((count > 0).then(|| sum / count as f64))
}

/// Smallest stride whose sampled lattice holds at most `max_pixels` pixels.
///
/// A stride of `max(rows, cols)` reads a single pixel, so the search ends there.
fn sample_stride((rows, cols): (usize, usize), max_pixels: f64) -> usize {
    let limit = rows.max(cols).max(1);
    let estimate = ((rows * cols) as f64 / max_pixels).sqrt().floor() as usize;
    (estimate.clamp(1, limit)..limit)
        .find(|s| (rows.div_ceil(*s) * cols.div_ceil(*s)) as f64 <= max_pixels)
        .unwrap_or(limit)
}

// ---------------------------------------------------------------------------
// Demo catalogs
// ---------------------------------------------------------------------------

/// Maximum scenes generated per catalog by [`MemoryService::demo`].
const DEMO_MAX_SCENES: u64 = 48;

impl MemoryService {
    /// Synthetic catalogs for every [`Source`], with a seasonal vegetation
    /// cycle over `dates` and footprints covering `region`.
    ///
    /// Every fourth optical scene is cloudy and falls out of the default
    /// cloud filter.
    pub fn demo(region: &Region, dates: &DateRange) -> Self {
        let mut service = Self::new();
        let b = region.bbox();
        let footprint = BBox::new(b.min_x - 0.5, b.min_y - 0.5, b.max_x + 0.5, b.max_y + 0.5);

        for source in Source::ALL {
            let profile = source.profile();
            let revisit: u64 = match source {
                Source::Sentinel2 => 5,
                Source::Landsat8 | Source::Modis => 16,
            };
            let days = dates.days().max(1) as u64;
            let step = revisit.max(days.div_ceil(DEMO_MAX_SCENES));

            let acquired = NaiveTime::from_hms_opt(10, 30, 0).unwrap_or(NaiveTime::MIN);
            let mut day = dates.start();
            let mut n = 0u64;
            while day <= dates.end() {
                let timestamp = Utc.from_utc_datetime(&day.and_time(acquired));
                let cloud = if n % 4 == 3 { 45.0 } else { ((n * 7) % 19) as f64 };
                service.add_scene(
                    profile.collection_id,
                    demo_scene(profile, n, timestamp, footprint, cloud),
                );
                n += 1;
                match day.checked_add_days(Days::new(step)) {
                    Some(next) => day = next,
                    None => break,
                }
            }
        }
        service
    }
}

fn demo_scene(
    profile: &SourceProfile,
    n: u64,
    timestamp: DateTime<Utc>,
    footprint: BBox,
    cloud: f64,
) -> SyntheticScene {
    let season = 0.5 + 0.5 * (2.0 * PI * f64::from(timestamp.ordinal()) / 365.0).sin();
    let nir = 0.25 + 0.2 * season;
    let red = 0.08 - 0.04 * season;
    let green = 0.07;
    let blue = 0.04;

    let stored = |reflectance: f64| (reflectance - profile.scaling.offset) / profile.scaling.scale;
    let grid = |reflectance: f64| {
        Array2::from_shape_fn((8, 8), |(r, c)| {
            let texture = 1.0 + 0.02 * ((r + c) as f64 - 7.0) / 7.0;
            stored(reflectance * texture)
        })
    };

    let id = format!("{}_{n:03}", profile.source.name().replace('-', "").to_lowercase());
    let mut scene = SyntheticScene::new(id, timestamp, footprint)
        .with_band(profile.bands.nir, grid(nir))
        .with_band(profile.bands.red, grid(red));
    if let Some(band) = profile.bands.blue {
        scene = scene.with_band(band, grid(blue));
    }
    if let Some(band) = profile.bands.green {
        scene = scene.with_band(band, grid(green));
    }
    for pre in profile.precomputed {
        let ndvi = (nir - red) / (nir + red);
        scene = scene.with_band(pre.band, Array2::from_elem((8, 8), ndvi / pre.scale));
    }
    if let Some(cc) = profile.cloud_cover {
        scene = scene.with_property(cc.property, cloud);
    }
    scene
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use ndarray::array;

    fn at(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, 10, 0, 0).unwrap()
    }

    fn area() -> BBox {
        BBox::new(0.0, 0.0, 1.0, 1.0)
    }

    fn region() -> Region {
        Region::from_bbox("r", area()).unwrap()
    }

    fn query(filters: Vec<CollectionFilter>) -> CollectionQuery {
        CollectionQuery {
            collection_id: "C".into(),
            filters,
        }
    }

    fn service() -> MemoryService {
        MemoryService::new()
            .with_scene(
                "C",
                SyntheticScene::new("a", at(2023, 1, 10), area())
                    .with_band("X", array![[1.0, 2.0], [3.0, f64::NAN]])
                    .with_property("CLOUD", 5.0),
            )
            .with_scene(
                "C",
                SyntheticScene::new("b", at(2023, 2, 10), area())
                    .with_band("X", array![[3.0, 4.0], [5.0, f64::NAN]])
                    .with_property("CLOUD", 50.0),
            )
            .with_scene(
                "C",
                SyntheticScene::new("c", at(2023, 3, 10), BBox::new(10.0, 10.0, 11.0, 11.0))
                    .with_band("X", array![[5.0, 6.0], [7.0, f64::NAN]]),
            )
    }

    #[test]
    fn filters_compose() {
        let s = service();
        let date = CollectionFilter::Date {
            start: NaiveDate::from_ymd_opt(2023, 1, 1).unwrap(),
            end_exclusive: NaiveDate::from_ymd_opt(2023, 2, 10).unwrap(),
        };
        let h = s.filter_collection(&query(vec![date])).unwrap();
        assert_eq!(s.collection_size(&h).unwrap(), 1);

        let bounds = CollectionFilter::Bounds {
            bbox: area(),
            geometry: serde_json::Value::Null,
        };
        let h = s.filter_collection(&query(vec![bounds.clone()])).unwrap();
        assert_eq!(s.collection_size(&h).unwrap(), 2);

        let cloud = CollectionFilter::PropertyLessThan {
            property: "CLOUD".into(),
            value: 20.0,
        };
        let h = s.filter_collection(&query(vec![bounds, cloud])).unwrap();
        assert_eq!(s.collection_size(&h).unwrap(), 1);
    }

    #[test]
    fn same_query_same_handle() {
        let s = service();
        let a = s.filter_collection(&query(vec![])).unwrap();
        let b = s.filter_collection(&query(vec![])).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn unknown_collection_is_data_source_error() {
        let s = service();
        let q = CollectionQuery::new("NOPE");
        assert!(matches!(
            s.filter_collection(&q),
            Err(Error::DataSource { .. })
        ));
    }

    #[test]
    fn median_composite_skips_nan() {
        let s = service();
        let h = s.filter_collection(&query(vec![])).unwrap();
        let img = s.composite(&h).unwrap();
        assert_eq!(s.band_names(&img).unwrap(), vec!["X".to_string()]);

        let policy = ReductionPolicy {
            scale_m: 10.0,
            max_pixels: 1e9,
            best_effort: true,
        };
        // Medians 3, 4, 5 and a NaN pixel.
        let mean = s.reduce_mean(&img, &region(), &policy).unwrap().unwrap();
        assert!((mean - 4.0).abs() < 1e-12);
    }

    #[test]
    fn evaluate_and_reduce() {
        let s = service();
        let h = s.filter_collection(&query(vec![])).unwrap();
        let scene = s.image_at(&h, 0).unwrap();
        let doubled = s.evaluate(&scene, &(Expr::band("X") * 2.0)).unwrap();
        assert_eq!(s.band_names(&doubled).unwrap(), vec![RESULT_BAND.to_string()]);
        let policy = ReductionPolicy {
            scale_m: 10.0,
            max_pixels: 1e9,
            best_effort: true,
        };
        let mean = s.reduce_mean(&doubled, &region(), &policy).unwrap().unwrap();
        assert!((mean - 4.0).abs() < 1e-12);
        assert_eq!(s.reductions(), vec![policy]);
    }

    #[test]
    fn all_nan_is_no_data() {
        let s = MemoryService::new().with_scene(
            "C",
            SyntheticScene::new("n", at(2023, 1, 1), area()).with_constant_band("X", f64::NAN),
        );
        let h = s.filter_collection(&query(vec![])).unwrap();
        let img = s.image_at(&h, 0).unwrap();
        let policy = ReductionPolicy {
            scale_m: 10.0,
            max_pixels: 1e9,
            best_effort: true,
        };
        assert_eq!(s.reduce_mean(&img, &region(), &policy).unwrap(), None);
    }

    #[test]
    fn pixel_cap() {
        let grid = Array2::from_shape_fn((10, 10), |(r, _)| r as f64);
        let strict = ReductionPolicy {
            scale_m: 10.0,
            max_pixels: 25.0,
            best_effort: false,
        };
        assert!(region_mean(&grid, &strict).is_err());

        let relaxed = ReductionPolicy {
            best_effort: true,
            ..strict
        };
        // Stride 2 keeps rows 0, 2, 4, 6, 8.
        let mean = region_mean(&grid, &relaxed).unwrap().unwrap();
        assert!((mean - 4.0).abs() < 1e-12);
    }

    #[test]
    fn best_effort_sampling_respects_cap_on_narrow_grids() {
        assert_eq!(sample_stride((5, 1), 2.0), 3);
        assert_eq!(sample_stride((10, 10), 25.0), 2);
        assert_eq!(sample_stride((7, 3), 0.5), 7);

        // Rows 0 and 3 of a 5x1 column.
        let grid = Array2::from_shape_fn((5, 1), |(r, _)| r as f64);
        let policy = ReductionPolicy {
            scale_m: 10.0,
            max_pixels: 2.0,
            best_effort: true,
        };
        let mean = region_mean(&grid, &policy).unwrap().unwrap();
        assert!((mean - 1.5).abs() < 1e-12);

        for (rows, cols, cap) in [(5, 1, 2.0), (1, 9, 4.0), (13, 6, 10.0), (100, 3, 7.0)] {
            let s = sample_stride((rows, cols), cap);
            assert!((rows.div_ceil(s) * cols.div_ceil(s)) as f64 <= cap);
            if s > 1 {
                let t = s - 1;
                assert!((rows.div_ceil(t) * cols.div_ceil(t)) as f64 > cap);
            }
        }
    }

    #[test]
    fn injected_failures() {
        let s = service();
        s.fail_on(ServiceCall::CollectionSize, "quota exceeded");
        let h = s.filter_collection(&query(vec![])).unwrap();
        assert_eq!(
            s.collection_size(&h),
            Err(Error::data_source("quota exceeded"))
        );

        s.fail_image("b");
        let img = s.image_at(&h, 1).unwrap();
        assert!(s.band_names(&img).is_err());
        assert_eq!(s.count(ServiceCall::ImageAt), 1);
        assert_eq!(s.call_count(), 4);
    }

    #[test]
    fn timestamps_in_catalog_order() {
        let s = service();
        let h = s.filter_collection(&query(vec![])).unwrap();
        let ts = s.scene_timestamps(&h).unwrap();
        assert_eq!(ts, vec![at(2023, 1, 10), at(2023, 2, 10), at(2023, 3, 10)]);
        assert!(s.image_at(&h, 3).is_err());
    }

    #[test]
    fn demo_has_all_catalogs() {
        let dates = DateRange::parse("2023-01-01", "2023-12-31").unwrap();
        let s = MemoryService::demo(&region(), &dates);
        for source in Source::ALL {
            let scenes = s.scenes(source.profile().collection_id);
            assert!(!scenes.is_empty(), "{source} has no scenes");
            assert!(scenes.len() as u64 <= DEMO_MAX_SCENES + 1);
        }
        let s2 = s.scenes(Source::Sentinel2.profile().collection_id);
        assert!(s2.iter().any(|sc| sc.properties["CLOUDY_PIXEL_PERCENTAGE"] >= 20.0));
        assert!(s.scenes("MODIS/061/MOD13Q1")[0].bands.contains_key("NDVI"));
    }
}
