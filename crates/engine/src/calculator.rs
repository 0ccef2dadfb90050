//! Per-image index evaluation: band selection → expression → region mean.

use tracing::debug;
use verdex_core::{Region, Result};

use crate::band::{select_bands, Unavailable};
use crate::config::ReductionPolicy;
use crate::index::{IndexResult, VegetationIndex};
use crate::service::{ImageHandle, RasterService};
use crate::source::SourceProfile;

/// Outcome of evaluating one index on one image.
#[derive(Debug, Clone, PartialEq)]
pub enum Evaluation {
    /// Region mean, `None` when the service returned no statistic.
    Value(Option<f64>),
    /// The image lacks bands the index needs.
    Unavailable(Unavailable),
}

/// Evaluate `index` on `image` and reduce it to a mean over `region`.
///
/// `band_names` must be the image's band list; callers that evaluate several
/// indices on one image fetch it once. Non-finite statistics come back as
/// `Value(None)`.
pub fn evaluate_index<S: RasterService + ?Sized>(
    service: &S,
    image: &ImageHandle,
    band_names: &[String],
    profile: &SourceProfile,
    index: VegetationIndex,
    region: &Region,
    policy: &ReductionPolicy,
) -> Result<Evaluation> {
    let selection = select_bands(profile, index, band_names);
    let expression = match index.expression(&selection) {
        Ok(expression) => expression,
        Err(unavailable) => {
            debug!(%index, image = image.id(), %unavailable, "index unavailable");
            return Ok(Evaluation::Unavailable(unavailable));
        }
    };

    debug!(%index, image = image.id(), %expression, "evaluating");
    let index_image = service.evaluate(image, &expression)?;
    let mean = service
        .reduce_mean(&index_image, region, policy)?
        .filter(|v| v.is_finite());
    Ok(Evaluation::Value(mean))
}

/// Per-index outcome on the composite, as stored in the report.
#[derive(Debug, Clone, PartialEq)]
pub enum IndexOutcome {
    Computed(IndexResult),
    Unavailable(Unavailable),
}

/// [`evaluate_index`] wrapped with the index's static metadata.
pub fn compute_index<S: RasterService + ?Sized>(
    service: &S,
    image: &ImageHandle,
    band_names: &[String],
    profile: &SourceProfile,
    index: VegetationIndex,
    region: &Region,
    policy: &ReductionPolicy,
) -> Result<IndexOutcome> {
    Ok(
        match evaluate_index(service, image, band_names, profile, index, region, policy)? {
            Evaluation::Value(mean) => IndexOutcome::Computed(IndexResult::new(index, mean)),
            Evaluation::Unavailable(u) => IndexOutcome::Unavailable(u),
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::{MemoryService, ServiceCall, SyntheticScene};
    use crate::service::CollectionQuery;
    use crate::source::Source;
    use chrono::{TimeZone, Utc};
    use verdex_core::BBox;

    fn setup(scene: SyntheticScene, collection: &str) -> (MemoryService, ImageHandle, Vec<String>) {
        let service = MemoryService::new().with_scene(collection, scene);
        let handle = service
            .filter_collection(&CollectionQuery::new(collection))
            .unwrap();
        let image = service.image_at(&handle, 0).unwrap();
        let bands = service.band_names(&image).unwrap();
        (service, image, bands)
    }

    fn scene() -> SyntheticScene {
        SyntheticScene::new(
            "s",
            Utc.with_ymd_and_hms(2023, 6, 1, 0, 0, 0).unwrap(),
            BBox::new(0.0, 0.0, 1.0, 1.0),
        )
    }

    fn region() -> Region {
        Region::from_bbox("r", BBox::new(0.0, 0.0, 1.0, 1.0)).unwrap()
    }

    #[test]
    fn computes_mean_with_metadata() {
        let s = scene()
            .with_constant_band("B8", 8000.0)
            .with_constant_band("B4", 2000.0);
        let (service, image, bands) = setup(s, "COPERNICUS/S2_SR_HARMONIZED");
        let profile = Source::Sentinel2.profile();
        let outcome = compute_index(
            &service,
            &image,
            &bands,
            profile,
            VegetationIndex::NDVI,
            &region(),
            &ReductionPolicy::native(profile),
        )
        .unwrap();
        match outcome {
            IndexOutcome::Computed(r) => {
                assert!((r.mean.unwrap() - 0.6).abs() < 1e-9);
                assert_eq!(r.valid_range, (-1.0, 1.0));
                assert_eq!(r.is_healthy(), Some(true));
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
        assert_eq!(service.reductions()[0].scale_m, 10.0);
    }

    #[test]
    fn unavailable_makes_no_remote_calls() {
        let s = scene()
            .with_constant_band("sur_refl_b01", 2000.0)
            .with_constant_band("sur_refl_b02", 8000.0);
        let (service, image, bands) = setup(s, "MODIS/061/MOD13Q1");
        let before = service.call_count();
        let profile = Source::Modis.profile();
        let eval = evaluate_index(
            &service,
            &image,
            &bands,
            profile,
            VegetationIndex::EVI,
            &region(),
            &ReductionPolicy::native(profile),
        )
        .unwrap();
        assert!(matches!(eval, Evaluation::Unavailable(_)));
        assert_eq!(service.call_count(), before);
    }

    #[test]
    fn masked_region_is_no_data_not_zero() {
        let s = scene()
            .with_constant_band("B8", f64::NAN)
            .with_constant_band("B4", f64::NAN);
        let (service, image, bands) = setup(s, "COPERNICUS/S2_SR_HARMONIZED");
        let profile = Source::Sentinel2.profile();
        let eval = evaluate_index(
            &service,
            &image,
            &bands,
            profile,
            VegetationIndex::NDVI,
            &region(),
            &ReductionPolicy::native(profile),
        )
        .unwrap();
        assert_eq!(eval, Evaluation::Value(None));
    }

    #[test]
    fn service_failure_propagates() {
        let s = scene()
            .with_constant_band("B8", 8000.0)
            .with_constant_band("B4", 2000.0);
        let (service, image, bands) = setup(s, "COPERNICUS/S2_SR_HARMONIZED");
        service.fail_on(ServiceCall::ReduceMean, "computation timed out");
        let profile = Source::Sentinel2.profile();
        let err = evaluate_index(
            &service,
            &image,
            &bands,
            profile,
            VegetationIndex::NDVI,
            &region(),
            &ReductionPolicy::native(profile),
        )
        .unwrap_err();
        assert_eq!(err.to_string(), "service error: computation timed out");
    }
}
