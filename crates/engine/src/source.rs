//! Satellite sources and their catalog profiles.
//!
//! Each [`Source`] maps to one fixed [`SourceProfile`]: the remote collection
//! identifier, the cloud-cover property used to pre-filter scenes, the band
//! names playing the NIR / red / blue / green roles, and the reflectance
//! scaling applied to raw band values. The profile is resolved once per
//! collection; nothing downstream branches on band names.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use verdex_core::{Error, Result};

use crate::index::VegetationIndex;

// ---------------------------------------------------------------------------
// Source enum
// ---------------------------------------------------------------------------

/// Supported satellite catalogs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Source {
    /// Sentinel-2 MSI surface reflectance.
    #[serde(rename = "Sentinel-2")]
    Sentinel2,
    /// Landsat 8 OLI Collection 2 Level 2.
    #[serde(rename = "Landsat-8")]
    Landsat8,
    /// MODIS 16-day vegetation index composite.
    #[serde(rename = "MODIS")]
    Modis,
}

impl Source {
    pub const ALL: [Source; 3] = [Source::Sentinel2, Source::Landsat8, Source::Modis];

    pub fn name(&self) -> &'static str {
        match self {
            Self::Sentinel2 => "Sentinel-2",
            Self::Landsat8 => "Landsat-8",
            Self::Modis => "MODIS",
        }
    }

    pub fn profile(&self) -> &'static SourceProfile {
        match self {
            Self::Sentinel2 => &SENTINEL2,
            Self::Landsat8 => &LANDSAT8,
            Self::Modis => &MODIS,
        }
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Source {
    type Err = Error;

    /// Accepts display names and the usual shorthands
    /// (`"s2"`, `"sentinel2"`, `"landsat 8"`, `"l8"`, `"modis"`).
    fn from_str(s: &str) -> Result<Self> {
        let key: String = s
            .chars()
            .filter(|c| !matches!(c, '-' | '_' | ' '))
            .collect::<String>()
            .to_lowercase();
        match key.as_str() {
            "sentinel2" | "s2" => Ok(Self::Sentinel2),
            "landsat8" | "l8" | "lc08" => Ok(Self::Landsat8),
            "modis" => Ok(Self::Modis),
            _ => Err(Error::InvalidRequest(format!(
                "unknown source '{s}' (expected Sentinel-2, Landsat-8 or MODIS)"
            ))),
        }
    }
}

// ---------------------------------------------------------------------------
// Profiles
// ---------------------------------------------------------------------------

/// Cloud-cover pre-filter: keep scenes whose `property` is below `max_percent`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CloudCover {
    pub property: &'static str,
    pub max_percent: f64,
}

/// Linear transform from stored band values to surface reflectance.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Scaling {
    pub scale: f64,
    pub offset: f64,
}

impl Scaling {
    pub const IDENTITY: Scaling = Scaling {
        scale: 1.0,
        offset: 0.0,
    };

    pub fn apply(&self, raw: f64) -> f64 {
        raw * self.scale + self.offset
    }

    pub fn is_identity(&self) -> bool {
        *self == Self::IDENTITY
    }
}

/// Band names the profile assigns to each spectral role.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RoleBands {
    pub nir: &'static str,
    pub red: &'static str,
    pub blue: Option<&'static str>,
    pub green: Option<&'static str>,
}

/// An index the catalog ships ready-made as its own band.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PrecomputedBand {
    pub index: VegetationIndex,
    pub band: &'static str,
    pub scale: f64,
}

/// Fixed catalog description for one [`Source`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SourceProfile {
    pub source: Source,
    /// Remote collection identifier.
    pub collection_id: &'static str,
    /// `None` for products that are already cloud-screened composites.
    pub cloud_cover: Option<CloudCover>,
    pub bands: RoleBands,
    pub scaling: Scaling,
    pub precomputed: &'static [PrecomputedBand],
    /// Native ground-sampling distance in metres.
    pub native_scale_m: f64,
}

impl SourceProfile {
    /// Pre-computed band for `index`, if the catalog ships one.
    pub fn precomputed_band(&self, index: VegetationIndex) -> Option<&PrecomputedBand> {
        self.precomputed.iter().find(|p| p.index == index)
    }
}

pub static SENTINEL2: SourceProfile = SourceProfile {
    source: Source::Sentinel2,
    collection_id: "COPERNICUS/S2_SR_HARMONIZED",
    cloud_cover: Some(CloudCover {
        property: "CLOUDY_PIXEL_PERCENTAGE",
        max_percent: 20.0,
    }),
    bands: RoleBands {
        nir: "B8",
        red: "B4",
        blue: Some("B2"),
        green: Some("B3"),
    },
    scaling: Scaling {
        scale: 0.0001,
        offset: 0.0,
    },
    precomputed: &[],
    native_scale_m: 10.0,
};

pub static LANDSAT8: SourceProfile = SourceProfile {
    source: Source::Landsat8,
    collection_id: "LANDSAT/LC08/C02/T1_L2",
    cloud_cover: Some(CloudCover {
        property: "CLOUD_COVER",
        max_percent: 20.0,
    }),
    bands: RoleBands {
        nir: "SR_B5",
        red: "SR_B4",
        blue: Some("SR_B2"),
        green: Some("SR_B3"),
    },
    scaling: Scaling {
        scale: 0.0000275,
        offset: -0.2,
    },
    precomputed: &[],
    native_scale_m: 30.0,
};

pub static MODIS: SourceProfile = SourceProfile {
    source: Source::Modis,
    collection_id: "MODIS/061/MOD13Q1",
    cloud_cover: None,
    bands: RoleBands {
        nir: "sur_refl_b02",
        red: "sur_refl_b01",
        blue: None,
        green: None,
    },
    scaling: Scaling {
        scale: 0.0001,
        offset: 0.0,
    },
    precomputed: &[PrecomputedBand {
        index: VegetationIndex::NDVI,
        band: "NDVI",
        scale: 0.0001,
    }],
    native_scale_m: 250.0,
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_shorthands() {
        assert_eq!("Sentinel-2".parse::<Source>().unwrap(), Source::Sentinel2);
        assert_eq!("s2".parse::<Source>().unwrap(), Source::Sentinel2);
        assert_eq!("Landsat 8".parse::<Source>().unwrap(), Source::Landsat8);
        assert_eq!("landsat_8".parse::<Source>().unwrap(), Source::Landsat8);
        assert_eq!("modis".parse::<Source>().unwrap(), Source::Modis);
        assert!(matches!(
            "spot-6".parse::<Source>(),
            Err(Error::InvalidRequest(_))
        ));
    }

    #[test]
    fn display_round_trips() {
        for source in Source::ALL {
            assert_eq!(source.to_string().parse::<Source>().unwrap(), source);
            assert_eq!(source.profile().source, source);
        }
    }

    #[test]
    fn modis_has_no_cloud_filter() {
        assert!(Source::Modis.profile().cloud_cover.is_none());
        assert!(Source::Sentinel2.profile().cloud_cover.is_some());
        assert!(Source::Landsat8.profile().cloud_cover.is_some());
    }

    #[test]
    fn landsat_scaling() {
        let s = Source::Landsat8.profile().scaling;
        assert!((s.apply(10_000.0) - 0.075).abs() < 1e-12);
        assert!(!s.is_identity());
        assert!(Scaling::IDENTITY.is_identity());
    }

    #[test]
    fn precomputed_lookup() {
        let modis = Source::Modis.profile();
        assert_eq!(modis.precomputed_band(VegetationIndex::NDVI).unwrap().band, "NDVI");
        assert!(modis.precomputed_band(VegetationIndex::EVI).is_none());
        assert!(Source::Sentinel2
            .profile()
            .precomputed_band(VegetationIndex::NDVI)
            .is_none());
    }

    #[test]
    fn serializes_display_names() {
        assert_eq!(serde_json::to_value(Source::Landsat8).unwrap(), "Landsat-8");
        let s: Source = serde_json::from_value(serde_json::json!("MODIS")).unwrap();
        assert_eq!(s, Source::Modis);
    }
}
