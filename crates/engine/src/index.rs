//! Spectral vegetation and water indices
//!
//! Builds the per-pixel band-math expression for each supported index from
//! a [`BandSelection`], and carries the static metadata (valid range,
//! informational "healthy" range, description) reported with every result.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use verdex_core::{Error, Result};

use crate::band::{BandRole, BandRoles, BandSelection, Unavailable};
use crate::expr::Expr;
use crate::source::Scaling;

/// Enumeration of supported spectral indices
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum VegetationIndex {
    /// Normalized Difference Vegetation Index
    NDVI,
    /// Enhanced Vegetation Index
    EVI,
    /// Soil Adjusted Vegetation Index
    SAVI,
    /// Normalized Difference Water Index (McFeeters)
    NDWI,
}

/// Static description of an index.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct IndexInfo {
    pub valid_range: (f64, f64),
    /// Reference band for healthy vegetation. Informational only.
    pub healthy_range: (f64, f64),
    pub description: &'static str,
}

impl VegetationIndex {
    pub const ALL: [VegetationIndex; 4] = [Self::NDVI, Self::EVI, Self::SAVI, Self::NDWI];

    pub fn name(&self) -> &'static str {
        match self {
            Self::NDVI => "NDVI",
            Self::EVI => "EVI",
            Self::SAVI => "SAVI",
            Self::NDWI => "NDWI",
        }
    }

    /// Roles that must resolve to a band for the index to be computable.
    pub fn required_roles(&self) -> &'static [BandRole] {
        match self {
            Self::NDVI | Self::SAVI => &[BandRole::Nir, BandRole::Red],
            Self::EVI => &[BandRole::Nir, BandRole::Red, BandRole::Blue],
            Self::NDWI => &[BandRole::Green, BandRole::Nir],
        }
    }

    pub fn info(&self) -> IndexInfo {
        match self {
            Self::NDVI => IndexInfo {
                valid_range: (-1.0, 1.0),
                healthy_range: (0.3, 0.8),
                description: "Normalized Difference Vegetation Index: (NIR - Red) / (NIR + Red). \
                              Dense vegetation 0.6-0.9, sparse 0.2-0.5, water and clouds below 0.",
            },
            Self::EVI => IndexInfo {
                valid_range: (-1.0, 1.0),
                healthy_range: (0.2, 0.8),
                description: "Enhanced Vegetation Index: 2.5 * (NIR - Red) / (NIR + 6 Red - 7.5 Blue + 1). \
                              Less saturated than NDVI over dense canopy, corrects for aerosols.",
            },
            Self::SAVI => IndexInfo {
                valid_range: (-1.5, 1.5),
                healthy_range: (0.2, 0.6),
                description: "Soil Adjusted Vegetation Index: ((NIR - Red) / (NIR + Red + 0.5)) * 1.5. \
                              Minimizes soil brightness effects in sparse vegetation.",
            },
            Self::NDWI => IndexInfo {
                valid_range: (-1.0, 1.0),
                healthy_range: (-0.3, 0.2),
                description: "Normalized Difference Water Index (McFeeters): (Green - NIR) / (Green + NIR). \
                              Positive over open water, negative over vegetation and soil.",
            },
        }
    }

    /// Build the index expression for a band selection.
    ///
    /// Returns the selection's [`Unavailable`] record when bands are missing.
    pub fn expression(&self, selection: &BandSelection) -> std::result::Result<Expr, Unavailable> {
        match selection {
            BandSelection::Unavailable(u) => Err(u.clone()),
            BandSelection::Precomputed { band, scale } => Ok(scaled(band, Scaling {
                scale: *scale,
                offset: 0.0,
            })),
            BandSelection::Bands { roles, scaling } => {
                let role = |r: BandRole| reflectance(roles, r, *scaling);
                match self {
                    Self::NDVI => Ok(ndvi(role(BandRole::Nir)?, role(BandRole::Red)?)),
                    Self::EVI => Ok(evi(
                        role(BandRole::Nir)?,
                        role(BandRole::Red)?,
                        role(BandRole::Blue)?,
                        &EviParams::default(),
                    )),
                    Self::SAVI => Ok(savi(
                        role(BandRole::Nir)?,
                        role(BandRole::Red)?,
                        &SaviParams::default(),
                    )),
                    Self::NDWI => Ok(ndwi(role(BandRole::Green)?, role(BandRole::Nir)?)),
                }
            }
        }
    }
}

impl fmt::Display for VegetationIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for VegetationIndex {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_uppercase().as_str() {
            "NDVI" => Ok(Self::NDVI),
            "EVI" => Ok(Self::EVI),
            "SAVI" => Ok(Self::SAVI),
            "NDWI" => Ok(Self::NDWI),
            _ => Err(Error::InvalidRequest(format!(
                "unknown index '{s}' (expected NDVI, EVI, SAVI or NDWI)"
            ))),
        }
    }
}

fn scaled(band: &str, scaling: Scaling) -> Expr {
    let mut e = Expr::band(band);
    if scaling.scale != 1.0 {
        e = e * scaling.scale;
    }
    if scaling.offset > 0.0 {
        e = e + scaling.offset;
    } else if scaling.offset < 0.0 {
        e = e - (-scaling.offset);
    }
    e
}

fn reflectance(
    roles: &BandRoles,
    role: BandRole,
    scaling: Scaling,
) -> std::result::Result<Expr, Unavailable> {
    roles
        .get(role)
        .map(|band| scaled(band, scaling))
        .ok_or_else(|| Unavailable::missing_bands(vec![role]))
}

// ---------------------------------------------------------------------------
// Formulas
// ---------------------------------------------------------------------------

/// `(a - b) / (a + b)`
pub fn normalized_difference(a: Expr, b: Expr) -> Expr {
    (a.clone() - b.clone()) / (a + b)
}

/// `NDVI = (NIR - Red) / (NIR + Red)`
pub fn ndvi(nir: Expr, red: Expr) -> Expr {
    normalized_difference(nir, red)
}

/// `NDWI = (Green - NIR) / (Green + NIR)`, positive over water.
pub fn ndwi(green: Expr, nir: Expr) -> Expr {
    normalized_difference(green, nir)
}

/// Parameters for SAVI
#[derive(Debug, Clone)]
pub struct SaviParams {
    /// Soil brightness correction factor (0 = high vegetation, 1 = low vegetation)
    /// Default: 0.5
    pub l_factor: f64,
}

impl Default for SaviParams {
    fn default() -> Self {
        Self { l_factor: 0.5 }
    }
}

/// `SAVI = ((NIR - Red) / (NIR + Red + L)) * (1 + L)`
pub fn savi(nir: Expr, red: Expr, params: &SaviParams) -> Expr {
    let l = params.l_factor;
    ((nir.clone() - red.clone()) / (nir + red + l)) * (1.0 + l)
}

/// Parameters for EVI
#[derive(Debug, Clone)]
pub struct EviParams {
    /// Gain factor (default: 2.5)
    pub g: f64,
    /// Aerosol coefficient for red band (default: 6.0)
    pub c1: f64,
    /// Aerosol coefficient for blue band (default: 7.5)
    pub c2: f64,
    /// Canopy background adjustment (default: 1.0)
    pub l: f64,
}

impl Default for EviParams {
    fn default() -> Self {
        Self {
            g: 2.5,
            c1: 6.0,
            c2: 7.5,
            l: 1.0,
        }
    }
}

/// `EVI = G * (NIR - Red) / (NIR + C1 * Red - C2 * Blue + L)`
pub fn evi(nir: Expr, red: Expr, blue: Expr, params: &EviParams) -> Expr {
    Expr::num(params.g) * (nir.clone() - red.clone())
        / (nir + red * params.c1 - blue * params.c2 + params.l)
}

// ---------------------------------------------------------------------------
// Result
// ---------------------------------------------------------------------------

/// Area-mean value of one index over the analysis region.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IndexResult {
    pub index: VegetationIndex,
    /// `None` when the reduction returned no data (e.g. fully masked region).
    pub mean: Option<f64>,
    pub valid_range: (f64, f64),
    pub healthy_range: (f64, f64),
    pub description: &'static str,
}

impl IndexResult {
    pub fn new(index: VegetationIndex, mean: Option<f64>) -> Self {
        let info = index.info();
        Self {
            index,
            mean,
            valid_range: info.valid_range,
            healthy_range: info.healthy_range,
            description: info.description,
        }
    }

    /// Whether the mean sits inside the healthy reference band.
    pub fn is_healthy(&self) -> Option<bool> {
        let (lo, hi) = self.healthy_range;
        self.mean.map(|v| v >= lo && v <= hi)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::band::select_bands;
    use crate::source::Source;

    fn eval(e: &Expr, pairs: &[(&str, f64)]) -> f64 {
        e.eval(&|name: &str| pairs.iter().find(|(n, _)| *n == name).map(|(_, v)| *v))
    }

    fn s2_bands() -> Vec<String> {
        ["B2", "B3", "B4", "B8"].iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn ndvi_from_sentinel2_dn() {
        let sel = select_bands(Source::Sentinel2.profile(), VegetationIndex::NDVI, &s2_bands());
        let e = VegetationIndex::NDVI.expression(&sel).unwrap();
        let v = eval(&e, &[("B8", 8000.0), ("B4", 2000.0)]);
        assert!((v - 0.6).abs() < 1e-12, "NDVI should be 0.6, got {v}");
    }

    #[test]
    fn ndwi_sign_convention() {
        // Green minus NIR: positive over water.
        let sel = select_bands(Source::Sentinel2.profile(), VegetationIndex::NDWI, &s2_bands());
        let e = VegetationIndex::NDWI.expression(&sel).unwrap();
        let v = eval(&e, &[("B3", 5000.0), ("B8", 1000.0)]);
        let expected = (0.5 - 0.1) / (0.5 + 0.1);
        assert!((v - expected).abs() < 1e-12, "NDWI should be {expected}, got {v}");
    }

    #[test]
    fn evi_matches_formula() {
        let sel = select_bands(Source::Sentinel2.profile(), VegetationIndex::EVI, &s2_bands());
        let e = VegetationIndex::EVI.expression(&sel).unwrap();
        let v = eval(&e, &[("B8", 8000.0), ("B4", 2000.0), ("B2", 1000.0)]);
        let expected = 2.5 * 0.6 / (0.8 + 1.2 - 0.75 + 1.0);
        assert!((v - expected).abs() < 1e-12, "EVI should be {expected}, got {v}");
    }

    #[test]
    fn savi_uses_half_l() {
        let sel = select_bands(Source::Sentinel2.profile(), VegetationIndex::SAVI, &s2_bands());
        let e = VegetationIndex::SAVI.expression(&sel).unwrap();
        let v = eval(&e, &[("B8", 8000.0), ("B4", 2000.0)]);
        let expected = (0.6 / 1.5) * 1.5;
        assert!((v - expected).abs() < 1e-12, "SAVI should be {expected}, got {v}");
    }

    #[test]
    fn landsat_offset_is_applied() {
        let bands: Vec<String> = ["SR_B4", "SR_B5"].iter().map(|s| s.to_string()).collect();
        let sel = select_bands(Source::Landsat8.profile(), VegetationIndex::NDVI, &bands);
        let e = VegetationIndex::NDVI.expression(&sel).unwrap();
        // 0.8 and 0.2 reflectance in C2 L2 digital numbers
        let nir = (0.8 + 0.2) / 0.0000275;
        let red = (0.2 + 0.2) / 0.0000275;
        let v = eval(&e, &[("SR_B5", nir), ("SR_B4", red)]);
        assert!((v - 0.6).abs() < 1e-9, "got {v}");
        assert!(e.to_string().contains("- 0.2"));
    }

    #[test]
    fn modis_ndvi_is_scaled_pass_through() {
        let bands: Vec<String> = ["NDVI", "sur_refl_b01", "sur_refl_b02"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let sel = select_bands(Source::Modis.profile(), VegetationIndex::NDVI, &bands);
        let e = VegetationIndex::NDVI.expression(&sel).unwrap();
        assert_eq!(e.to_string(), "(NDVI * 0.0001)");
        assert!((eval(&e, &[("NDVI", 6500.0)]) - 0.65).abs() < 1e-12);
    }

    #[test]
    fn unavailable_selection_propagates() {
        let bands: Vec<String> = ["NDVI", "sur_refl_b01", "sur_refl_b02"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let sel = select_bands(Source::Modis.profile(), VegetationIndex::EVI, &bands);
        let err = VegetationIndex::EVI.expression(&sel).unwrap_err();
        assert_eq!(err.reason, Unavailable::MISSING_BAND);
    }

    #[test]
    fn parse_names() {
        assert_eq!("ndvi".parse::<VegetationIndex>().unwrap(), VegetationIndex::NDVI);
        assert_eq!(" Savi ".parse::<VegetationIndex>().unwrap(), VegetationIndex::SAVI);
        assert!(matches!(
            "LAI".parse::<VegetationIndex>(),
            Err(Error::InvalidRequest(_))
        ));
    }

    #[test]
    fn result_carries_metadata() {
        let r = IndexResult::new(VegetationIndex::NDVI, Some(0.6));
        assert_eq!(r.valid_range, (-1.0, 1.0));
        assert_eq!(r.healthy_range, (0.3, 0.8));
        assert_eq!(r.is_healthy(), Some(true));
        assert_eq!(IndexResult::new(VegetationIndex::NDVI, None).is_healthy(), None);
    }
}
