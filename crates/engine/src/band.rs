//! Band selection
//!
//! Decides which of a scene's bands play the NIR / red / blue / green roles
//! for a given index. Pure lookup against the scene's band-name list; missing
//! bands produce [`BandSelection::Unavailable`] instead of an error.

use std::fmt;

use serde::Serialize;

use crate::index::VegetationIndex;
use crate::source::{Scaling, SourceProfile};

/// Spectral role a band plays in an index formula.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BandRole {
    Nir,
    Red,
    Blue,
    Green,
}

impl BandRole {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Nir => "nir",
            Self::Red => "red",
            Self::Blue => "blue",
            Self::Green => "green",
        }
    }
}

impl fmt::Display for BandRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Role → band name mapping resolved against a concrete scene.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BandRoles {
    pub nir: Option<String>,
    pub red: Option<String>,
    pub blue: Option<String>,
    pub green: Option<String>,
}

impl BandRoles {
    pub fn get(&self, role: BandRole) -> Option<&str> {
        match role {
            BandRole::Nir => self.nir.as_deref(),
            BandRole::Red => self.red.as_deref(),
            BandRole::Blue => self.blue.as_deref(),
            BandRole::Green => self.green.as_deref(),
        }
    }
}

/// Why an index could not be computed for a scene or source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Unavailable {
    pub reason: String,
    pub missing: Vec<BandRole>,
}

impl Unavailable {
    pub const MISSING_BAND: &'static str = "missing required band";

    pub fn missing_bands(missing: Vec<BandRole>) -> Self {
        Self {
            reason: Self::MISSING_BAND.to_string(),
            missing,
        }
    }
}

impl fmt::Display for Unavailable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.missing.is_empty() {
            return f.write_str(&self.reason);
        }
        let roles: Vec<&str> = self.missing.iter().map(BandRole::name).collect();
        write!(f, "{}: {}", self.reason, roles.join(", "))
    }
}

/// Outcome of band selection for one (scene, index) pair.
#[derive(Debug, Clone, PartialEq)]
pub enum BandSelection {
    /// Compute the index from role bands, after applying `scaling`.
    Bands { roles: BandRoles, scaling: Scaling },
    /// The catalog ships the index as `band`; multiply by `scale`.
    Precomputed { band: String, scale: f64 },
    Unavailable(Unavailable),
}

impl BandSelection {
    pub fn is_available(&self) -> bool {
        !matches!(self, Self::Unavailable(_))
    }
}

/// Resolve the bands `index` needs from `band_names` using `profile`.
///
/// A pre-computed band wins when the scene carries it. Otherwise every role
/// the index requires must be both defined by the profile and present in the
/// scene.
pub fn select_bands(
    profile: &SourceProfile,
    index: VegetationIndex,
    band_names: &[String],
) -> BandSelection {
    let has = |name: &str| band_names.iter().any(|b| b == name);

    if let Some(pre) = profile.precomputed_band(index) {
        if has(pre.band) {
            return BandSelection::Precomputed {
                band: pre.band.to_string(),
                scale: pre.scale,
            };
        }
    }

    let pick = |name: Option<&'static str>| name.filter(|n| has(*n)).map(str::to_string);
    let roles = BandRoles {
        nir: pick(Some(profile.bands.nir)),
        red: pick(Some(profile.bands.red)),
        blue: pick(profile.bands.blue),
        green: pick(profile.bands.green),
    };

    let missing: Vec<BandRole> = index
        .required_roles()
        .iter()
        .copied()
        .filter(|role| roles.get(*role).is_none())
        .collect();

    if !missing.is_empty() {
        return BandSelection::Unavailable(Unavailable::missing_bands(missing));
    }

    BandSelection::Bands {
        roles,
        scaling: profile.scaling,
    }
}
