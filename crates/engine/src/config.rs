//! Engine configuration and reduction policy.
//!
//! [`EngineConfig`] is read from a TOML file; every field has a default so an
//! empty file is valid.
//!
//! ```toml
//! max_pixels = 1e9
//! scale_m = 20.0
//! best_effort = true
//! cloud_threshold = 10.0
//! series_max_points = 10
//! parallel = true
//! ```

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use verdex_core::{Error, Result};

use crate::source::SourceProfile;
use crate::timeseries::DEFAULT_MAX_POINTS;

pub const DEFAULT_MAX_PIXELS: f64 = 1e9;

/// Parameters attached to every region reduction.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ReductionPolicy {
    /// Pixel size in metres.
    pub scale_m: f64,
    /// Upper bound on pixels the service may read.
    pub max_pixels: f64,
    /// Let the service coarsen the scale instead of failing at the cap.
    pub best_effort: bool,
}

impl ReductionPolicy {
    /// Default policy at a profile's native resolution.
    pub fn native(profile: &SourceProfile) -> Self {
        Self {
            scale_m: profile.native_scale_m,
            max_pixels: DEFAULT_MAX_PIXELS,
            best_effort: true,
        }
    }
}

/// Tunables for [`crate::VegetationEngine`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    pub max_pixels: f64,
    /// Overrides the profile's native scale when set.
    pub scale_m: Option<f64>,
    pub best_effort: bool,
    /// Overrides the profile's cloud-cover threshold (percent).
    pub cloud_threshold: Option<f64>,
    pub series_max_points: usize,
    /// Compute indices concurrently when the `parallel` feature is enabled.
    pub parallel: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_pixels: DEFAULT_MAX_PIXELS,
            scale_m: None,
            best_effort: true,
            cloud_threshold: None,
            series_max_points: DEFAULT_MAX_POINTS,
            parallel: true,
        }
    }
}

impl EngineConfig {
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: EngineConfig = toml::from_str(text)
            .map_err(|e| Error::InvalidRequest(format!("failed to parse config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|e| {
            Error::InvalidRequest(format!("failed to read config {}: {e}", path.display()))
        })?;
        Self::from_toml_str(&text)
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.max_pixels.is_finite() && self.max_pixels >= 1.0) {
            return Err(Error::InvalidParameter {
                name: "max_pixels",
                value: self.max_pixels.to_string(),
                reason: "must be a finite number >= 1".into(),
            });
        }
        if let Some(scale) = self.scale_m {
            if !(scale.is_finite() && scale > 0.0) {
                return Err(Error::InvalidParameter {
                    name: "scale_m",
                    value: scale.to_string(),
                    reason: "must be positive".into(),
                });
            }
        }
        if let Some(threshold) = self.cloud_threshold {
            if !(0.0..=100.0).contains(&threshold) {
                return Err(Error::InvalidParameter {
                    name: "cloud_threshold",
                    value: threshold.to_string(),
                    reason: "must be a percentage in [0, 100]".into(),
                });
            }
        }
        if !(1..=DEFAULT_MAX_POINTS).contains(&self.series_max_points) {
            return Err(Error::InvalidParameter {
                name: "series_max_points",
                value: self.series_max_points.to_string(),
                reason: format!("must be between 1 and {DEFAULT_MAX_POINTS}"),
            });
        }
        Ok(())
    }

    /// Reduction policy for `profile` with this config's overrides applied.
    pub fn policy_for(&self, profile: &SourceProfile) -> ReductionPolicy {
        ReductionPolicy {
            scale_m: self.scale_m.unwrap_or(profile.native_scale_m),
            max_pixels: self.max_pixels,
            best_effort: self.best_effort,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::Source;
    use std::io::Write;

    #[test]
    fn empty_toml_gives_defaults() {
        let config = EngineConfig::from_toml_str("").unwrap();
        assert_eq!(config, EngineConfig::default());
        let policy = config.policy_for(Source::Landsat8.profile());
        assert_eq!(policy.scale_m, 30.0);
        assert_eq!(policy.max_pixels, 1e9);
        assert!(policy.best_effort);
    }

    #[test]
    fn overrides_apply() {
        let config = EngineConfig::from_toml_str(
            "scale_m = 20.0\nmax_pixels = 5e6\nbest_effort = false\ncloud_threshold = 5.0",
        )
        .unwrap();
        let policy = config.policy_for(Source::Sentinel2.profile());
        assert_eq!(policy.scale_m, 20.0);
        assert_eq!(policy.max_pixels, 5e6);
        assert!(!policy.best_effort);
        assert_eq!(config.cloud_threshold, Some(5.0));
    }

    #[test]
    fn rejects_bad_values() {
        assert!(EngineConfig::from_toml_str("series_max_points = 11").is_err());
        assert!(EngineConfig::from_toml_str("series_max_points = 0").is_err());
        assert!(EngineConfig::from_toml_str("cloud_threshold = 150.0").is_err());
        assert!(EngineConfig::from_toml_str("scale_m = -1.0").is_err());
        assert!(EngineConfig::from_toml_str("unknown = 1").is_err());
    }

    #[test]
    fn loads_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "series_max_points = 4").unwrap();
        let config = EngineConfig::from_file(file.path()).unwrap();
        assert_eq!(config.series_max_points, 4);
        assert!(EngineConfig::from_file("/nonexistent/verdex.toml").is_err());
    }
}
