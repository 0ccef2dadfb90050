//! Descriptive statistics and trend of a sampled time series.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::timeseries::TimeSeriesPoint;

/// Per-point slope below which a series counts as flat.
pub const STABLE_SLOPE: f64 = 0.005;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Trend {
    Increasing,
    Stable,
    Decreasing,
}

impl Trend {
    pub fn from_slope(slope: f64) -> Self {
        if slope.abs() < STABLE_SLOPE {
            Self::Stable
        } else if slope > 0.0 {
            Self::Increasing
        } else {
            Self::Decreasing
        }
    }

    pub fn arrow(&self) -> &'static str {
        match self {
            Self::Increasing => "↗",
            Self::Stable => "→",
            Self::Decreasing => "↘",
        }
    }
}

impl fmt::Display for Trend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Increasing => "Increasing",
            Self::Stable => "Stable",
            Self::Decreasing => "Decreasing",
        };
        write!(f, "{} {name}", self.arrow())
    }
}

/// Min / max / mean of a series and its least-squares trend.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SeriesSummary {
    pub points: usize,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    /// Change per sample, fitted over sample order.
    pub slope: f64,
    pub trend: Trend,
}

impl SeriesSummary {
    /// `None` for an empty series.
    pub fn from_points(points: &[TimeSeriesPoint]) -> Option<Self> {
        if points.is_empty() {
            return None;
        }
        let n = points.len() as f64;
        let values = points.iter().map(|p| p.value);
        let min = values.clone().fold(f64::INFINITY, f64::min);
        let max = values.clone().fold(f64::NEG_INFINITY, f64::max);
        let mean = values.sum::<f64>() / n;

        // OLS of value against sample index.
        let x_mean = (n - 1.0) / 2.0;
        let (mut sxy, mut sxx) = (0.0, 0.0);
        for (i, p) in points.iter().enumerate() {
            let dx = i as f64 - x_mean;
            sxy += dx * (p.value - mean);
            sxx += dx * dx;
        }
        let slope = if sxx > 0.0 { sxy / sxx } else { 0.0 };

        Some(Self {
            points: points.len(),
            min,
            max,
            mean,
            slope,
            trend: Trend::from_slope(slope),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn series(values: &[f64]) -> Vec<TimeSeriesPoint> {
        values
            .iter()
            .enumerate()
            .map(|(i, v)| TimeSeriesPoint {
                timestamp: Utc.with_ymd_and_hms(2023, 1, 1 + i as u32, 0, 0, 0).unwrap(),
                value: *v,
            })
            .collect()
    }

    #[test]
    fn increasing() {
        let s = SeriesSummary::from_points(&series(&[0.4, 0.5, 0.6, 0.7])).unwrap();
        assert_eq!(s.points, 4);
        assert!((s.min - 0.4).abs() < 1e-12);
        assert!((s.max - 0.7).abs() < 1e-12);
        assert!((s.mean - 0.55).abs() < 1e-12);
        assert!((s.slope - 0.1).abs() < 1e-12);
        assert_eq!(s.trend, Trend::Increasing);
    }

    #[test]
    fn stable_and_decreasing() {
        let flat = SeriesSummary::from_points(&series(&[0.5, 0.501, 0.499, 0.5])).unwrap();
        assert_eq!(flat.trend, Trend::Stable);
        let down = SeriesSummary::from_points(&series(&[0.8, 0.6, 0.4])).unwrap();
        assert_eq!(down.trend, Trend::Decreasing);
        assert_eq!(down.trend.to_string(), "↘ Decreasing");
    }

    #[test]
    fn single_point_is_stable() {
        let s = SeriesSummary::from_points(&series(&[0.3])).unwrap();
        assert_eq!(s.slope, 0.0);
        assert_eq!(s.trend, Trend::Stable);
        assert!(SeriesSummary::from_points(&[]).is_none());
    }
}
