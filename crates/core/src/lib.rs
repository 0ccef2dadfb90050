//! # verdex core
//!
//! Shared data model for the verdex vegetation index engine.
//!
//! This crate provides:
//! - `Region`: validated polygon / multi-polygon boundary with bbox and centroid
//! - `AdminPath`: country › state › municipality selection labels
//! - `DateRange`: inclusive calendar date range
//! - `Error`: the error taxonomy shared by every verdex crate

pub mod dates;
pub mod error;
pub mod region;

pub use dates::DateRange;
pub use error::{Error, Result};
pub use region::{AdminPath, BBox, PolygonRings, Region};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::dates::DateRange;
    pub use crate::error::{Error, Result};
    pub use crate::region::{AdminPath, BBox, Region};
}
