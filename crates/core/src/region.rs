//! Region boundaries
//!
//! A [`Region`] is the administrative unit selected for analysis: a polygon or
//! multi-polygon in geographic coordinates (`[lon, lat]`), a label, and the
//! derived bounding box and centroid. Regions are validated on construction
//! and immutable afterwards.

use geo::{Area, BoundingRect, Centroid};
use geo_types::{LineString, MultiPolygon, Polygon};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Error, Result};

/// A geographic bounding box.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BBox {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl BBox {
    pub fn new(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Self {
        Self { min_x, min_y, max_x, max_y }
    }

    /// Check if two bboxes intersect.
    pub fn intersects(&self, other: &BBox) -> bool {
        self.min_x < other.max_x
            && self.max_x > other.min_x
            && self.min_y < other.max_y
            && self.max_y > other.min_y
    }

    pub fn width(&self) -> f64 {
        self.max_x - self.min_x
    }

    pub fn height(&self) -> f64 {
        self.max_y - self.min_y
    }

    /// `[west, south, east, north]`
    pub fn to_array(&self) -> [f64; 4] {
        [self.min_x, self.min_y, self.max_x, self.max_y]
    }
}

// ---------------------------------------------------------------------------
// Administrative path
// ---------------------------------------------------------------------------

/// Hierarchical administrative selection (country › state › municipality).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdminPath {
    pub country: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub municipality: Option<String>,
}

impl AdminPath {
    pub fn new(country: impl Into<String>) -> Self {
        Self {
            country: country.into(),
            state: None,
            municipality: None,
        }
    }

    pub fn with_state(mut self, state: impl Into<String>) -> Self {
        self.state = Some(state.into());
        self
    }

    pub fn with_municipality(mut self, municipality: impl Into<String>) -> Self {
        self.municipality = Some(municipality.into());
        self
    }

    /// Most specific level first, e.g. `"Toronto, Ontario, Canada"`.
    ///
    /// A municipality without a state is rendered as `"Toronto, Canada"`.
    pub fn label(&self) -> String {
        let mut parts: Vec<&str> = Vec::with_capacity(3);
        if let Some(m) = self.municipality.as_deref() {
            parts.push(m);
        }
        if let Some(s) = self.state.as_deref() {
            parts.push(s);
        }
        parts.push(&self.country);
        parts.join(", ")
    }
}

// ---------------------------------------------------------------------------
// Region
// ---------------------------------------------------------------------------

/// A validated analysis region.
#[derive(Debug, Clone, PartialEq)]
pub struct Region {
    label: String,
    admin_path: Option<AdminPath>,
    geometry: MultiPolygon<f64>,
    bbox: BBox,
    centroid: (f64, f64),
}

/// Rings of one polygon: exterior first, then holes.
pub type PolygonRings = Vec<Vec<[f64; 2]>>;

impl Region {
    /// Build a region from polygons given as `[lon, lat]` rings.
    ///
    /// Each entry of `polygons` is one polygon: exterior ring followed by any
    /// holes. Rings are closed automatically if the last position differs
    /// from the first.
    pub fn from_rings(label: impl Into<String>, polygons: Vec<PolygonRings>) -> Result<Self> {
        if polygons.is_empty() {
            return Err(Error::InvalidGeometry("region has no polygons".into()));
        }

        let mut parts = Vec::with_capacity(polygons.len());
        for (p, rings) in polygons.into_iter().enumerate() {
            let mut rings = rings.into_iter();
            let exterior = rings
                .next()
                .ok_or_else(|| Error::InvalidGeometry(format!("polygon {p} has no rings")))?;
            let exterior = ring_to_linestring(exterior, p)?;
            let holes = rings
                .map(|r| ring_to_linestring(r, p))
                .collect::<Result<Vec<_>>>()?;
            parts.push(Polygon::new(exterior, holes));
        }

        Self::from_geometry(label, MultiPolygon::new(parts))
    }

    /// Build a region from a single polygon.
    pub fn from_polygon(label: impl Into<String>, rings: PolygonRings) -> Result<Self> {
        Self::from_rings(label, vec![rings])
    }

    /// Axis-aligned rectangle `[west, south, east, north]`.
    pub fn from_bbox(label: impl Into<String>, bbox: BBox) -> Result<Self> {
        Self::from_polygon(
            label,
            vec![vec![
                [bbox.min_x, bbox.min_y],
                [bbox.max_x, bbox.min_y],
                [bbox.max_x, bbox.max_y],
                [bbox.min_x, bbox.max_y],
            ]],
        )
    }

    /// Validate a multi-polygon and derive bbox and centroid.
    pub fn from_geometry(label: impl Into<String>, geometry: MultiPolygon<f64>) -> Result<Self> {
        if geometry.0.is_empty() {
            return Err(Error::InvalidGeometry("region has no polygons".into()));
        }

        for coord in geometry.0.iter().flat_map(|p| {
            p.exterior()
                .coords()
                .chain(p.interiors().iter().flat_map(|r| r.coords()))
        }) {
            if !coord.x.is_finite() || !coord.y.is_finite() {
                return Err(Error::InvalidGeometry("non-finite coordinate".into()));
            }
            if !(-180.0..=180.0).contains(&coord.x) || !(-90.0..=90.0).contains(&coord.y) {
                return Err(Error::InvalidGeometry(format!(
                    "coordinate ({}, {}) outside lon/lat range",
                    coord.x, coord.y
                )));
            }
        }

        if geometry.unsigned_area() <= 0.0 {
            return Err(Error::InvalidGeometry("region has zero area".into()));
        }

        let rect = geometry
            .bounding_rect()
            .ok_or_else(|| Error::InvalidGeometry("cannot compute bounding box".into()))?;
        let centroid = geometry
            .centroid()
            .ok_or_else(|| Error::InvalidGeometry("cannot compute centroid".into()))?;

        Ok(Self {
            label: label.into(),
            admin_path: None,
            bbox: BBox::new(rect.min().x, rect.min().y, rect.max().x, rect.max().y),
            centroid: (centroid.x(), centroid.y()),
            geometry,
        })
    }

    /// Parse a GeoJSON `Polygon`, `MultiPolygon` or `Feature` wrapping one.
    ///
    /// When `label` is `None`, the feature's `name` property is used.
    pub fn from_geojson(label: Option<&str>, value: &Value) -> Result<Self> {
        let (geometry, props) = match value["type"].as_str() {
            Some("Feature") => (&value["geometry"], Some(&value["properties"])),
            Some("Polygon") | Some("MultiPolygon") => (value, None),
            Some(other) => {
                return Err(Error::InvalidGeometry(format!(
                    "unsupported GeoJSON type '{other}'"
                )))
            }
            None => return Err(Error::InvalidGeometry("GeoJSON object has no 'type'".into())),
        };

        let label = label
            .map(str::to_string)
            .or_else(|| props.and_then(|p| p["name"].as_str()).map(str::to_string))
            .unwrap_or_else(|| "Unnamed region".to_string());

        let coords = &geometry["coordinates"];
        let polygons = match geometry["type"].as_str() {
            Some("Polygon") => vec![parse_polygon(coords)?],
            Some("MultiPolygon") => coords
                .as_array()
                .ok_or_else(|| Error::InvalidGeometry("MultiPolygon coordinates not an array".into()))?
                .iter()
                .map(parse_polygon)
                .collect::<Result<Vec<_>>>()?,
            _ => {
                return Err(Error::InvalidGeometry(
                    "feature geometry must be Polygon or MultiPolygon".into(),
                ))
            }
        };

        Self::from_rings(label, polygons)
    }

    /// Attach an administrative path; the label becomes the path's label.
    pub fn with_admin_path(mut self, path: AdminPath) -> Self {
        self.label = path.label();
        self.admin_path = Some(path);
        self
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn admin_path(&self) -> Option<&AdminPath> {
        self.admin_path.as_ref()
    }

    pub fn geometry(&self) -> &MultiPolygon<f64> {
        &self.geometry
    }

    pub fn bbox(&self) -> BBox {
        self.bbox
    }

    /// Centroid as `(lon, lat)`.
    pub fn centroid(&self) -> (f64, f64) {
        self.centroid
    }

    /// Rings as `[lon, lat]` positions, one entry per polygon.
    pub fn rings(&self) -> Vec<PolygonRings> {
        self.geometry
            .0
            .iter()
            .map(|p| {
                std::iter::once(p.exterior())
                    .chain(p.interiors().iter())
                    .map(|ls| ls.coords().map(|c| [c.x, c.y]).collect())
                    .collect()
            })
            .collect()
    }

    /// GeoJSON `MultiPolygon` geometry object.
    pub fn to_geojson(&self) -> Value {
        serde_json::json!({
            "type": "MultiPolygon",
            "coordinates": self.rings(),
        })
    }
}

fn ring_to_linestring(ring: Vec<[f64; 2]>, polygon: usize) -> Result<LineString<f64>> {
    let mut ring = ring;
    if ring.len() > 1 && ring.first() == ring.last() {
        ring.pop();
    }
    if ring.len() < 3 {
        return Err(Error::InvalidGeometry(format!(
            "ring in polygon {polygon} has {} distinct positions, need at least 3",
            ring.len()
        )));
    }
    // Polygon::new closes the ring.
    Ok(LineString::from(ring))
}

fn parse_polygon(value: &Value) -> Result<PolygonRings> {
    value
        .as_array()
        .ok_or_else(|| Error::InvalidGeometry("Polygon coordinates not an array".into()))?
        .iter()
        .map(|ring| {
            ring.as_array()
                .ok_or_else(|| Error::InvalidGeometry("ring is not an array".into()))?
                .iter()
                .map(|pos| match pos.as_array().map(Vec::as_slice) {
                    Some([x, y, ..]) => match (x.as_f64(), y.as_f64()) {
                        (Some(x), Some(y)) => Ok([x, y]),
                        _ => Err(Error::InvalidGeometry("position is not numeric".into())),
                    },
                    _ => Err(Error::InvalidGeometry("position needs two numbers".into())),
                })
                .collect()
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square() -> PolygonRings {
        vec![vec![[0.0, 0.0], [2.0, 0.0], [2.0, 2.0], [0.0, 2.0], [0.0, 0.0]]]
    }

    #[test]
    fn bbox_and_centroid() {
        let region = Region::from_polygon("Square", square()).unwrap();
        assert_eq!(region.label(), "Square");
        assert_eq!(region.bbox(), BBox::new(0.0, 0.0, 2.0, 2.0));
        let (cx, cy) = region.centroid();
        assert!((cx - 1.0).abs() < 1e-12);
        assert!((cy - 1.0).abs() < 1e-12);
    }

    #[test]
    fn open_ring_is_closed() {
        let ring = vec![vec![[0.0, 0.0], [1.0, 0.0], [1.0, 1.0]]];
        let region = Region::from_polygon("Tri", ring).unwrap();
        let rings = region.rings();
        assert_eq!(rings[0][0].first(), rings[0][0].last());
        assert_eq!(rings[0][0].len(), 4);
    }

    #[test]
    fn rejects_empty_and_degenerate() {
        assert!(matches!(
            Region::from_rings("x", vec![]),
            Err(Error::InvalidGeometry(_))
        ));
        let line = vec![vec![[0.0, 0.0], [1.0, 1.0], [0.0, 0.0]]];
        assert!(Region::from_polygon("x", line).is_err());
        let flat = vec![vec![[0.0, 0.0], [1.0, 0.0], [2.0, 0.0], [0.0, 0.0]]];
        assert!(Region::from_polygon("x", flat).is_err());
    }

    #[test]
    fn rejects_out_of_range() {
        let ring = vec![vec![[170.0, 0.0], [190.0, 0.0], [190.0, 1.0], [170.0, 1.0]]];
        assert!(Region::from_polygon("x", ring).is_err());
    }

    #[test]
    fn geojson_feature_uses_name_property() {
        let value = serde_json::json!({
            "type": "Feature",
            "properties": { "name": "Lisbon" },
            "geometry": {
                "type": "Polygon",
                "coordinates": [[[-9.2, 38.7], [-9.1, 38.7], [-9.1, 38.8], [-9.2, 38.8], [-9.2, 38.7]]]
            }
        });
        let region = Region::from_geojson(None, &value).unwrap();
        assert_eq!(region.label(), "Lisbon");
        let bbox = region.bbox();
        assert!((bbox.min_x + 9.2).abs() < 1e-12);
        assert!((bbox.max_y - 38.8).abs() < 1e-12);
    }

    #[test]
    fn geojson_multipolygon_round_trips_rings() {
        let value = serde_json::json!({
            "type": "MultiPolygon",
            "coordinates": [
                [[[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 1.0], [0.0, 0.0]]],
                [[[5.0, 5.0], [6.0, 5.0], [6.0, 6.0], [5.0, 6.0], [5.0, 5.0]]]
            ]
        });
        let region = Region::from_geojson(Some("Islands"), &value).unwrap();
        assert_eq!(region.geometry().0.len(), 2);
        assert_eq!(region.bbox(), BBox::new(0.0, 0.0, 6.0, 6.0));
        assert_eq!(region.to_geojson()["coordinates"], value["coordinates"]);
    }

    #[test]
    fn geojson_rejects_points() {
        let value = serde_json::json!({ "type": "Point", "coordinates": [0.0, 0.0] });
        assert!(Region::from_geojson(None, &value).is_err());
    }

    #[test]
    fn admin_path_label() {
        let path = AdminPath::new("Canada")
            .with_state("Ontario")
            .with_municipality("Toronto");
        assert_eq!(path.label(), "Toronto, Ontario, Canada");
        assert_eq!(AdminPath::new("Japan").label(), "Japan");

        let region = Region::from_polygon("tmp", square())
            .unwrap()
            .with_admin_path(AdminPath::new("Canada").with_state("Quebec"));
        assert_eq!(region.label(), "Quebec, Canada");
        assert_eq!(region.admin_path().unwrap().country, "Canada");
    }

    #[test]
    fn bbox_intersection() {
        let a = BBox::new(0.0, 0.0, 2.0, 2.0);
        assert!(a.intersects(&BBox::new(1.0, 1.0, 3.0, 3.0)));
        assert!(!a.intersects(&BBox::new(2.0, 0.0, 3.0, 1.0)));
        assert_eq!(a.to_array(), [0.0, 0.0, 2.0, 2.0]);
    }
}
