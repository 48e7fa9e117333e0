//! Geometry parsing and bounding boxes.
//!
//! Features keep their shape as WKT text, which is the source of truth.
//! Parsing happens when a geometry is needed for a predicate; bounding boxes
//! are computed once when a feature enters the store so spatial filters can
//! reject most candidates without reparsing.

use crate::error::GeometryError;
use crate::feature::FeatureId;
use geo::dimensions::HasDimensions;
use geo::{BoundingRect, Euclidean, Length};
use geo_types::Geometry;

/// Axis-aligned bounding box in planar coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BBox {
    pub min_x: f64,
    pub max_x: f64,
    pub min_y: f64,
    pub max_y: f64,
}

impl BBox {
    /// Create a new bounding box.
    pub fn new(min_x: f64, max_x: f64, min_y: f64, max_y: f64) -> Self {
        Self {
            min_x,
            max_x,
            min_y,
            max_y,
        }
    }

    /// Check if this bbox intersects another.
    pub fn intersects(&self, other: &BBox) -> bool {
        self.min_x <= other.max_x
            && self.max_x >= other.min_x
            && self.min_y <= other.max_y
            && self.max_y >= other.min_y
    }

    /// Check if this bbox fully contains another bbox.
    pub fn contains_bbox(&self, other: &BBox) -> bool {
        self.min_x <= other.min_x
            && self.max_x >= other.max_x
            && self.min_y <= other.min_y
            && self.max_y >= other.max_y
    }

    /// Compute from a geo-types Geometry.
    pub fn from_geometry(geom: &Geometry<f64>) -> Option<Self> {
        let rect = geom.bounding_rect()?;
        Some(Self {
            min_x: rect.min().x,
            max_x: rect.max().x,
            min_y: rect.min().y,
            max_y: rect.max().y,
        })
    }
}

/// Parse WKT string to geo-types Geometry.
pub fn parse_wkt(wkt: &str) -> Result<Geometry<f64>, GeometryError> {
    use std::str::FromStr;
    wkt::Wkt::from_str(wkt)
        .map_err(|e| GeometryError::WktParse(format!("{:?}", e)))
        .and_then(|w| {
            w.try_into()
                .map_err(|e: wkt::conversion::Error| GeometryError::WktParse(format!("{:?}", e)))
        })
}

/// Parse the shape of a feature, rejecting geometries without any points.
pub fn parse_feature_shape(id: FeatureId, wkt: &str) -> Result<Geometry<f64>, GeometryError> {
    let geom = parse_wkt(wkt)?;
    if geom.is_empty() {
        return Err(GeometryError::Empty(id));
    }
    Ok(geom)
}

/// Euclidean length of linear geometries; `None` for everything else.
pub fn line_length(geom: &Geometry<f64>) -> Option<f64> {
    match geom {
        Geometry::Line(line) => Some(line.length::<Euclidean>()),
        Geometry::LineString(ls) => Some(ls.length::<Euclidean>()),
        Geometry::MultiLineString(mls) => Some(mls.length::<Euclidean>()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_polygon() {
        let geom = parse_wkt("POLYGON((0 0, 1 0, 1 1, 0 1, 0 0))").unwrap();
        assert!(matches!(geom, Geometry::Polygon(_)));
    }

    #[test]
    fn test_parse_garbage_fails() {
        let err = parse_wkt("POLYGON((0 0, 1").unwrap_err();
        assert!(matches!(err, GeometryError::WktParse(_)));
    }

    #[test]
    fn test_empty_shape_rejected() {
        let err = parse_feature_shape(7, "GEOMETRYCOLLECTION EMPTY").unwrap_err();
        assert_eq!(err, GeometryError::Empty(7));
    }

    #[test]
    fn test_bbox_computation() {
        let geom = parse_wkt("POLYGON((0 0, 10 0, 10 20, 0 20, 0 0))").unwrap();
        let bbox = BBox::from_geometry(&geom).unwrap();
        assert_eq!(bbox, BBox::new(0.0, 10.0, 0.0, 20.0));
    }

    #[test]
    fn test_bbox_relations() {
        let outer = BBox::new(0.0, 10.0, 0.0, 10.0);
        let inner = BBox::new(2.0, 3.0, 2.0, 3.0);
        let far = BBox::new(20.0, 30.0, 20.0, 30.0);

        assert!(outer.contains_bbox(&inner));
        assert!(!inner.contains_bbox(&outer));
        assert!(outer.intersects(&inner));
        assert!(!outer.intersects(&far));
    }

    #[test]
    fn test_line_length() {
        let line = parse_wkt("LINESTRING(0 0, 3 4, 3 10)").unwrap();
        assert_eq!(line_length(&line), Some(11.0));

        let poly = parse_wkt("POLYGON((0 0, 1 0, 1 1, 0 1, 0 0))").unwrap();
        assert_eq!(line_length(&poly), None);
    }
}
