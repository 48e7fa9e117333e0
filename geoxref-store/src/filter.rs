//! Query filters accepted by feature cursors.

use crate::feature::{Feature, FieldIndex, FieldValue};
use crate::geometry::BBox;
use crate::predicate::SpatialPredicate;
use geo_types::Geometry;

/// Spatial part of a query: `query_geometry <predicate> candidate`.
#[derive(Debug, Clone)]
pub struct SpatialFilter {
    pub geometry: Geometry<f64>,
    pub predicate: SpatialPredicate,
    bbox: Option<BBox>,
}

impl SpatialFilter {
    pub fn new(geometry: Geometry<f64>, predicate: SpatialPredicate) -> Self {
        let bbox = BBox::from_geometry(&geometry);
        Self {
            geometry,
            predicate,
            bbox,
        }
    }

    /// Conservative bbox test. `false` means the candidate cannot match.
    pub fn may_match(&self, candidate: Option<&BBox>) -> bool {
        let (Some(query), Some(candidate)) = (self.bbox.as_ref(), candidate) else {
            return true;
        };

        match self.predicate {
            SpatialPredicate::Intersects
            | SpatialPredicate::Crosses
            | SpatialPredicate::Overlaps => query.intersects(candidate),
            SpatialPredicate::Contains => query.contains_bbox(candidate),
            SpatialPredicate::Within => candidate.contains_bbox(query),
            SpatialPredicate::Disjoint => true,
        }
    }

    /// Exact predicate against a parsed candidate geometry.
    pub fn matches(&self, candidate: &Geometry<f64>) -> bool {
        self.predicate.evaluate(&self.geometry, candidate)
    }
}

/// Attribute equality test, compared on the text form of both values.
#[derive(Debug, Clone, PartialEq)]
pub struct AttributeFilter {
    pub field: FieldIndex,
    pub value: FieldValue,
}

impl AttributeFilter {
    pub fn matches(&self, feature: &Feature) -> bool {
        feature.value(self.field).as_text() == self.value.as_text()
    }
}

/// Filter passed to `search`/`update`. An empty filter selects every feature.
#[derive(Debug, Clone, Default)]
pub struct QueryFilter {
    pub spatial: Option<SpatialFilter>,
    pub attribute: Option<AttributeFilter>,
}

impl QueryFilter {
    /// Select every feature of the collection.
    pub fn all() -> Self {
        Self::default()
    }

    pub fn spatial(geometry: Geometry<f64>, predicate: SpatialPredicate) -> Self {
        Self {
            spatial: Some(SpatialFilter::new(geometry, predicate)),
            attribute: None,
        }
    }

    pub fn attribute(field: FieldIndex, value: impl Into<FieldValue>) -> Self {
        Self {
            spatial: None,
            attribute: Some(AttributeFilter {
                field,
                value: value.into(),
            }),
        }
    }
}
