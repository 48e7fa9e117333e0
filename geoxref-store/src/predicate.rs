//! Spatial predicates evaluated through the DE-9IM intersection matrix.
//!
//! A single `relate` call yields every relationship between two geometries;
//! [`Relationship`] keeps the answers so callers that need several predicates
//! (the relation reporter) pay for one matrix computation.
//!
//! Predicates read as `query <predicate> candidate`: `Contains` means the
//! query geometry contains the candidate, `Within` means the query geometry
//! lies within the candidate.

use geo::dimensions::{Dimensions, HasDimensions};
use geo::Relate;
use geo_types::Geometry;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Boolean spatial relation between two geometries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SpatialPredicate {
    Intersects,
    Crosses,
    Overlaps,
    Contains,
    Within,
    Disjoint,
}

impl SpatialPredicate {
    /// Evaluate `query <self> candidate`.
    pub fn evaluate(self, query: &Geometry<f64>, candidate: &Geometry<f64>) -> bool {
        Relationship::between(query, candidate).satisfies(self)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SpatialPredicate::Intersects => "intersects",
            SpatialPredicate::Crosses => "crosses",
            SpatialPredicate::Overlaps => "overlaps",
            SpatialPredicate::Contains => "contains",
            SpatialPredicate::Within => "within",
            SpatialPredicate::Disjoint => "disjoint",
        }
    }
}

impl fmt::Display for SpatialPredicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// All predicate outcomes between an ordered pair of geometries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Relationship {
    pub intersects: bool,
    pub crosses: bool,
    pub overlaps: bool,
    pub contains: bool,
    pub within: bool,
}

impl Relationship {
    /// Compute the relationship of `a` to `b`.
    pub fn between(a: &Geometry<f64>, b: &Geometry<f64>) -> Self {
        let matrix = a.relate(b);
        let matches = |pattern: &str| matrix.matches(pattern).unwrap_or(false);

        let dim_a = rank(a.dimensions());
        let dim_b = rank(b.dimensions());

        let crosses = match (dim_a, dim_b) {
            (Some(1), Some(1)) => matches("0********"),
            (Some(da), Some(db)) if da < db => matches("T*T******"),
            (Some(da), Some(db)) if da > db => matches("T*****T**"),
            _ => false,
        };

        let overlaps = match (dim_a, dim_b) {
            (Some(1), Some(1)) => matches("1*T***T**"),
            (Some(da), Some(db)) if da == db => matches("T*T***T**"),
            _ => false,
        };

        Self {
            intersects: matrix.is_intersects(),
            crosses,
            overlaps,
            contains: matrix.is_contains(),
            within: matrix.is_within(),
        }
    }

    pub fn satisfies(&self, predicate: SpatialPredicate) -> bool {
        match predicate {
            SpatialPredicate::Intersects => self.intersects,
            SpatialPredicate::Crosses => self.crosses,
            SpatialPredicate::Overlaps => self.overlaps,
            SpatialPredicate::Contains => self.contains,
            SpatialPredicate::Within => self.within,
            SpatialPredicate::Disjoint => !self.intersects,
        }
    }
}

fn rank(dimensions: Dimensions) -> Option<u8> {
    match dimensions {
        Dimensions::Empty => None,
        Dimensions::ZeroDimensional => Some(0),
        Dimensions::OneDimensional => Some(1),
        Dimensions::TwoDimensional => Some(2),
    }
}
