//! Pairwise spatial relation reporting.
//!
//! Compares one reference geometry against N others and appends one line per
//! predicate to a text sink:
//!
//! ```text
//! park intersects lake: true
//! park overlaps lake: true
//! park contains lake: false
//! park within lake: false
//! ```
//!
//! The reporter never mutates the store and opens no transaction. A pair
//! whose geometry cannot be used is recorded in the [`ReportSummary`] and
//! skipped; nothing is retried.

use crate::error::{Result, ValidationError, XrefError};
use crate::field::FieldAccessor;
use geoxref_store::geometry::parse_feature_shape;
use geoxref_store::{FeatureId, FeatureStore, GeometryError, QueryFilter, Relationship};
use geo_types::Geometry;
use rustc_hash::FxHashMap;
use serde::Serialize;
use std::fs::OpenOptions;
use std::io::{BufWriter, Write};
use std::path::Path;
use std::sync::Arc;

/// A feature's shape paired with its display name.
#[derive(Debug, Clone, PartialEq)]
pub struct NamedGeometry {
    pub id: FeatureId,
    pub name: String,
    wkt: Arc<str>,
}

impl NamedGeometry {
    pub fn new(id: FeatureId, name: impl Into<String>, wkt: impl Into<Arc<str>>) -> Self {
        Self {
            id,
            name: name.into(),
            wkt: wkt.into(),
        }
    }

    pub fn wkt(&self) -> &str {
        &self.wkt
    }

    /// Parse the shape; empty geometries are rejected.
    pub fn geometry(&self) -> std::result::Result<Geometry<f64>, GeometryError> {
        parse_feature_shape(self.id, &self.wkt)
    }
}

/// The four reported predicates for an ordered pair.
///
/// `overlaps` folds in `crosses`, so a line running through a polygon
/// reports as overlapping it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RelationSet {
    pub intersects: bool,
    pub overlaps: bool,
    pub contains: bool,
    pub within: bool,
}

impl RelationSet {
    /// `(label, outcome)` in report order.
    pub fn entries(&self) -> [(&'static str, bool); 4] {
        [
            ("intersects", self.intersects),
            ("overlaps", self.overlaps),
            ("contains", self.contains),
            ("within", self.within),
        ]
    }
}

impl From<Relationship> for RelationSet {
    fn from(r: Relationship) -> Self {
        Self {
            intersects: r.intersects,
            overlaps: r.overlaps || r.crosses,
            contains: r.contains,
            within: r.within,
        }
    }
}

/// A pair that could not be evaluated.
#[derive(Debug, Clone, PartialEq)]
pub struct PairFailure {
    pub reference: String,
    pub other: String,
    pub error: GeometryError,
}

/// Outcome of a [`SpatialRelationReporter::report`] call.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReportSummary {
    /// Pairs successfully evaluated and written.
    pub pairs: usize,

    pub lines_written: usize,

    pub failures: Vec<PairFailure>,
}

impl ReportSummary {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Read-only pairwise predicate evaluation.
#[derive(Debug, Clone, Copy, Default)]
pub struct SpatialRelationReporter;

impl SpatialRelationReporter {
    pub fn new() -> Self {
        Self
    }

    /// Evaluate every reported predicate of `a` against `b`, without
    /// short-circuiting.
    pub fn describe(&self, a: &Geometry<f64>, b: &Geometry<f64>) -> RelationSet {
        Relationship::between(a, b).into()
    }

    /// Scan `collection` once and return the features whose `name_field`
    /// equals each requested name, in request order.
    ///
    /// When several features share a name the first one scanned wins.
    pub fn resolve_named<S: FeatureStore + ?Sized>(
        &self,
        store: &S,
        collection: &str,
        name_field: &str,
        names: &[&str],
    ) -> Result<Vec<NamedGeometry>> {
        let coll = store
            .collection(collection)
            .ok_or_else(|| ValidationError::CollectionNotFound(collection.to_string()))?;
        let field = FieldAccessor::resolve(store, coll, name_field)?;

        let mut found: FxHashMap<String, NamedGeometry> = FxHashMap::default();
        {
            let mut cursor = store.search(coll, &QueryFilter::all())?;
            while let Some(feature) = cursor.next_feature()? {
                let name = field.read(&feature).trim().to_string();
                if !names.contains(&name.as_str()) || found.contains_key(&name) {
                    continue;
                }
                let named = NamedGeometry::new(feature.id(), name.clone(), feature.wkt());
                found.insert(name, named);
            }
        }

        names
            .iter()
            .map(|name| {
                found.get(*name).cloned().ok_or_else(|| {
                    XrefError::from(ValidationError::FeatureNotFound {
                        collection: collection.to_string(),
                        name: name.to_string(),
                    })
                })
            })
            .collect()
    }

    /// Write the relation lines of `reference` against each of `others`.
    pub fn report<W: Write>(
        &self,
        sink: &mut W,
        reference: &NamedGeometry,
        others: &[NamedGeometry],
    ) -> Result<ReportSummary> {
        let mut summary = ReportSummary::default();

        let reference_geom = match reference.geometry() {
            Ok(geom) => geom,
            Err(error) => {
                tracing::warn!(name = %reference.name, error = %error, "reference geometry unusable");
                summary.failures = others
                    .iter()
                    .map(|other| PairFailure {
                        reference: reference.name.clone(),
                        other: other.name.clone(),
                        error: error.clone(),
                    })
                    .collect();
                return Ok(summary);
            }
        };

        for other in others {
            let other_geom = match other.geometry() {
                Ok(geom) => geom,
                Err(error) => {
                    tracing::warn!(
                        reference = %reference.name,
                        other = %other.name,
                        error = %error,
                        "skipping pair"
                    );
                    summary.failures.push(PairFailure {
                        reference: reference.name.clone(),
                        other: other.name.clone(),
                        error,
                    });
                    continue;
                }
            };

            let relations = self.describe(&reference_geom, &other_geom);
            for (label, outcome) in relations.entries() {
                writeln!(sink, "{} {} {}: {}", reference.name, label, other.name, outcome)?;
                summary.lines_written += 1;
            }
            summary.pairs += 1;
        }

        sink.flush()?;
        tracing::debug!(
            pairs = summary.pairs,
            failures = summary.failures.len(),
            "relation report written"
        );
        Ok(summary)
    }

    /// Append the report to `path`, creating the file if needed. Existing
    /// content is never truncated.
    pub fn append_to_path(
        &self,
        path: impl AsRef<Path>,
        reference: &NamedGeometry,
        others: &[NamedGeometry],
    ) -> Result<ReportSummary> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path.as_ref())?;
        let mut sink = BufWriter::new(file);
        self.report(&mut sink, reference, others)
    }
}
