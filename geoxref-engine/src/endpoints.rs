//! Dangling line ends in a line network.
//!
//! Two passes over one collection:
//!
//! ```text
//! read cursor (collection order, position counts every feature)
//!        │  line start touched only by itself? else line end?
//!        ▼
//! DanglingLine { id, index, end }
//!        │
//!        ▼
//! EditSession + update cursor ──► index field (only where empty)
//! ```
//!
//! An end is "touched" by every feature intersecting the square of
//! half-width `tolerance` around it, the line itself included. A count of one
//! means nothing else reaches that end.

use crate::config::EndpointJob;
use crate::error::{Result, ValidationError};
use crate::field::FieldAccessor;
use crate::session::EditSession;
use geo_types::{Coord, Geometry, Rect};
use geoxref_store::{CollectionId, FeatureId, FeatureStore, QueryFilter, SpatialPredicate};
use rustc_hash::FxHashMap;
use serde::Serialize;

/// Which end of a line was found dangling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LineEnd {
    Start,
    End,
}

/// A line with a dangling end.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DanglingLine {
    pub id: FeatureId,
    /// Position of the feature in collection order, counting non-line features.
    pub index: usize,
    pub end: LineEnd,
}

/// Outcome of an endpoint run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct EndpointReport {
    /// One entry per line with a dangling end, in collection order.
    pub dangling: Vec<DanglingLine>,

    /// Lines whose index field was written.
    pub modified_count: usize,

    /// Dangling lines whose index field already held a value.
    pub already_set: usize,

    /// Features that are not lines, or whose shape could not be parsed.
    pub skipped_features: usize,
}

/// First and last vertex of a line-like shape.
fn line_ends(geom: &Geometry<f64>) -> Option<(Coord<f64>, Coord<f64>)> {
    match geom {
        Geometry::Line(line) => Some((line.start, line.end)),
        Geometry::LineString(ls) => Some((*ls.0.first()?, *ls.0.last()?)),
        Geometry::MultiLineString(mls) => {
            Some((*mls.0.first()?.0.first()?, *mls.0.last()?.0.last()?))
        }
        _ => None,
    }
}

fn window(point: Coord<f64>, tolerance: f64) -> Geometry<f64> {
    let min = Coord {
        x: point.x - tolerance,
        y: point.y - tolerance,
    };
    let max = Coord {
        x: point.x + tolerance,
        y: point.y + tolerance,
    };
    Geometry::Polygon(Rect::new(min, max).to_polygon())
}

/// Finds lines with a dangling end and records their position.
pub struct EndpointIndexer<'s, S: FeatureStore + ?Sized> {
    store: &'s S,
}

impl<'s, S: FeatureStore + ?Sized> EndpointIndexer<'s, S> {
    pub fn new(store: &'s S) -> Self {
        Self { store }
    }

    pub fn run(&self, job: &EndpointJob) -> Result<EndpointReport> {
        let span = tracing::info_span!("endpoints", collection = %job.collection);
        let _guard = span.enter();

        let collection = self
            .store
            .collection(&job.collection)
            .ok_or_else(|| ValidationError::CollectionNotFound(job.collection.clone()))?;
        let index_field = FieldAccessor::resolve(self.store, collection, &job.index_field)?;

        let mut report = self.find_dangling(collection, job.tolerance)?;
        let positions: FxHashMap<FeatureId, usize> = report
            .dangling
            .iter()
            .map(|line| (line.id, line.index))
            .collect();

        let session = EditSession::begin(self.store)?;
        {
            let mut cursor = self.store.update(collection, &QueryFilter::all())?;
            while let Some(mut feature) = cursor.next_feature()? {
                let Some(&index) = positions.get(&feature.id()) else {
                    continue;
                };
                if !index_field.is_empty(&feature) {
                    report.already_set += 1;
                    continue;
                }
                index_field.write_count(&mut feature, index);
                cursor.update_feature(&feature)?;
                report.modified_count += 1;
            }
        }
        session.commit()?;

        tracing::info!(
            dangling = report.dangling.len(),
            modified = report.modified_count,
            skipped = report.skipped_features,
            "endpoint indexing completed"
        );
        Ok(report)
    }

    /// Read-only pass: collect every line with a dangling start or end.
    pub fn find_dangling(&self, collection: CollectionId, tolerance: f64) -> Result<EndpointReport> {
        let mut report = EndpointReport::default();
        let mut cursor = self.store.search(collection, &QueryFilter::all())?;
        let mut position = 0usize;

        while let Some(feature) = cursor.next_feature()? {
            let index = position;
            position += 1;

            let ends = match feature.geometry() {
                Ok(geom) => line_ends(&geom),
                Err(error) => {
                    tracing::warn!(feature_id = feature.id(), error = %error, "skipping feature");
                    report.skipped_features += 1;
                    continue;
                }
            };
            let Some((start, end)) = ends else {
                tracing::warn!(feature_id = feature.id(), "not a line feature");
                report.skipped_features += 1;
                continue;
            };

            let dangling_end = if self.touching(collection, start, tolerance)? <= 1 {
                Some(LineEnd::Start)
            } else if self.touching(collection, end, tolerance)? <= 1 {
                Some(LineEnd::End)
            } else {
                None
            };

            if let Some(end) = dangling_end {
                tracing::debug!(feature_id = feature.id(), index, ?end, "dangling line end");
                report.dangling.push(DanglingLine {
                    id: feature.id(),
                    index,
                    end,
                });
            }
        }
        Ok(report)
    }

    /// Features touching the window around `point`, counted up to two.
    fn touching(&self, collection: CollectionId, point: Coord<f64>, tolerance: f64) -> Result<usize> {
        let filter = QueryFilter::spatial(window(point, tolerance), SpatialPredicate::Intersects);
        let mut cursor = self.store.search(collection, &filter)?;
        let mut count = 0;
        while count < 2 && cursor.next_feature()?.is_some() {
            count += 1;
        }
        Ok(count)
    }
}
