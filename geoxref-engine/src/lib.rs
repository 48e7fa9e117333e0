//! Spatial cross-referencing of attribute values between feature collections.
//!
//! For each feature of a *target* collection, the engine finds every feature
//! of a *source* collection satisfying a spatial predicate, aggregates the
//! distinct non-empty values of a source field, and writes the joined result
//! into an empty target field. All writes of a run are atomic.
//!
//! ```text
//! CrossReferenceJob
//!        │  validate (collections, fields) ──► ValidationError
//!        ▼
//! EditSession (store transaction)
//!        │
//!        ▼
//! update cursor over target ──► per target:
//!        │                        search source (predicate) ──► AggregateBuilder
//!        │                        join / fallback ──► write if field empty
//!        ▼
//! commit ──► RunReport (counts, selection)
//! ```
//!
//! Siblings built on the same store abstraction:
//!
//! - [`AttributeBackfill`]: copy one attribute into another within a
//!   collection, under an optional equality condition
//! - [`SpatialRelationReporter`]: pairwise relation lines for a reference
//!   geometry, appended to a text sink
//! - [`FeatureCopy`]: copy every feature of a collection into an empty one
//! - [`EndpointIndexer`]: find lines with a dangling end and record their
//!   position in collection order
//!
//! # Modules
//!
//! - [`config`]: Job configuration types
//! - [`engine`]: Cross-reference engine and run lifecycle
//! - [`backfill`]: Attribute backfill
//! - [`copy`]: Collection copy
//! - [`endpoints`]: Dangling line ends
//! - [`reporter`]: Spatial relation reporter
//! - [`report`]: Run results
//! - [`error`]: Error types

pub mod backfill;
pub mod config;
pub mod copy;
pub mod endpoints;
pub mod engine;
pub mod error;
pub mod report;
pub mod reporter;

mod aggregate;
mod field;
mod session;

pub use aggregate::AggregateBuilder;
pub use backfill::{AttributeBackfill, BackfillReport};
pub use config::{BackfillJob, CopyJob, CrossReferenceJob, EndpointJob, FieldCondition};
pub use copy::{CopyReport, FeatureCopy};
pub use endpoints::{DanglingLine, EndpointIndexer, EndpointReport, LineEnd};
pub use engine::{CrossReferenceEngine, RunState};
pub use error::{Result, ValidationError, XrefError};
pub use field::FieldAccessor;
pub use report::{RunReport, RunStatistics, SelectionSet};
pub use reporter::{
    NamedGeometry, PairFailure, RelationSet, ReportSummary, SpatialRelationReporter,
};
pub use session::EditSession;

pub use geoxref_store::SpatialPredicate;
