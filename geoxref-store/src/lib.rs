//! Feature collections and spatial predicates for GeoXref.
//!
//! This crate is the storage side of the cross-reference engine. It provides:
//!
//! - **Feature model**: identifiers, positional attribute values and
//!   collection schemas with case-insensitive field lookup
//! - **Spatial predicates** evaluated through the DE-9IM matrix (geo crate)
//! - **Query filters** combining a spatial predicate with attribute equality
//! - The [`FeatureStore`] trait with scoped read/update/insert cursors and a single
//!   store-wide transaction
//! - [`MemoryFeatureStore`], an embedded implementation with bbox prefiltering
//!   and an undo-log transaction
//!
//! ```text
//!   QueryFilter ──► FeatureStore::search / update
//!                          │
//!                          ▼
//!                   BBox prefilter (per predicate)
//!                          │
//!                          ▼
//!                   Exact predicate refine (geo::Relate)
//!                          │
//!                          ▼
//!                   Feature (owned snapshot)
//! ```
//!
//! # Modules
//!
//! - [`feature`]: Feature records, values, schemas
//! - [`geometry`]: WKT parsing, bounding boxes, lengths
//! - [`predicate`]: Spatial predicates and relationships
//! - [`filter`]: Query filters
//! - [`store`]: Store and cursor traits
//! - [`memory`]: In-memory store
//! - [`error`]: Error types

pub mod error;
pub mod feature;
pub mod filter;
pub mod geometry;
pub mod memory;
pub mod predicate;
pub mod store;

pub use error::{GeometryError, Result, StoreError};
pub use feature::{Feature, FeatureId, FieldDef, FieldIndex, FieldKind, FieldValue, Schema};
pub use filter::{AttributeFilter, QueryFilter, SpatialFilter};
pub use geometry::{line_length, parse_wkt, BBox};
pub use memory::MemoryFeatureStore;
pub use predicate::{Relationship, SpatialPredicate};
pub use store::{CollectionId, FeatureCursor, FeatureStore, InsertCursor, UpdateCursor};
