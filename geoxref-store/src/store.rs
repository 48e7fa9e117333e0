//! Feature store trait.
//!
//! Abstracts over the host's feature collections so the cross-reference
//! engine works identically against the embedded [`MemoryFeatureStore`] or an
//! adapter over an external geodatabase.
//!
//! # Cursors
//!
//! Read cursors (`search`), update cursors (`update`) and insert cursors
//! (`insert_cursor`) are scoped handles:
//! dropping a cursor releases its hold on the collection, so every exit path
//! (including `?` propagation) gives the handle back. Two cursors may be open
//! at once on *different* collections, and read cursors may share one. Update
//! and insert cursors hold their collection exclusively; opening a second cursor on that collection fails with
//! [`StoreError::CollectionLocked`](crate::StoreError::CollectionLocked).
//!
//! # Transactions
//!
//! At most one transaction is active per store. Writes made through update
//! or insert cursors while a transaction is active are undone by
//! `rollback_transaction`.
//!
//! [`MemoryFeatureStore`]: crate::MemoryFeatureStore

use crate::error::Result;
use crate::feature::{Feature, FeatureId, FieldValue, Schema};
use crate::filter::QueryFilter;
use std::sync::Arc;

/// Opaque handle to a collection within a store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CollectionId(usize);

impl CollectionId {
    pub fn new(index: usize) -> Self {
        Self(index)
    }

    pub fn index(self) -> usize {
        self.0
    }
}

/// Forward-only cursor over the features selected by a filter.
pub trait FeatureCursor {
    /// Fetch the next feature, or `None` when the cursor is exhausted.
    fn next_feature(&mut self) -> Result<Option<Feature>>;
}

/// Cursor that can write back the feature it is positioned on.
pub trait UpdateCursor: FeatureCursor {
    /// Persist the attribute values of `feature`, which must be the feature
    /// most recently returned by `next_feature`. Geometry is not written.
    fn update_feature(&mut self, feature: &Feature) -> Result<()>;
}

/// Cursor that appends new features to a collection.
pub trait InsertCursor {
    /// Store a feature with positional `values` and return the id the store
    /// assigned to it.
    fn insert_feature(&mut self, wkt: &str, values: Vec<FieldValue>) -> Result<FeatureId>;
}

/// Feature store collaborator.
pub trait FeatureStore {
    /// Resolve a collection by name.
    fn collection(&self, name: &str) -> Option<CollectionId>;

    /// Name of a collection (for diagnostics).
    fn collection_name(&self, collection: CollectionId) -> Result<String>;

    /// Attribute schema of a collection.
    fn schema(&self, collection: CollectionId) -> Result<Arc<Schema>>;

    /// Number of features in a collection.
    fn feature_count(&self, collection: CollectionId) -> Result<usize>;

    /// Open a read cursor.
    fn search<'a>(
        &'a self,
        collection: CollectionId,
        filter: &QueryFilter,
    ) -> Result<Box<dyn FeatureCursor + 'a>>;

    /// Open an update cursor. Holds the collection exclusively until dropped.
    fn update<'a>(
        &'a self,
        collection: CollectionId,
        filter: &QueryFilter,
    ) -> Result<Box<dyn UpdateCursor + 'a>>;

    /// Open an insert cursor. Holds the collection exclusively until dropped.
    fn insert_cursor<'a>(&'a self, collection: CollectionId) -> Result<Box<dyn InsertCursor + 'a>>;

    /// Start a transaction.
    fn begin_transaction(&self) -> Result<()>;

    /// Make all writes since `begin_transaction` permanent.
    fn commit_transaction(&self) -> Result<()>;

    /// Undo all writes since `begin_transaction`.
    fn rollback_transaction(&self) -> Result<()>;
}
