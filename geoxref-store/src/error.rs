//! Error types for feature stores and geometry handling.

use crate::feature::FeatureId;
use thiserror::Error;

/// Feature store errors.
#[derive(Error, Debug)]
pub enum StoreError {
    /// Collection handle does not refer to a collection in this store.
    #[error("Unknown collection: {0}")]
    UnknownCollection(String),

    /// A collection with this name already exists.
    #[error("Collection already exists: {0}")]
    CollectionExists(String),

    /// Feature id is already used within the collection.
    #[error("Duplicate feature id {id} in collection {collection}")]
    DuplicateFeature { collection: String, id: FeatureId },

    /// The collection is bound to an open cursor that excludes this access.
    #[error("Collection locked: {collection} ({reason})")]
    CollectionLocked {
        collection: String,
        reason: &'static str,
    },

    /// A transaction is already open on this store.
    #[error("A transaction is already active")]
    TransactionActive,

    /// Commit or rollback without an open transaction.
    #[error("No active transaction")]
    NoTransaction,

    /// Update issued for a feature the cursor is not positioned on.
    #[error("Stale feature {id} in collection {collection}: cursor is not positioned on it")]
    StaleFeature { collection: String, id: FeatureId },

    /// Field index does not exist in the collection schema.
    #[error("Field index {index} out of range for collection {collection}")]
    FieldOutOfRange { collection: String, index: usize },

    /// Value does not fit the declared field kind.
    #[error("Field {field} expects {expected} values")]
    KindMismatch {
        field: String,
        expected: &'static str,
    },

    /// Query failure reported by an external store.
    #[error("Query error: {0}")]
    Query(String),

    /// Write failure reported by an external store.
    #[error("Write error: {0}")]
    Write(String),
}

/// Errors raised while turning a stored shape into a usable geometry.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GeometryError {
    /// WKT parsing error.
    #[error("WKT parse error: {0}")]
    WktParse(String),

    /// The geometry parsed but has no points.
    #[error("Empty geometry on feature {0}")]
    Empty(FeatureId),
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
