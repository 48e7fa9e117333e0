//! Engine error types.

use geoxref_store::{GeometryError, StoreError};
use thiserror::Error;

/// Problems with a job's inputs, detected before any cursor is opened.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// No collection with this name in the store.
    #[error("Collection not found: {0}")]
    CollectionNotFound(String),

    /// Field name does not resolve on the collection.
    #[error("Field {field} not found on collection {collection}")]
    FieldNotFound { collection: String, field: String },

    /// Field exists but cannot hold the values the job writes.
    #[error("Field {field} on collection {collection} is not a text field")]
    FieldNotWritable { collection: String, field: String },

    /// Source and target resolve to the same collection.
    #[error("Source and target are the same collection: {0}")]
    SameCollection(String),

    /// A copy target already holds features.
    #[error("Target collection {collection} is not empty ({count} features)")]
    TargetNotEmpty { collection: String, count: usize },

    /// Fields sharing a name across two collections disagree on their kind.
    #[error("Field {field} is {source_kind} on the source but {target_kind} on the target")]
    FieldKindMismatch {
        field: String,
        source_kind: &'static str,
        target_kind: &'static str,
    },

    /// No feature carries the requested name.
    #[error("No feature named {name} in collection {collection}")]
    FeatureNotFound { collection: String, name: String },
}

/// Errors surfaced by engine operations.
#[derive(Error, Debug)]
pub enum XrefError {
    /// Job validation failed; nothing was mutated.
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Store failure; the run's writes were rolled back.
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Geometry could not be used.
    #[error("Geometry error: {0}")]
    Geometry(#[from] GeometryError),

    /// Job configuration could not be parsed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// IO error writing a report sink.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Run stopped by its cancellation flag; the run's writes were rolled back.
    #[error("Run cancelled")]
    Cancelled,
}

/// Result type for engine operations.
pub type Result<T> = std::result::Result<T, XrefError>;
