//! Job configuration types.
//!
//! Jobs are immutable value objects for the duration of a run. They can be
//! built in code with the `with_*` setters or deserialized from JSON.

use crate::error::Result;
use geoxref_store::SpatialPredicate;
use serde::{Deserialize, Serialize};

fn default_separator() -> String {
    ",".to_string()
}

fn default_predicate() -> SpatialPredicate {
    SpatialPredicate::Crosses
}

fn default_index_field() -> String {
    "index".to_string()
}

fn default_tolerance() -> f64 {
    0.001
}

/// Configuration for a cross-reference run.
///
/// For every target feature, source features satisfying
/// `predicate(target, source)` contribute their `source_field` values to the
/// target's `target_field`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrossReferenceJob {
    /// Collection providing values.
    pub source_collection: String,

    /// Collection receiving values.
    pub target_collection: String,

    /// Field read from matched source features.
    pub source_field: String,

    /// Field written on target features.
    pub target_field: String,

    /// Spatial predicate, evaluated as `target <predicate> source`.
    /// Default: crosses
    #[serde(default = "default_predicate")]
    pub predicate: SpatialPredicate,

    /// Value written to targets without any match. Empty means "write nothing".
    #[serde(default)]
    pub fallback_value: String,

    /// Separator used to join aggregated values.
    /// Default: ","
    #[serde(default = "default_separator")]
    pub separator: String,
}

impl CrossReferenceJob {
    /// Create a job with the default predicate, no fallback and `,` separator.
    pub fn new(
        source_collection: impl Into<String>,
        target_collection: impl Into<String>,
        source_field: impl Into<String>,
        target_field: impl Into<String>,
    ) -> Self {
        Self {
            source_collection: source_collection.into(),
            target_collection: target_collection.into(),
            source_field: source_field.into(),
            target_field: target_field.into(),
            predicate: default_predicate(),
            fallback_value: String::new(),
            separator: default_separator(),
        }
    }

    /// Set the spatial predicate.
    pub fn with_predicate(mut self, predicate: SpatialPredicate) -> Self {
        self.predicate = predicate;
        self
    }

    /// Set the value written to targets without matches.
    pub fn with_fallback(mut self, fallback: impl Into<String>) -> Self {
        self.fallback_value = fallback.into();
        self
    }

    /// Set the separator used to join aggregated values.
    pub fn with_separator(mut self, separator: impl Into<String>) -> Self {
        self.separator = separator.into();
        self
    }

    /// Parse a job from JSON.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

/// Attribute equality condition selecting the records a backfill touches.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldCondition {
    pub field: String,
    pub equals: String,
}

/// Configuration for an attribute backfill within one collection.
///
/// Records passing `condition` join the selection; those whose
/// `target_field` is empty receive the value of `source_field`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackfillJob {
    pub collection: String,

    #[serde(default)]
    pub condition: Option<FieldCondition>,

    pub source_field: String,

    pub target_field: String,
}

impl BackfillJob {
    pub fn new(
        collection: impl Into<String>,
        source_field: impl Into<String>,
        target_field: impl Into<String>,
    ) -> Self {
        Self {
            collection: collection.into(),
            condition: None,
            source_field: source_field.into(),
            target_field: target_field.into(),
        }
    }

    /// Restrict the backfill to records whose `field` equals `equals`.
    pub fn with_condition(mut self, field: impl Into<String>, equals: impl Into<String>) -> Self {
        self.condition = Some(FieldCondition {
            field: field.into(),
            equals: equals.into(),
        });
        self
    }
}

/// Configuration for copying every feature of one collection into another,
/// empty, collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CopyJob {
    pub source_collection: String,

    /// Must hold no features when the copy starts.
    pub target_collection: String,
}

impl CopyJob {
    pub fn new(source_collection: impl Into<String>, target_collection: impl Into<String>) -> Self {
        Self {
            source_collection: source_collection.into(),
            target_collection: target_collection.into(),
        }
    }

    /// Parse a job from JSON.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

/// Configuration for locating the dangling ends of a line network.
///
/// A line end is dangling when no other feature touches the square of
/// half-width `tolerance` around it. Each line with a dangling end gets its
/// position in collection order written to `index_field`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EndpointJob {
    pub collection: String,

    /// Field receiving the feature's traversal position.
    /// Default: "index"
    #[serde(default = "default_index_field")]
    pub index_field: String,

    /// Half-width of the search square around each line end.
    /// Default: 0.001
    #[serde(default = "default_tolerance")]
    pub tolerance: f64,
}

impl EndpointJob {
    pub fn new(collection: impl Into<String>) -> Self {
        Self {
            collection: collection.into(),
            index_field: default_index_field(),
            tolerance: default_tolerance(),
        }
    }

    pub fn with_index_field(mut self, field: impl Into<String>) -> Self {
        self.index_field = field.into();
        self
    }

    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }

    /// Parse a job from JSON.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}
