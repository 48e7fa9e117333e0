//! Whole-collection feature copy.
//!
//! Every feature of the source collection is appended to an empty target
//! collection: the shape as-is, and each attribute into the target field of
//! the same name. Target fields without a source counterpart stay null.
//! The copy is a single transaction.

use crate::config::CopyJob;
use crate::error::{Result, ValidationError};
use crate::session::EditSession;
use geoxref_store::{CollectionId, Feature, FeatureId, FeatureStore, FieldIndex, FieldValue, QueryFilter};
use serde::Serialize;

/// Outcome of a copy run.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CopyReport {
    /// `(source id, new target id)` in source order.
    pub copied: Vec<(FeatureId, FeatureId)>,

    /// Source fields with no target field of the same name.
    pub unmapped_fields: Vec<String>,
}

impl CopyReport {
    pub fn copied_count(&self) -> usize {
        self.copied.len()
    }
}

/// Target-ordered source field positions, resolved once per run.
struct FieldMapping {
    slots: Vec<Option<FieldIndex>>,
    unmapped: Vec<String>,
}

impl FieldMapping {
    fn between<S: FeatureStore + ?Sized>(
        store: &S,
        source: CollectionId,
        target: CollectionId,
    ) -> Result<Self> {
        let source_schema = store.schema(source)?;
        let target_schema = store.schema(target)?;

        let mut slots = Vec::with_capacity(target_schema.len());
        for def in target_schema.fields() {
            let slot = source_schema.find_field(&def.name);
            if let Some(source_def) = slot.and_then(|index| source_schema.field(index)) {
                if source_def.kind != def.kind {
                    return Err(ValidationError::FieldKindMismatch {
                        field: def.name.clone(),
                        source_kind: source_def.kind.as_str(),
                        target_kind: def.kind.as_str(),
                    }
                    .into());
                }
            }
            slots.push(slot);
        }

        let unmapped = source_schema
            .fields()
            .iter()
            .filter(|def| target_schema.find_field(&def.name).is_none())
            .map(|def| def.name.clone())
            .collect();

        Ok(Self { slots, unmapped })
    }

    fn project(&self, feature: &Feature) -> Vec<FieldValue> {
        self.slots
            .iter()
            .map(|slot| match slot {
                Some(index) => feature.value(*index).clone(),
                None => FieldValue::Null,
            })
            .collect()
    }
}

/// Copies all features of one collection into another.
pub struct FeatureCopy<'s, S: FeatureStore + ?Sized> {
    store: &'s S,
}

impl<'s, S: FeatureStore + ?Sized> FeatureCopy<'s, S> {
    pub fn new(store: &'s S) -> Self {
        Self { store }
    }

    pub fn run(&self, job: &CopyJob) -> Result<CopyReport> {
        let span = tracing::info_span!(
            "feature_copy",
            source = %job.source_collection,
            target = %job.target_collection,
        );
        let _guard = span.enter();

        let source = self
            .store
            .collection(&job.source_collection)
            .ok_or_else(|| ValidationError::CollectionNotFound(job.source_collection.clone()))?;
        let target = self
            .store
            .collection(&job.target_collection)
            .ok_or_else(|| ValidationError::CollectionNotFound(job.target_collection.clone()))?;
        if source == target {
            return Err(ValidationError::SameCollection(job.source_collection.clone()).into());
        }

        let count = self.store.feature_count(target)?;
        if count > 0 {
            tracing::warn!(count, "copy target already holds features");
            return Err(ValidationError::TargetNotEmpty {
                collection: job.target_collection.clone(),
                count,
            }
            .into());
        }

        let mapping = FieldMapping::between(self.store, source, target)?;
        if !mapping.unmapped.is_empty() {
            tracing::debug!(fields = ?mapping.unmapped, "source fields without a target");
        }

        let session = EditSession::begin(self.store)?;
        let mut report = CopyReport {
            unmapped_fields: mapping.unmapped.clone(),
            ..CopyReport::default()
        };
        {
            let mut reader = self.store.search(source, &QueryFilter::all())?;
            let mut writer = self.store.insert_cursor(target)?;
            while let Some(feature) = reader.next_feature()? {
                let id = writer.insert_feature(feature.wkt(), mapping.project(&feature))?;
                tracing::trace!(source_id = feature.id(), target_id = id, "feature copied");
                report.copied.push((feature.id(), id));
            }
        }
        session.commit()?;

        tracing::info!(copied = report.copied_count(), "feature copy completed");
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::XrefError;
    use geoxref_store::{FieldDef, MemoryFeatureStore, Schema};

    fn store(target_fields: Vec<FieldDef>) -> MemoryFeatureStore {
        let store = MemoryFeatureStore::new();
        let source = store
            .create_collection(
                "roads",
                Schema::new(vec![FieldDef::text("name"), FieldDef::number("GB")]),
            )
            .unwrap();
        store.create_collection("roads_copy", Schema::new(target_fields)).unwrap();
        store
            .insert(source, 7, "LINESTRING(0 0, 1 1)", vec!["Main".into(), FieldValue::Number(1.0)])
            .unwrap();
        store
    }

    #[test]
    fn test_mapping_by_name() {
        let store = store(vec![FieldDef::number("gb"), FieldDef::text("note")]);
        let source = store.collection("roads").unwrap();
        let target = store.collection("roads_copy").unwrap();

        let mapping = FieldMapping::between(&store, source, target).unwrap();
        assert_eq!(mapping.unmapped, vec!["name".to_string()]);

        let feature = store.get(source, 7).unwrap();
        assert_eq!(
            mapping.project(&feature),
            vec![FieldValue::Number(1.0), FieldValue::Null]
        );
    }

    #[test]
    fn test_kind_mismatch_rejected_before_writing() {
        let store = store(vec![FieldDef::text("GB")]);
        let err = FeatureCopy::new(&store)
            .run(&CopyJob::new("roads", "roads_copy"))
            .unwrap_err();
        assert!(matches!(
            err,
            XrefError::Validation(ValidationError::FieldKindMismatch { ref field, .. }) if field == "GB"
        ));
        assert!(!store.in_transaction());
    }
}
