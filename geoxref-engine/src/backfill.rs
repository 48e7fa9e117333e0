//! Attribute backfill within a single collection.
//!
//! Records matching an optional equality condition are selected; those with
//! an empty target field receive the (trimmed) source field value. Writes
//! share one transaction, so a failure leaves the collection untouched.

use crate::config::BackfillJob;
use crate::error::{Result, ValidationError};
use crate::field::FieldAccessor;
use crate::report::SelectionSet;
use crate::session::EditSession;
use geoxref_store::{line_length, Feature, FeatureId, FeatureStore, QueryFilter};
use serde::Serialize;

/// Outcome of a backfill run.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BackfillReport {
    /// Records passing the condition.
    pub matched_count: usize,

    /// Records whose target field was written.
    pub modified_count: usize,

    pub selection: SelectionSet,

    /// Longest line record among the matches, as `(id, length)`.
    pub longest: Option<(FeatureId, f64)>,
}

impl BackfillReport {
    fn observe_length(&mut self, feature: &Feature) {
        let Ok(geometry) = feature.geometry() else {
            return;
        };
        let Some(length) = line_length(&geometry) else {
            return;
        };
        match self.longest {
            Some((_, best)) if best >= length => {}
            _ => self.longest = Some((feature.id(), length)),
        }
    }
}

/// Copies one attribute into another on records of a collection.
pub struct AttributeBackfill<'s, S: FeatureStore + ?Sized> {
    store: &'s S,
}

impl<'s, S: FeatureStore + ?Sized> AttributeBackfill<'s, S> {
    pub fn new(store: &'s S) -> Self {
        Self { store }
    }

    pub fn run(&self, job: &BackfillJob) -> Result<BackfillReport> {
        let span = tracing::info_span!("backfill", collection = %job.collection);
        let _guard = span.enter();

        let collection = self
            .store
            .collection(&job.collection)
            .ok_or_else(|| ValidationError::CollectionNotFound(job.collection.clone()))?;
        let source = FieldAccessor::resolve(self.store, collection, &job.source_field)?;
        let target = FieldAccessor::resolve_writable(self.store, collection, &job.target_field)?;

        let filter = match &job.condition {
            Some(condition) => {
                let field = FieldAccessor::resolve(self.store, collection, &condition.field)?;
                QueryFilter::attribute(field.index(), condition.equals.as_str())
            }
            None => QueryFilter::all(),
        };

        let session = EditSession::begin(self.store)?;
        let mut report = BackfillReport::default();
        {
            let mut cursor = self.store.update(collection, &filter)?;
            while let Some(mut feature) = cursor.next_feature()? {
                report.matched_count += 1;
                report.selection.insert(feature.id());
                report.observe_length(&feature);

                if !target.is_empty(&feature) {
                    continue;
                }
                let value = source.read(&feature).trim().to_string();
                if value.is_empty() {
                    continue;
                }

                target.write(&mut feature, value);
                cursor.update_feature(&feature)?;
                report.modified_count += 1;
            }
        }
        session.commit()?;

        tracing::info!(
            matched = report.matched_count,
            modified = report.modified_count,
            longest = ?report.longest,
            "backfill completed"
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::XrefError;
    use geoxref_store::{FieldDef, FieldValue, MemoryFeatureStore, Schema};

    fn roads() -> MemoryFeatureStore {
        let store = MemoryFeatureStore::new();
        let coll = store
            .create_collection(
                "LRDL",
                Schema::new(vec![
                    FieldDef::number("GB"),
                    FieldDef::text("RuleID"),
                    FieldDef::text("name"),
                ]),
            )
            .unwrap();
        store
            .insert(
                coll,
                1,
                "LINESTRING(0 0, 3 4)",
                vec![FieldValue::Number(210400.0), " R1 ".into(), FieldValue::Null],
            )
            .unwrap();
        store
            .insert(
                coll,
                2,
                "LINESTRING(0 0, 0 20)",
                vec![FieldValue::Number(210400.0), "R2".into(), "Main St".into()],
            )
            .unwrap();
        store
            .insert(
                coll,
                3,
                "LINESTRING(0 0, 100 0)",
                vec![FieldValue::Number(230101.0), "R3".into(), FieldValue::Null],
            )
            .unwrap();
        store
    }

    #[test]
    fn test_conditional_backfill() {
        let store = roads();
        let job = BackfillJob::new("LRDL", "RuleID", "name").with_condition("GB", "210400");
        let report = AttributeBackfill::new(&store).run(&job).unwrap();

        assert_eq!(report.matched_count, 2);
        assert_eq!(report.modified_count, 1);
        assert_eq!(report.selection.to_vec(), vec![1, 2]);
        assert_eq!(report.longest, Some((2, 20.0)));

        let coll = store.collection("LRDL").unwrap();
        assert_eq!(store.get(coll, 1).unwrap().values()[2].as_text(), "R1");
        assert_eq!(store.get(coll, 2).unwrap().values()[2].as_text(), "Main St");
        assert!(store.get(coll, 3).unwrap().values()[2].is_null());
    }

    #[test]
    fn test_unconditional_backfill_is_idempotent() {
        let store = roads();
        let job = BackfillJob::new("LRDL", "RuleID", "name");
        let first = AttributeBackfill::new(&store).run(&job).unwrap();
        assert_eq!(first.matched_count, 3);
        assert_eq!(first.modified_count, 2);
        assert_eq!(first.longest, Some((3, 100.0)));

        let second = AttributeBackfill::new(&store).run(&job).unwrap();
        assert_eq!(second.matched_count, 3);
        assert_eq!(second.modified_count, 0);
    }

    #[test]
    fn test_missing_condition_field() {
        let store = roads();
        let job = BackfillJob::new("LRDL", "RuleID", "name").with_condition("class", "x");
        let err = AttributeBackfill::new(&store).run(&job).unwrap_err();
        assert!(matches!(
            err,
            XrefError::Validation(ValidationError::FieldNotFound { .. })
        ));
        assert!(!store.in_transaction());
    }
}
