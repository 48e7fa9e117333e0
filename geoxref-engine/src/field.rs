//! Field resolution and null-normalized attribute access.
//!
//! A [`FieldAccessor`] resolves a field name once per run; every later read
//! and write goes through the stable index. Reads normalize the store's null
//! sentinel to the empty string so callers only ever test for emptiness.

use crate::error::{Result, ValidationError};
use geoxref_store::{
    CollectionId, Feature, FeatureStore, FieldIndex, FieldKind, FieldValue,
};
use std::borrow::Cow;

/// Resolved handle to one field of one collection.
#[derive(Debug, Clone)]
pub struct FieldAccessor {
    name: String,
    index: FieldIndex,
    kind: FieldKind,
}

impl FieldAccessor {
    /// Resolve `field` on `collection`.
    pub fn resolve<S: FeatureStore + ?Sized>(
        store: &S,
        collection: CollectionId,
        field: &str,
    ) -> Result<Self> {
        let schema = store.schema(collection)?;
        let not_found = || -> Result<Self> {
            Err(ValidationError::FieldNotFound {
                collection: store
                    .collection_name(collection)
                    .unwrap_or_else(|_| format!("#{}", collection.index())),
                field: field.to_string(),
            }
            .into())
        };

        let Some(index) = schema.find_field(field) else {
            return not_found();
        };
        let Some(def) = schema.field(index) else {
            return not_found();
        };

        Ok(Self {
            name: def.name.clone(),
            index,
            kind: def.kind,
        })
    }

    /// Resolve and require a text field (the engine writes joined strings).
    pub fn resolve_writable<S: FeatureStore + ?Sized>(
        store: &S,
        collection: CollectionId,
        field: &str,
    ) -> Result<Self> {
        let accessor = Self::resolve(store, collection, field)?;
        if accessor.kind != FieldKind::Text {
            return Err(ValidationError::FieldNotWritable {
                collection: store.collection_name(collection)?,
                field: accessor.name,
            }
            .into());
        }
        Ok(accessor)
    }

    /// Field name as declared in the schema.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn index(&self) -> FieldIndex {
        self.index
    }

    pub fn kind(&self) -> FieldKind {
        self.kind
    }

    /// Read the value as text; null reads as `""`.
    pub fn read<'f>(&self, feature: &'f Feature) -> Cow<'f, str> {
        feature.value(self.index).as_text()
    }

    /// Whether the value is null or the empty string.
    pub fn is_empty(&self, feature: &Feature) -> bool {
        self.read(feature).is_empty()
    }

    /// Set a text value on the in-memory feature; persisting is the cursor's job.
    pub fn write(&self, feature: &mut Feature, value: impl Into<String>) {
        feature.set_value(self.index, FieldValue::Text(value.into()));
    }

    /// Set a position counter, as a number or as its decimal text depending on
    /// the field kind.
    pub fn write_count(&self, feature: &mut Feature, count: usize) {
        let value = match self.kind {
            FieldKind::Number => FieldValue::Number(count as f64),
            FieldKind::Text => FieldValue::Text(count.to_string()),
        };
        feature.set_value(self.index, value);
    }
}
