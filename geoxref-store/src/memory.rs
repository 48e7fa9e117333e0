//! In-memory feature store.
//!
//! Collections live behind a `parking_lot::RwLock` so cursors can borrow the
//! store immutably while the store tracks which collections are held by open
//! cursors. Locks are only taken for the duration of a single cursor step;
//! nothing is held between `next_feature` calls.
//!
//! Shapes are parsed once, when a feature is inserted, and kept next to their
//! bounding box. Features whose WKT does not parse are still stored (the
//! engine decides what to do with them); they carry no bbox and never match a
//! spatial filter as candidates.

use crate::error::{GeometryError, Result, StoreError};
use crate::feature::{Feature, FeatureId, FieldValue, Schema};
use crate::filter::QueryFilter;
use crate::geometry::{parse_feature_shape, BBox};
use crate::store::{CollectionId, FeatureCursor, FeatureStore, InsertCursor, UpdateCursor};
use geo_types::Geometry;
use parking_lot::RwLock;
use rustc_hash::{FxHashMap, FxHashSet};
use std::fmt::Debug;
use std::sync::Arc;

struct StoredFeature {
    feature: Feature,
    shape: std::result::Result<Geometry<f64>, GeometryError>,
    bbox: Option<BBox>,
}

impl StoredFeature {
    fn new(feature: Feature) -> Self {
        let shape = parse_feature_shape(feature.id(), feature.wkt());
        let bbox = shape.as_ref().ok().and_then(BBox::from_geometry);
        Self {
            feature,
            shape,
            bbox,
        }
    }
}

struct Collection {
    name: String,
    schema: Arc<Schema>,
    features: Vec<StoredFeature>,
    ids: FxHashSet<FeatureId>,
    readers: usize,
    writer: bool,
}

impl Collection {
    fn locked(&self, reason: &'static str) -> StoreError {
        StoreError::CollectionLocked {
            collection: self.name.clone(),
            reason,
        }
    }

    /// Validate `values` against the schema and append the feature.
    fn push(&mut self, id: FeatureId, wkt: &str, mut values: Vec<FieldValue>) -> Result<()> {
        if self.ids.contains(&id) {
            return Err(StoreError::DuplicateFeature {
                collection: self.name.clone(),
                id,
            });
        }
        if values.len() > self.schema.len() {
            return Err(StoreError::FieldOutOfRange {
                collection: self.name.clone(),
                index: values.len() - 1,
            });
        }
        if let Some(err) = kind_mismatch(&self.schema, &values) {
            return Err(err);
        }
        values.resize(self.schema.len(), FieldValue::Null);

        self.ids.insert(id);
        self.features.push(StoredFeature::new(Feature::new(id, wkt, values)));
        Ok(())
    }

    fn next_id(&self) -> FeatureId {
        self.ids.iter().max().map_or(1, |max| max + 1)
    }
}

/// One change recorded while a transaction is active.
enum UndoEntry {
    /// Pre-image of a feature's values.
    Values {
        collection: usize,
        position: usize,
        values: Vec<FieldValue>,
    },
    /// A feature appended through an insert cursor.
    Insert { collection: usize, id: FeatureId },
}

#[derive(Default)]
struct StoreState {
    collections: Vec<Collection>,
    names: FxHashMap<String, CollectionId>,
    transaction: Option<Vec<UndoEntry>>,
}

impl StoreState {
    fn get(&self, id: CollectionId) -> Result<&Collection> {
        self.collections
            .get(id.index())
            .ok_or_else(|| StoreError::UnknownCollection(format!("#{}", id.index())))
    }

    fn get_mut(&mut self, id: CollectionId) -> Result<&mut Collection> {
        self.collections
            .get_mut(id.index())
            .ok_or_else(|| StoreError::UnknownCollection(format!("#{}", id.index())))
    }
}

/// Embedded feature store.
#[derive(Default)]
pub struct MemoryFeatureStore {
    state: RwLock<StoreState>,
}

impl Debug for MemoryFeatureStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.read();
        f.debug_struct("MemoryFeatureStore")
            .field("collection_count", &state.collections.len())
            .field("in_transaction", &state.transaction.is_some())
            .finish()
    }
}

impl MemoryFeatureStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a named collection with the given schema.
    pub fn create_collection(&self, name: &str, schema: Schema) -> Result<CollectionId> {
        let mut state = self.state.write();
        if state.names.contains_key(name) {
            return Err(StoreError::CollectionExists(name.to_string()));
        }

        let id = CollectionId::new(state.collections.len());
        state.collections.push(Collection {
            name: name.to_string(),
            schema: Arc::new(schema),
            features: Vec::new(),
            ids: FxHashSet::default(),
            readers: 0,
            writer: false,
        });
        state.names.insert(name.to_string(), id);
        tracing::debug!(collection = name, "collection created");
        Ok(id)
    }

    /// Append a feature. Values are positional against the schema; missing
    /// trailing values are stored as null.
    pub fn insert(
        &self,
        collection: CollectionId,
        id: FeatureId,
        wkt: &str,
        values: Vec<FieldValue>,
    ) -> Result<()> {
        let mut state = self.state.write();
        let coll = state.get_mut(collection)?;

        if coll.writer {
            return Err(coll.locked("insert while an update cursor is open"));
        }
        coll.push(id, wkt, values)
    }

    /// Look up a feature by id.
    pub fn get(&self, collection: CollectionId, id: FeatureId) -> Option<Feature> {
        let state = self.state.read();
        let coll = state.collections.get(collection.index())?;
        coll.features
            .iter()
            .find(|f| f.feature.id() == id)
            .map(|f| f.feature.clone())
    }

    /// Whether a transaction is currently active.
    pub fn in_transaction(&self) -> bool {
        self.state.read().transaction.is_some()
    }

    /// Number of cursors currently open on a collection.
    pub fn open_cursors(&self, collection: CollectionId) -> usize {
        let state = self.state.read();
        state
            .collections
            .get(collection.index())
            .map(|c| c.readers + usize::from(c.writer))
            .unwrap_or(0)
    }

    fn open(&self, collection: CollectionId, exclusive: bool) -> Result<()> {
        let mut state = self.state.write();
        let coll = state.get_mut(collection)?;
        if coll.writer {
            return Err(coll.locked("held by an update cursor"));
        }
        if exclusive {
            if coll.readers > 0 {
                return Err(coll.locked("read cursors are open"));
            }
            coll.writer = true;
        } else {
            coll.readers += 1;
        }
        tracing::trace!(collection = %coll.name, exclusive, "cursor opened");
        Ok(())
    }

    fn release(&self, collection: CollectionId, exclusive: bool) {
        let mut state = self.state.write();
        if let Some(coll) = state.collections.get_mut(collection.index()) {
            if exclusive {
                coll.writer = false;
            } else {
                coll.readers = coll.readers.saturating_sub(1);
            }
            tracing::trace!(collection = %coll.name, exclusive, "cursor released");
        }
    }

    /// Advance from `position` to the next feature passing `filter`.
    ///
    /// Returns the feature and the position just past it.
    fn advance(
        &self,
        collection: CollectionId,
        position: usize,
        filter: &QueryFilter,
    ) -> Result<Option<(usize, Feature)>> {
        let state = self.state.read();
        let coll = state.get(collection)?;

        for (offset, stored) in coll.features[position.min(coll.features.len())..]
            .iter()
            .enumerate()
        {
            if let Some(attribute) = &filter.attribute {
                if !attribute.matches(&stored.feature) {
                    continue;
                }
            }

            if let Some(spatial) = &filter.spatial {
                if !spatial.may_match(stored.bbox.as_ref()) {
                    continue;
                }
                match &stored.shape {
                    Ok(geom) => {
                        if !spatial.matches(geom) {
                            continue;
                        }
                    }
                    Err(err) => {
                        tracing::debug!(
                            collection = %coll.name,
                            feature_id = stored.feature.id(),
                            error = %err,
                            "skipping candidate with unusable geometry"
                        );
                        continue;
                    }
                }
            }

            return Ok(Some((position + offset + 1, stored.feature.clone())));
        }

        Ok(None)
    }

    fn write_back(&self, collection: CollectionId, position: usize, feature: &Feature) -> Result<()> {
        let mut guard = self.state.write();
        let state = &mut *guard;
        let coll = state
            .collections
            .get_mut(collection.index())
            .ok_or_else(|| StoreError::UnknownCollection(format!("#{}", collection.index())))?;

        if feature.values().len() > coll.schema.len() {
            return Err(StoreError::FieldOutOfRange {
                collection: coll.name.clone(),
                index: feature.values().len() - 1,
            });
        }
        if let Some(err) = kind_mismatch(&coll.schema, feature.values()) {
            return Err(err);
        }

        let slot = match position.checked_sub(1) {
            Some(slot) if coll.features.get(slot).map(|s| s.feature.id()) == Some(feature.id()) => {
                slot
            }
            _ => {
                return Err(StoreError::StaleFeature {
                    collection: coll.name.clone(),
                    id: feature.id(),
                })
            }
        };

        let mut values = feature.values().to_vec();
        values.resize(coll.schema.len(), FieldValue::Null);
        let previous = coll.features[slot].feature.replace_values(values);

        if let Some(undo) = state.transaction.as_mut() {
            undo.push(UndoEntry::Values {
                collection: collection.index(),
                position: slot,
                values: previous,
            });
        }
        Ok(())
    }

    fn append(
        &self,
        collection: CollectionId,
        wkt: &str,
        values: Vec<FieldValue>,
    ) -> Result<FeatureId> {
        let mut guard = self.state.write();
        let state = &mut *guard;
        let coll = state
            .collections
            .get_mut(collection.index())
            .ok_or_else(|| StoreError::UnknownCollection(format!("#{}", collection.index())))?;

        let id = coll.next_id();
        coll.push(id, wkt, values)?;

        if let Some(undo) = state.transaction.as_mut() {
            undo.push(UndoEntry::Insert {
                collection: collection.index(),
                id,
            });
        }
        tracing::trace!(collection = %coll.name, feature_id = id, "feature inserted");
        Ok(id)
    }
}

fn kind_mismatch(schema: &Schema, values: &[FieldValue]) -> Option<StoreError> {
    schema
        .fields()
        .iter()
        .zip(values)
        .find(|(def, value)| !def.kind.accepts(value))
        .map(|(def, _)| StoreError::KindMismatch {
            field: def.name.clone(),
            expected: def.kind.as_str(),
        })
}

impl FeatureStore for MemoryFeatureStore {
    fn collection(&self, name: &str) -> Option<CollectionId> {
        self.state.read().names.get(name).copied()
    }

    fn collection_name(&self, collection: CollectionId) -> Result<String> {
        Ok(self.state.read().get(collection)?.name.clone())
    }

    fn schema(&self, collection: CollectionId) -> Result<Arc<Schema>> {
        Ok(Arc::clone(&self.state.read().get(collection)?.schema))
    }

    fn feature_count(&self, collection: CollectionId) -> Result<usize> {
        Ok(self.state.read().get(collection)?.features.len())
    }

    fn search<'a>(
        &'a self,
        collection: CollectionId,
        filter: &QueryFilter,
    ) -> Result<Box<dyn FeatureCursor + 'a>> {
        self.open(collection, false)?;
        Ok(Box::new(MemoryCursor {
            store: self,
            collection,
            filter: filter.clone(),
            position: 0,
            exclusive: false,
        }))
    }

    fn update<'a>(
        &'a self,
        collection: CollectionId,
        filter: &QueryFilter,
    ) -> Result<Box<dyn UpdateCursor + 'a>> {
        self.open(collection, true)?;
        Ok(Box::new(MemoryCursor {
            store: self,
            collection,
            filter: filter.clone(),
            position: 0,
            exclusive: true,
        }))
    }

    fn insert_cursor<'a>(&'a self, collection: CollectionId) -> Result<Box<dyn InsertCursor + 'a>> {
        self.open(collection, true)?;
        Ok(Box::new(MemoryInserter {
            store: self,
            collection,
        }))
    }

    fn begin_transaction(&self) -> Result<()> {
        let mut state = self.state.write();
        if state.transaction.is_some() {
            return Err(StoreError::TransactionActive);
        }
        state.transaction = Some(Vec::new());
        tracing::debug!("transaction started");
        Ok(())
    }

    fn commit_transaction(&self) -> Result<()> {
        let mut state = self.state.write();
        let undo = state.transaction.take().ok_or(StoreError::NoTransaction)?;
        tracing::debug!(write_count = undo.len(), "transaction committed");
        Ok(())
    }

    fn rollback_transaction(&self) -> Result<()> {
        let mut state = self.state.write();
        let undo = state.transaction.take().ok_or(StoreError::NoTransaction)?;
        let write_count = undo.len();

        // Reverse order so a feature written twice ends at its first pre-image.
        for entry in undo.into_iter().rev() {
            match entry {
                UndoEntry::Values {
                    collection,
                    position,
                    values,
                } => {
                    if let Some(stored) = state
                        .collections
                        .get_mut(collection)
                        .and_then(|c| c.features.get_mut(position))
                    {
                        stored.feature.replace_values(values);
                    }
                }
                UndoEntry::Insert { collection, id } => {
                    if let Some(coll) = state.collections.get_mut(collection) {
                        if let Some(slot) = coll.features.iter().rposition(|f| f.feature.id() == id)
                        {
                            coll.features.remove(slot);
                        }
                        coll.ids.remove(&id);
                    }
                }
            }
        }
        tracing::debug!(write_count, "transaction rolled back");
        Ok(())
    }
}

/// Cursor over a [`MemoryFeatureStore`] collection.
struct MemoryCursor<'a> {
    store: &'a MemoryFeatureStore,
    collection: CollectionId,
    filter: QueryFilter,
    /// Index just past the last returned feature.
    position: usize,
    exclusive: bool,
}

impl FeatureCursor for MemoryCursor<'_> {
    fn next_feature(&mut self) -> Result<Option<Feature>> {
        match self
            .store
            .advance(self.collection, self.position, &self.filter)?
        {
            Some((next, feature)) => {
                self.position = next;
                Ok(Some(feature))
            }
            None => {
                self.position = usize::MAX;
                Ok(None)
            }
        }
    }
}

impl UpdateCursor for MemoryCursor<'_> {
    fn update_feature(&mut self, feature: &Feature) -> Result<()> {
        debug_assert!(self.exclusive, "update through a read cursor");
        self.store
            .write_back(self.collection, self.position, feature)
    }
}

impl Drop for MemoryCursor<'_> {
    fn drop(&mut self) {
        self.store.release(self.collection, self.exclusive);
    }
}

/// Append handle; holds its collection like an update cursor.
struct MemoryInserter<'a> {
    store: &'a MemoryFeatureStore,
    collection: CollectionId,
}

impl InsertCursor for MemoryInserter<'_> {
    fn insert_feature(&mut self, wkt: &str, values: Vec<FieldValue>) -> Result<FeatureId> {
        self.store.append(self.collection, wkt, values)
    }
}

impl Drop for MemoryInserter<'_> {
    fn drop(&mut self) {
        self.store.release(self.collection, true);
    }
}
