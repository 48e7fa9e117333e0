//! Shared harness for geoxref-engine integration tests.

// Not every test crate uses every helper.
#![allow(dead_code)]

pub mod tracing;

use geoxref_store::{
    CollectionId, Feature, FeatureCursor, FeatureId, FeatureStore, FieldDef, FieldValue,
    InsertCursor, MemoryFeatureStore, QueryFilter, Result, Schema, StoreError, UpdateCursor,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

// =============================================================================
// Geometry fixtures
// =============================================================================

/// Square polygon with its lower-left corner at `(x, y)`.
pub fn square(x: f64, y: f64, size: f64) -> String {
    format!(
        "POLYGON(({x} {y}, {} {y}, {} {}, {x} {}, {x} {y}))",
        x + size,
        x + size,
        y + size,
        y + size,
    )
}

/// Horizontal line at height `y` from `x0` to `x1`.
pub fn hline(x0: f64, x1: f64, y: f64) -> String {
    format!("LINESTRING({x0} {y}, {x1} {y})")
}

// =============================================================================
// Store fixtures
// =============================================================================

pub const SOURCE: &str = "RESA";
pub const TARGET: &str = "LRDL";

/// Store with an empty `RESA` polygon collection (`name`) and an empty
/// `LRDL` line collection (`class1`, `GB`).
pub fn empty_store() -> (MemoryFeatureStore, CollectionId, CollectionId) {
    let store = MemoryFeatureStore::new();
    let source = store
        .create_collection(SOURCE, Schema::new(vec![FieldDef::text("name")]))
        .unwrap();
    let target = store
        .create_collection(
            TARGET,
            Schema::new(vec![FieldDef::text("class1"), FieldDef::number("GB")]),
        )
        .unwrap();
    (store, source, target)
}

pub fn add_source(store: &MemoryFeatureStore, coll: CollectionId, id: u64, wkt: &str, name: &str) {
    store.insert(coll, id, wkt, vec![name.into()]).unwrap();
}

pub fn add_target(store: &MemoryFeatureStore, coll: CollectionId, id: u64, wkt: &str, class1: Option<&str>) {
    let value = class1.map(FieldValue::from).unwrap_or_default();
    store.insert(coll, id, wkt, vec![value]).unwrap();
}

/// Text of `class1` on a target feature; null reads as `""`.
pub fn class1(store: &MemoryFeatureStore, id: u64) -> String {
    let coll = store.collection(TARGET).unwrap();
    store.get(coll, id).unwrap().values()[0].as_text().into_owned()
}

// =============================================================================
// FlakyStore: fails the Nth write, or the commit
// =============================================================================

/// Delegates to a [`MemoryFeatureStore`] but fails the `fail_at`-th write
/// (1-based, counting `update_feature` and `insert_feature` calls) with a
/// write error. A store built with [`FlakyStore::failing_commit`] accepts
/// every write and refuses the commit instead.
pub struct FlakyStore {
    inner: MemoryFeatureStore,
    fail_at: usize,
    fail_commit: bool,
    writes: Arc<AtomicUsize>,
}

impl FlakyStore {
    pub fn new(inner: MemoryFeatureStore, fail_at: usize) -> Self {
        Self {
            inner,
            fail_at,
            fail_commit: false,
            writes: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn failing_commit(inner: MemoryFeatureStore) -> Self {
        Self {
            fail_commit: true,
            ..Self::new(inner, 0)
        }
    }

    pub fn inner(&self) -> &MemoryFeatureStore {
        &self.inner
    }

    /// Writes attempted so far, including the failed one.
    pub fn write_attempts(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }
}

fn count_write(writes: &AtomicUsize, fail_at: usize, what: std::fmt::Arguments<'_>) -> Result<()> {
    let attempt = writes.fetch_add(1, Ordering::SeqCst) + 1;
    if attempt == fail_at {
        return Err(StoreError::Write(format!("injected failure writing {what}")));
    }
    Ok(())
}

struct FlakyCursor<'a> {
    inner: Box<dyn UpdateCursor + 'a>,
    fail_at: usize,
    writes: Arc<AtomicUsize>,
}

impl FeatureCursor for FlakyCursor<'_> {
    fn next_feature(&mut self) -> Result<Option<Feature>> {
        self.inner.next_feature()
    }
}

impl UpdateCursor for FlakyCursor<'_> {
    fn update_feature(&mut self, feature: &Feature) -> Result<()> {
        count_write(&self.writes, self.fail_at, format_args!("feature {}", feature.id()))?;
        self.inner.update_feature(feature)
    }
}

struct FlakyInserter<'a> {
    inner: Box<dyn InsertCursor + 'a>,
    fail_at: usize,
    writes: Arc<AtomicUsize>,
}

impl InsertCursor for FlakyInserter<'_> {
    fn insert_feature(&mut self, wkt: &str, values: Vec<FieldValue>) -> Result<FeatureId> {
        count_write(&self.writes, self.fail_at, format_args!("new feature"))?;
        self.inner.insert_feature(wkt, values)
    }
}

impl FeatureStore for FlakyStore {
    fn collection(&self, name: &str) -> Option<CollectionId> {
        self.inner.collection(name)
    }

    fn collection_name(&self, collection: CollectionId) -> Result<String> {
        self.inner.collection_name(collection)
    }

    fn schema(&self, collection: CollectionId) -> Result<Arc<Schema>> {
        self.inner.schema(collection)
    }

    fn feature_count(&self, collection: CollectionId) -> Result<usize> {
        self.inner.feature_count(collection)
    }

    fn search<'a>(
        &'a self,
        collection: CollectionId,
        filter: &QueryFilter,
    ) -> Result<Box<dyn FeatureCursor + 'a>> {
        self.inner.search(collection, filter)
    }

    fn update<'a>(
        &'a self,
        collection: CollectionId,
        filter: &QueryFilter,
    ) -> Result<Box<dyn UpdateCursor + 'a>> {
        Ok(Box::new(FlakyCursor {
            inner: self.inner.update(collection, filter)?,
            fail_at: self.fail_at,
            writes: Arc::clone(&self.writes),
        }))
    }

    fn insert_cursor<'a>(&'a self, collection: CollectionId) -> Result<Box<dyn InsertCursor + 'a>> {
        Ok(Box::new(FlakyInserter {
            inner: self.inner.insert_cursor(collection)?,
            fail_at: self.fail_at,
            writes: Arc::clone(&self.writes),
        }))
    }

    fn begin_transaction(&self) -> Result<()> {
        self.inner.begin_transaction()
    }

    fn commit_transaction(&self) -> Result<()> {
        if self.fail_commit {
            return Err(StoreError::Write("injected commit failure".to_string()));
        }
        self.inner.commit_transaction()
    }

    fn rollback_transaction(&self) -> Result<()> {
        self.inner.rollback_transaction()
    }
}
