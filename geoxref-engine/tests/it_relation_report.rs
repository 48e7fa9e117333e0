//! Relation reporter integration tests: store lookup plus file sink.

mod support;

use geoxref_engine::SpatialRelationReporter;
use geoxref_store::{FeatureStore, FieldDef, MemoryFeatureStore, Schema};
use support::square;

fn districts() -> MemoryFeatureStore {
    let store = MemoryFeatureStore::new();
    let coll = store
        .create_collection("districts", Schema::new(vec![FieldDef::text("NAME")]))
        .unwrap();
    store
        .insert(coll, 1, &square(0.0, 0.0, 100.0), vec!["city".into()])
        .unwrap();
    store
        .insert(coll, 2, &square(10.0, 10.0, 20.0), vec!["old town".into()])
        .unwrap();
    store
        .insert(coll, 3, &square(90.0, 90.0, 20.0), vec!["harbour".into()])
        .unwrap();
    store
        .insert(coll, 4, "POLYGON((1 1, 2", vec!["corrupt".into()])
        .unwrap();
    store
}

#[test]
fn report_appends_across_invocations() {
    let store = districts();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("relations.txt");
    std::fs::write(&path, "previous run\n").unwrap();

    let reporter = SpatialRelationReporter::new();
    let named = reporter
        .resolve_named(&store, "districts", "name", &["city", "old town", "harbour"])
        .unwrap();

    let summary = reporter
        .append_to_path(&path, &named[0], &named[1..])
        .unwrap();
    assert_eq!(summary.pairs, 2);
    assert_eq!(summary.lines_written, 8);

    reporter
        .append_to_path(&path, &named[0], &named[1..])
        .unwrap();

    let text = std::fs::read_to_string(&path).unwrap();
    let lines: Vec<_> = text.lines().collect();
    assert_eq!(lines.len(), 17);
    assert_eq!(lines[0], "previous run");
    assert_eq!(lines[1], "city intersects old town: true");
    assert_eq!(lines[3], "city contains old town: true");
    assert_eq!(lines[6], "city overlaps harbour: true");
    assert_eq!(lines[9], lines[1]);

    // Read-only: no transaction left behind, no cursor held.
    let coll = store.collection("districts").unwrap();
    assert!(!store.in_transaction());
    assert_eq!(store.open_cursors(coll), 0);
}

#[test]
fn corrupt_member_is_reported_not_fatal() {
    let store = districts();
    let reporter = SpatialRelationReporter::new();
    let named = reporter
        .resolve_named(&store, "districts", "name", &["city", "corrupt", "harbour"])
        .unwrap();

    let mut sink = Vec::new();
    let summary = reporter.report(&mut sink, &named[0], &named[1..]).unwrap();

    assert_eq!(summary.pairs, 1);
    assert_eq!(summary.failures.len(), 1);
    assert_eq!(summary.failures[0].other, "corrupt");
    assert_eq!(String::from_utf8(sink).unwrap().lines().count(), 4);
}
