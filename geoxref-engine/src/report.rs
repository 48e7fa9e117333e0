//! Run results handed back to the caller.

use geoxref_store::FeatureId;
use serde::Serialize;
use std::collections::BTreeSet;

/// Target features that matched at least one source feature.
///
/// Membership does not imply the feature was written: a matched target
/// whose field was already filled is selected but not modified.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct SelectionSet {
    ids: BTreeSet<FeatureId>,
}

impl SelectionSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a feature; returns `false` if it was already selected.
    pub fn insert(&mut self, id: FeatureId) -> bool {
        self.ids.insert(id)
    }

    pub fn contains(&self, id: FeatureId) -> bool {
        self.ids.contains(&id)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Selected ids in ascending order.
    pub fn iter(&self) -> impl Iterator<Item = FeatureId> + '_ {
        self.ids.iter().copied()
    }

    pub fn to_vec(&self) -> Vec<FeatureId> {
        self.ids.iter().copied().collect()
    }
}

impl FromIterator<FeatureId> for SelectionSet {
    fn from_iter<I: IntoIterator<Item = FeatureId>>(iter: I) -> Self {
        Self {
            ids: iter.into_iter().collect(),
        }
    }
}

/// Counters for a cross-reference run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RunStatistics {
    /// Targets with at least one spatial match.
    pub matched_count: usize,

    /// Targets whose field was written.
    pub modified_count: usize,
}

/// Outcome of a completed cross-reference run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunReport {
    /// Targets visited.
    pub total_targets: usize,

    pub statistics: RunStatistics,

    pub selection: SelectionSet,

    /// Targets whose geometry could not be used and were processed as
    /// zero-match records.
    pub skipped_geometries: usize,
}

impl RunReport {
    pub fn matched_count(&self) -> usize {
        self.statistics.matched_count
    }

    pub fn modified_count(&self) -> usize {
        self.statistics.modified_count
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_selection_is_sorted_and_unique() {
        let mut selection = SelectionSet::new();
        assert!(selection.insert(11));
        assert!(selection.insert(3));
        assert!(!selection.insert(11));
        assert_eq!(selection.to_vec(), vec![3, 11]);
        assert!(selection.contains(3));
        assert!(!selection.contains(4));
    }

    #[test]
    fn test_report_json() {
        let report = RunReport {
            total_targets: 2,
            statistics: RunStatistics {
                matched_count: 1,
                modified_count: 1,
            },
            selection: [10].into_iter().collect(),
            skipped_geometries: 0,
        };
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["statistics"]["modified_count"], 1);
        assert_eq!(json["selection"], serde_json::json!([10]));
    }
}
