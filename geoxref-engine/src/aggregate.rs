//! Deduplicating accumulator for matched source values.
//!
//! Values keep first-seen order. That order is whatever the store's spatial
//! query yields, so it is store-defined: stable for a given store state, but
//! neither sorted nor guaranteed across stores.

use rustc_hash::FxHashSet;

/// Ordered set of distinct, non-empty strings.
#[derive(Debug, Default, Clone)]
pub struct AggregateBuilder {
    values: Vec<String>,
    seen: FxHashSet<String>,
}

impl AggregateBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a value. Empty values and exact duplicates are ignored.
    pub fn add(&mut self, value: &str) {
        if value.is_empty() || self.seen.contains(value) {
            return;
        }
        self.seen.insert(value.to_string());
        self.values.push(value.to_string());
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Values in first-seen order.
    pub fn values(&self) -> &[String] {
        &self.values
    }

    pub fn join(&self, separator: &str) -> String {
        self.values.join(separator)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dedup_keeps_first_seen_order() {
        let mut agg = AggregateBuilder::new();
        for v in ["B", "A", "B", "C", "A"] {
            agg.add(v);
        }
        assert_eq!(agg.values(), ["B", "A", "C"]);
        assert_eq!(agg.join(","), "B,A,C");
    }

    #[test]
    fn test_empty_values_ignored() {
        let mut agg = AggregateBuilder::new();
        agg.add("");
        assert!(agg.is_empty());
        assert_eq!(agg.join(","), "");
    }

    #[test]
    fn test_dedup_is_exact_match() {
        let mut agg = AggregateBuilder::new();
        agg.add("a");
        agg.add("A");
        agg.add("a ");
        assert_eq!(agg.len(), 3);
    }
}
