//! Cross-crate integration test helpers.
//!
//! [`IntegrationHarness`] mirrors every write into a `BTreeMap` and checks
//! reads, queries and scans against it.

use crate::fixtures::{json_memory_store, JsonStore};
use happystore_core::{Query, StoreError};
use serde_json::Value;
use std::collections::BTreeMap;

/// A store paired with the model it should agree with.
pub struct IntegrationHarness {
    /// The store under test.
    pub store: JsonStore,
    model: BTreeMap<String, Value>,
}

impl IntegrationHarness {
    /// Creates a harness over an in-memory store.
    pub fn new() -> Self {
        Self::with_store(json_memory_store())
    }

    /// Creates a harness over an existing, empty store.
    pub fn with_store(store: JsonStore) -> Self {
        assert!(
            store.is_empty().expect("Failed to count pairs"),
            "harness needs an empty store"
        );
        Self {
            store,
            model: BTreeMap::new(),
        }
    }

    /// Sets a key and tracks it.
    pub fn set(&mut self, key: &str, value: Value) {
        self.store.set(key, &value).expect("Failed to set key");
        self.model.insert(key.to_owned(), value);
    }

    /// Sets a batch in one call and tracks it.
    pub fn bulk_set(&mut self, pairs: &[(String, Value)]) {
        self.store.bulk_set(pairs).expect("Failed to bulk set");
        for (key, value) in pairs {
            self.model.insert(key.clone(), value.clone());
        }
    }

    /// Deletes a key, checking the existed flag against the model.
    pub fn delete(&mut self, key: &str) {
        let existed = self.store.delete(key).expect("Failed to delete key");
        assert_eq!(
            existed,
            self.model.remove(key).is_some(),
            "delete flag mismatch for {key:?}"
        );
    }

    /// Reads a key and checks it against the model.
    pub fn get_and_verify(&self, key: &str) -> Option<Value> {
        match (self.store.get(key), self.model.get(key)) {
            (Ok(actual), Some(expected)) => {
                assert_eq!(&actual, expected, "value mismatch for {key:?}");
                Some(actual)
            }
            (Err(StoreError::KeyNotFound { .. }), None) => None,
            (actual, expected) => {
                panic!("store returned {actual:?} for {key:?}, model has {expected:?}")
            }
        }
    }

    /// Checks a query against the same query run over the model.
    pub fn verify_query(&self, query: &Query) {
        let actual = self.store.query(query).expect("Failed to query");
        assert_eq!(actual, self.model_query(query), "query mismatch for {query:?}");
    }

    /// Checks a full scan and the pair count against the model.
    pub fn verify_all(&self) {
        let scanned: Vec<(String, Value)> = self
            .store
            .scan()
            .expect("Failed to start scan")
            .collect::<Result<_, _>>()
            .expect("Failed to scan");
        let expected: Vec<(String, Value)> = self
            .model
            .iter()
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect();
        assert_eq!(scanned, expected, "scan mismatch");
        assert_eq!(self.store.len().expect("Failed to count"), self.model.len());
    }

    /// Number of tracked keys.
    pub fn len(&self) -> usize {
        self.model.len()
    }

    /// Whether no keys are tracked.
    pub fn is_empty(&self) -> bool {
        self.model.is_empty()
    }

    fn model_query(&self, query: &Query) -> Vec<(String, Value)> {
        let matches = |key: &str| match &query.prefix {
            Some(prefix) => key.as_bytes().starts_with(prefix.as_bytes()),
            None => {
                query.start.as_deref().map_or(true, |start| key >= start)
                    && query.end.as_deref().map_or(true, |end| key <= end)
            }
        };
        let mut pairs: Vec<_> = self
            .model
            .iter()
            .filter(|(key, _)| matches(key))
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect();
        if query.reverse {
            pairs.reverse();
        }
        if let Some(limit) = query.limit {
            pairs.truncate(limit);
        }
        pairs
    }
}

impl Default for IntegrationHarness {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generators::{key_strategy, pairs_strategy};
    use proptest::prelude::*;
    use serde_json::json;

    #[test]
    fn test_harness_tracks_writes() {
        let mut harness = IntegrationHarness::new();
        harness.set("a", json!(5));
        harness.set("ab", json!(10));
        harness.set("abc", json!(15));
        harness.delete("ab");
        harness.delete("missing");

        assert_eq!(harness.get_and_verify("a"), Some(json!(5)));
        assert_eq!(harness.get_and_verify("ab"), None);
        harness.verify_query(&Query::prefix("a"));
        harness.verify_all();
        assert_eq!(harness.len(), 2);
    }

    #[test]
    fn test_ordering_ladder() {
        let mut harness = IntegrationHarness::new();
        harness.bulk_set(&[
            ("a".to_owned(), json!(5)),
            ("ab".to_owned(), json!(10)),
            ("abc".to_owned(), json!(15)),
        ]);

        let by_prefix = harness.store.query(&Query::prefix("a")).unwrap();
        let keys: Vec<_> = by_prefix.iter().map(|(key, _)| key.as_str()).collect();
        assert_eq!(keys, ["a", "ab", "abc"]);

        let by_range = harness.store.query(&Query::range("a", "ab")).unwrap();
        assert_eq!(by_range, [("a".to_owned(), json!(5)), ("ab".to_owned(), json!(10))]);

        harness.verify_all();
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(32))]

        #[test]
        fn store_agrees_with_model(
            pairs in pairs_strategy(24),
            doomed in prop::collection::vec(key_strategy(), 0..8),
            prefix in "[a-c]{0,2}",
            limit in prop::option::of(0usize..6),
            reverse in any::<bool>(),
        ) {
            let mut harness = IntegrationHarness::new();
            harness.bulk_set(&pairs);
            for key in &doomed {
                harness.delete(key);
            }

            harness.verify_all();
            let mut query = Query::prefix(prefix).reverse(reverse);
            query.limit = limit;
            harness.verify_query(&query);
        }
    }
}
