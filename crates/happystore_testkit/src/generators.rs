//! Property-based test generators using proptest.
//!
//! Provides strategies for generating keys, JSON values and batches of
//! pairs.

use proptest::prelude::*;
use serde_json::Value;
use std::collections::BTreeMap;

/// Strategy for path-like ASCII keys such as `user/42/name`.
///
/// The small alphabet makes shared prefixes common, which is what prefix
/// queries need to be interesting.
pub fn key_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("[a-c]{1,3}(/[a-c0-9]{1,3}){0,2}").expect("Invalid regex")
}

/// Strategy for arbitrary Unicode keys, including the empty string.
pub fn unicode_key_strategy() -> impl Strategy<Value = String> {
    any::<String>()
}

/// Strategy for JSON values that survive a JSON round trip unchanged.
///
/// Floats are left out since their text form is not always exact.
pub fn json_value_strategy() -> impl Strategy<Value = Value> {
    let leaf = prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::Bool),
        any::<i64>().prop_map(Value::from),
        "[a-zA-Z0-9 ]{0,16}".prop_map(Value::String),
    ];
    leaf.prop_recursive(3, 32, 4, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..4).prop_map(Value::Array),
            prop::collection::btree_map("[a-z]{1,6}", inner, 0..4)
                .prop_map(|map| Value::Object(map.into_iter().collect())),
        ]
    })
}

/// Strategy for a batch of pairs with distinct keys, in key order.
pub fn pairs_strategy(max_len: usize) -> impl Strategy<Value = Vec<(String, Value)>> {
    prop::collection::btree_map(key_strategy(), json_value_strategy(), 0..=max_len)
        .prop_map(|map: BTreeMap<String, Value>| map.into_iter().collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    proptest! {
        #[test]
        fn keys_are_non_empty(key in key_strategy()) {
            prop_assert!(!key.is_empty());
        }

        #[test]
        fn json_values_round_trip(value in json_value_strategy()) {
            let text = serde_json::to_string(&value).unwrap();
            let back: Value = serde_json::from_str(&text).unwrap();
            prop_assert_eq!(back, value);
        }

        #[test]
        fn pairs_are_sorted_and_distinct(pairs in pairs_strategy(16)) {
            prop_assert!(pairs.len() <= 16);
            prop_assert!(pairs.windows(2).all(|w| w[0].0 < w[1].0));
        }
    }
}
