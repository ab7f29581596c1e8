//! Query and scan commands.

use super::{CliResult, JsonStore};
use happystore_core::Query;
use serde::Serialize;
use serde_json::Value;
use std::io::Write;

/// One output line.
#[derive(Debug, Serialize)]
struct PairLine<'a> {
    key: &'a str,
    value: &'a Value,
}

/// Builds a query from command-line flags.
///
/// Invalid combinations are left for the store to reject.
pub fn build(
    prefix: Option<String>,
    start: Option<String>,
    end: Option<String>,
    limit: Option<usize>,
    reverse: bool,
) -> Query {
    Query {
        prefix,
        start,
        end,
        limit,
        reverse,
    }
}

/// Prints the pairs matching `query`, one JSON object per line.
pub fn run(store: &JsonStore, query: &Query, out: &mut impl Write) -> CliResult<()> {
    for (key, value) in store.query(query)? {
        write_pair(out, &key, &value)?;
    }
    Ok(())
}

/// Prints every pair, one JSON object per line.
pub fn scan(store: &JsonStore, page_size: Option<usize>, out: &mut impl Write) -> CliResult<()> {
    let scan = match page_size {
        Some(size) => store.scan_with_page_size(size)?,
        None => store.scan()?,
    };
    for pair in scan {
        let (key, value) = pair?;
        write_pair(out, &key, &value)?;
    }
    Ok(())
}

fn write_pair(out: &mut impl Write, key: &str, value: &Value) -> CliResult<()> {
    serde_json::to_writer(&mut *out, &PairLine { key, value })?;
    writeln!(out)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::CliError;
    use happystore_core::{JsonValueSerializer, Store, StoreError};
    use serde_json::json;

    fn seeded() -> JsonStore {
        let store = Store::open(":memory:", JsonValueSerializer::new()).unwrap();
        store
            .bulk_set(&[("a", json!(5)), ("ab", json!(10)), ("abc", json!(15)), ("b", json!(0))])
            .unwrap();
        store
    }

    fn lines(out: Vec<u8>) -> Vec<Value> {
        String::from_utf8(out)
            .unwrap()
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect()
    }

    #[test]
    fn prefix_query_prints_json_lines() {
        let store = seeded();
        let mut out = Vec::new();
        let query = build(Some("ab".into()), None, None, None, true);
        run(&store, &query, &mut out).unwrap();
        assert_eq!(
            lines(out),
            [json!({"key": "abc", "value": 15}), json!({"key": "ab", "value": 10})]
        );
    }

    #[test]
    fn range_query_with_limit() {
        let store = seeded();
        let mut out = Vec::new();
        let query = build(None, Some("a".into()), Some("b".into()), Some(2), false);
        run(&store, &query, &mut out).unwrap();
        assert_eq!(lines(out).len(), 2);
    }

    #[test]
    fn empty_query_is_rejected() {
        let store = seeded();
        let mut out = Vec::new();
        let err = run(&store, &build(None, None, None, None, false), &mut out).unwrap_err();
        assert!(matches!(err, CliError::Store(StoreError::InvalidArgument { .. })));
    }

    #[test]
    fn scan_prints_everything_in_order() {
        let store = seeded();
        let mut out = Vec::new();
        scan(&store, Some(1), &mut out).unwrap();
        let keys: Vec<_> = lines(out).into_iter().map(|l| l["key"].clone()).collect();
        assert_eq!(keys, [json!("a"), json!("ab"), json!("abc"), json!("b")]);
    }
}
