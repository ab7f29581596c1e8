//! Single-key commands.

use super::{CliError, CliResult, JsonStore};
use serde_json::Value;
use std::io::Write;

/// Prints the value stored under `key`.
pub fn get(store: &JsonStore, key: &str, out: &mut impl Write) -> CliResult<()> {
    let value = store.get(key)?;
    writeln!(out, "{}", serde_json::to_string(&value)?)?;
    Ok(())
}

/// Parses `raw` as JSON and stores it under `key`.
pub fn set(store: &JsonStore, key: &str, raw: &str) -> CliResult<()> {
    let value: Value = serde_json::from_str(raw).map_err(|source| CliError::InvalidJson {
        what: format!("value of {key:?}"),
        source,
    })?;
    store.set(key, &value)?;
    Ok(())
}

/// Deletes `key`, printing whether it existed.
pub fn delete(store: &JsonStore, key: &str, out: &mut impl Write) -> CliResult<()> {
    writeln!(out, "{}", store.delete(key)?)?;
    Ok(())
}

/// Prints whether `key` exists.
pub fn has(store: &JsonStore, key: &str, out: &mut impl Write) -> CliResult<()> {
    writeln!(out, "{}", store.has(key)?)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use happystore_core::{JsonValueSerializer, Store, StoreError};

    fn store() -> JsonStore {
        Store::open(":memory:", JsonValueSerializer::new()).unwrap()
    }

    fn output(f: impl FnOnce(&mut Vec<u8>) -> CliResult<()>) -> String {
        let mut out = Vec::new();
        f(&mut out).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn set_then_get() {
        let store = store();
        set(&store, "item", r#"{"qty": 3}"#).unwrap();
        assert_eq!(output(|out| get(&store, "item", out)), "{\"qty\":3}\n");
    }

    #[test]
    fn set_rejects_invalid_json() {
        let store = store();
        let err = set(&store, "item", "{qty").unwrap_err();
        assert!(matches!(err, CliError::InvalidJson { .. }));
        assert!(!store.has("item").unwrap());
    }

    #[test]
    fn get_missing_key_fails() {
        let store = store();
        let mut out = Vec::new();
        let err = get(&store, "nope", &mut out).unwrap_err();
        assert!(matches!(err, CliError::Store(StoreError::KeyNotFound { .. })));
    }

    #[test]
    fn has_and_delete_print_booleans() {
        let store = store();
        set(&store, "k", "1").unwrap();
        assert_eq!(output(|out| has(&store, "k", out)), "true\n");
        assert_eq!(output(|out| delete(&store, "k", out)), "true\n");
        assert_eq!(output(|out| delete(&store, "k", out)), "false\n");
        assert_eq!(output(|out| has(&store, "k", out)), "false\n");
    }
}
