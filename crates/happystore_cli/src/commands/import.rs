//! Import command implementation.

use super::{CliError, CliResult, JsonStore};
use serde_json::Value;
use std::io::Write;
use std::path::Path;
use tracing::info;

/// Loads every entry of the JSON object in `path` with one `bulk_set`,
/// then prints how many pairs were written.
pub fn run(store: &JsonStore, path: &Path, out: &mut impl Write) -> CliResult<()> {
    let text = std::fs::read_to_string(path)?;
    let document: Value = serde_json::from_str(&text).map_err(|source| CliError::InvalidJson {
        what: path.display().to_string(),
        source,
    })?;
    let Value::Object(entries) = document else {
        return Err(CliError::NotAnObject {
            path: path.to_path_buf(),
        });
    };

    let pairs: Vec<(String, Value)> = entries.into_iter().collect();
    store.bulk_set(pairs.as_slice())?;
    info!(count = pairs.len(), file = %path.display(), "imported pairs");
    writeln!(out, "{}", pairs.len())?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use happystore_core::{JsonValueSerializer, Store};
    use serde_json::json;
    use tempfile::tempdir;

    #[test]
    fn imports_object_entries() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("seed.json");
        std::fs::write(&file, r#"{"a": 1, "b": {"nested": true}, "c": [1, 2]}"#).unwrap();

        let store = Store::open(":memory:", JsonValueSerializer::new()).unwrap();
        let mut out = Vec::new();
        run(&store, &file, &mut out).unwrap();

        assert_eq!(out, b"3\n");
        assert_eq!(store.get("b").unwrap(), json!({"nested": true}));
        assert_eq!(store.len().unwrap(), 3);
    }

    #[test]
    fn rejects_non_objects() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("seed.json");
        std::fs::write(&file, "[1, 2, 3]").unwrap();

        let store = Store::open(":memory:", JsonValueSerializer::new()).unwrap();
        let err = run(&store, &file, &mut Vec::new()).unwrap_err();
        assert!(matches!(err, CliError::NotAnObject { .. }));
        assert!(store.is_empty().unwrap());
    }
}
