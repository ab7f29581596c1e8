//! Exclusion between separate processes.
//!
//! The parent re-runs this test binary, filtered to `hold_lock_in_child`,
//! with `HAPPYSTORE_HOLD_DB` pointing at a database. The child opens a
//! transaction there, announces it through a marker file and then exits
//! without committing or releasing anything.

use happystore_core::{Config, JsonValueSerializer, Store, StoreError, StoreResult};
use serde_json::json;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::thread;
use std::time::{Duration, Instant};
use tempfile::tempdir;

const HOLD_DB: &str = "HAPPYSTORE_HOLD_DB";
const HOLD_FOR: Duration = Duration::from_millis(1500);

fn ready_marker(db: &Path) -> PathBuf {
    db.with_extension("ready")
}

#[test]
fn hold_lock_in_child() {
    let Some(db) = std::env::var_os(HOLD_DB).map(PathBuf::from) else {
        return;
    };

    let store = Store::open(db.as_path(), JsonValueSerializer::new()).unwrap();
    let _ = store.transaction(|txn| -> StoreResult<()> {
        txn.set("child", &json!("uncommitted"))?;
        std::fs::write(ready_marker(&db), b"").unwrap();
        thread::sleep(HOLD_FOR);
        // Leave without commit, rollback or unlock.
        std::process::exit(0)
    });
}

#[test]
fn lock_is_exclusive_across_processes_and_freed_on_exit() {
    let dir = tempdir().unwrap();
    let db = dir.path().join("shared.db");
    let config = Config::new().lock_timeout(Duration::from_millis(100));
    let store = Store::open_with_config(db.as_path(), JsonValueSerializer::new(), config).unwrap();
    store.set("parent", &json!(1)).unwrap();

    let mut child = Command::new(std::env::current_exe().unwrap())
        .args(["hold_lock_in_child", "--exact", "--test-threads=1"])
        .env(HOLD_DB, &db)
        .spawn()
        .unwrap();

    let started = Instant::now();
    while !ready_marker(&db).exists() {
        assert!(
            started.elapsed() < Duration::from_secs(30),
            "child never opened its transaction"
        );
        thread::sleep(Duration::from_millis(10));
    }

    let err = store.set("parent", &json!(2)).unwrap_err();
    assert!(matches!(err, StoreError::LockTimeout { .. }), "got {err:?}");

    let status = child.wait().unwrap();
    assert!(status.success());

    store.set("parent", &json!(3)).unwrap();
    assert_eq!(store.get("parent").unwrap(), json!(3));
    assert!(!store.has("child").unwrap());
}
