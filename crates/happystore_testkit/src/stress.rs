//! Stress helpers for HappyStore.
//!
//! These drive a store under heavy load and concurrent access. The
//! read-modify-write counters only come out right if transactions are
//! strictly serialized.

use happystore_core::{JsonValueSerializer, Serializer, Store, StoreResult};
use serde_json::{json, Value};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;
use std::time::{Duration, Instant};

/// Result of a stress test run.
#[derive(Debug, Clone)]
pub struct StressTestResult {
    /// Total operations performed.
    pub total_ops: usize,
    /// Successful operations.
    pub successful_ops: usize,
    /// Failed operations.
    pub failed_ops: usize,
    /// Total duration.
    pub duration: Duration,
    /// Operations per second.
    pub ops_per_second: f64,
}

impl StressTestResult {
    /// Creates a new result.
    pub fn new(successful: usize, failed: usize, duration: Duration) -> Self {
        let total = successful + failed;
        let ops_per_second = if duration.as_secs_f64() > 0.0 {
            total as f64 / duration.as_secs_f64()
        } else {
            0.0
        };

        Self {
            total_ops: total,
            successful_ops: successful,
            failed_ops: failed,
            duration,
            ops_per_second,
        }
    }
}

/// Configuration for stress tests.
#[derive(Debug, Clone)]
pub struct StressConfig {
    /// Number of concurrent threads.
    pub threads: usize,
    /// Operations per thread.
    pub iterations: usize,
}

impl Default for StressConfig {
    fn default() -> Self {
        Self {
            threads: 8,
            iterations: 50,
        }
    }
}

/// Adds one to the counter under `key` inside a transaction.
///
/// A missing key counts as zero.
pub fn increment<S>(store: &Store<S>, key: &str) -> StoreResult<u64>
where
    S: Serializer<Value = Value>,
{
    store
        .transaction(|txn| {
            let current = if txn.has(key)? {
                txn.get(key)?.as_u64().unwrap_or(0)
            } else {
                0
            };
            txn.set(key, &json!(current + 1))?;
            Ok(current + 1)
        })
        .map(|outcome| outcome.committed().unwrap_or(0))
}

/// Increments `key` from `config.threads` threads sharing one handle.
pub fn concurrent_increment<S>(store: &Store<S>, key: &str, config: &StressConfig) -> StressTestResult
where
    S: Serializer<Value = Value>,
{
    let successful = AtomicUsize::new(0);
    let failed = AtomicUsize::new(0);
    let start = Instant::now();

    thread::scope(|scope| {
        for _ in 0..config.threads {
            scope.spawn(|| {
                for _ in 0..config.iterations {
                    match increment(store, key) {
                        Ok(_) => successful.fetch_add(1, Ordering::Relaxed),
                        Err(_) => failed.fetch_add(1, Ordering::Relaxed),
                    };
                }
            });
        }
    });

    StressTestResult::new(
        successful.into_inner(),
        failed.into_inner(),
        start.elapsed(),
    )
}

/// Increments `key` from `config.threads` threads, each with its own
/// handle on the database file at `path`.
pub fn multi_handle_increment(path: &Path, key: &str, config: &StressConfig) -> StressTestResult {
    let successful = AtomicUsize::new(0);
    let failed = AtomicUsize::new(0);
    let start = Instant::now();

    thread::scope(|scope| {
        for _ in 0..config.threads {
            scope.spawn(|| {
                let store = match Store::open(path, JsonValueSerializer::new()) {
                    Ok(store) => store,
                    Err(_) => {
                        failed.fetch_add(config.iterations, Ordering::Relaxed);
                        return;
                    }
                };
                for _ in 0..config.iterations {
                    match increment(&store, key) {
                        Ok(_) => successful.fetch_add(1, Ordering::Relaxed),
                        Err(_) => failed.fetch_add(1, Ordering::Relaxed),
                    };
                }
            });
        }
    });

    StressTestResult::new(
        successful.into_inner(),
        failed.into_inner(),
        start.elapsed(),
    )
}

/// Writes `count` distinct keys, one implicit transaction each.
pub fn sequential_writes<S>(store: &Store<S>, count: usize) -> StressTestResult
where
    S: Serializer<Value = Value>,
{
    let start = Instant::now();
    let mut successful = 0usize;
    let mut failed = 0usize;

    for i in 0..count {
        match store.set(&format!("seq-{i:06}"), &json!(i)) {
            Ok(()) => successful += 1,
            Err(_) => failed += 1,
        }
    }

    StressTestResult::new(successful, failed, start.elapsed())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{json_memory_store, TempStore};

    #[test]
    fn test_concurrent_increment_is_serialized() {
        let store = json_memory_store();
        let config = StressConfig {
            threads: 4,
            iterations: 25,
        };

        let result = concurrent_increment(&store, "counter", &config);

        assert_eq!(result.failed_ops, 0);
        assert_eq!(result.successful_ops, 100);
        assert_eq!(store.get("counter").unwrap(), json!(100));
    }

    #[test]
    fn test_multi_handle_increment() {
        let temp = TempStore::new();
        let config = StressConfig {
            threads: 3,
            iterations: 10,
        };

        let result = multi_handle_increment(temp.path(), "counter", &config);

        assert_eq!(result.failed_ops, 0);
        assert_eq!(temp.get("counter").unwrap(), json!(30));
    }

    #[test]
    fn test_sequential_writes() {
        let store = json_memory_store();
        let result = sequential_writes(&store, 200);
        assert_eq!(result.successful_ops, 200);
        assert_eq!(store.len().unwrap(), 200);
    }

    #[test]
    fn test_result_throughput() {
        let result = StressTestResult::new(10, 0, Duration::from_secs(2));
        assert_eq!(result.total_ops, 10);
        assert!((result.ops_per_second - 5.0).abs() < f64::EPSILON);
    }
}
