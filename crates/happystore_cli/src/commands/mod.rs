//! CLI command implementations.

pub mod import;
pub mod kv;
pub mod query;

use happystore_core::{JsonValueSerializer, Store, StoreError};
use std::path::PathBuf;
use thiserror::Error;

/// The store type every command works on.
pub type JsonStore = Store<JsonValueSerializer>;

/// Result type for commands.
pub type CliResult<T> = Result<T, CliError>;

/// Errors reported by the CLI.
#[derive(Debug, Error)]
pub enum CliError {
    /// No `--path` was given.
    #[error("database path required (use --path)")]
    MissingPath,

    /// An argument was not valid JSON.
    #[error("invalid JSON for {what}: {source}")]
    InvalidJson {
        /// What was being parsed.
        what: String,
        /// Parser error.
        source: serde_json::Error,
    },

    /// An import file did not hold a JSON object.
    #[error("{} must contain a JSON object", path.display())]
    NotAnObject {
        /// The offending file.
        path: PathBuf,
    },

    /// Store error.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Output encoding error.
    #[error("failed to encode output: {0}")]
    Output(#[from] serde_json::Error),
}
