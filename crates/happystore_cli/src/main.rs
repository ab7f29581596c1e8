//! HappyStore CLI
//!
//! Command-line access to a HappyStore database holding JSON values.
//!
//! # Commands
//!
//! - `get`, `set`, `delete`, `has` - Single-key operations
//! - `query` - Prefix or range lookup
//! - `scan` - Every pair in key order
//! - `import` - Load a JSON object in one transaction
//! - `count` - Number of stored pairs
//!
//! Results are written to stdout as JSON, one value per line. Logs go to
//! stderr.

mod commands;

use clap::{Parser, Subcommand};
use commands::{CliError, CliResult, JsonStore};
use happystore_core::{Config, JsonValueSerializer, Store};
use std::io::{self, Write};
use std::path::PathBuf;
use std::time::Duration;
use tracing::debug;
use tracing_subscriber::EnvFilter;

/// HappyStore command-line tool.
#[derive(Parser)]
#[command(name = "happystore")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to the database file (`:memory:` for a throwaway store)
    #[arg(global = true, short, long)]
    path: Option<String>,

    /// Give up after waiting this long for the store lock
    #[arg(global = true, short, long)]
    timeout_ms: Option<u64>,

    /// Enable verbose output
    #[arg(global = true, short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the value stored under a key
    Get {
        /// Key to read
        key: String,
    },

    /// Store a JSON value under a key
    Set {
        /// Key to write
        key: String,
        /// Value as JSON text, e.g. '{"qty": 3}'
        value: String,
    },

    /// Delete a key and print whether it existed
    Delete {
        /// Key to delete
        key: String,
    },

    /// Print whether a key exists
    Has {
        /// Key to check
        key: String,
    },

    /// Print pairs matching a prefix or a key range
    Query {
        /// Keys starting with this prefix
        #[arg(long, conflicts_with_all = ["start", "end"])]
        prefix: Option<String>,
        /// Inclusive lower bound
        #[arg(long)]
        start: Option<String>,
        /// Inclusive upper bound
        #[arg(long)]
        end: Option<String>,
        /// Maximum number of pairs
        #[arg(short, long)]
        limit: Option<usize>,
        /// Descending key order
        #[arg(short, long)]
        reverse: bool,
    },

    /// Print every pair in key order
    Scan {
        /// Pairs fetched per round trip
        #[arg(long)]
        page_size: Option<usize>,
    },

    /// Load every entry of a JSON object file in one transaction
    Import {
        /// JSON file holding a single object
        file: PathBuf,
    },

    /// Print the number of stored pairs
    Count,

    /// Show version information
    Version,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();

    let stdout = io::stdout();
    let mut out = stdout.lock();

    if let Commands::Version = cli.command {
        print_version(&mut out)?;
        return Ok(());
    }

    let path = cli.path.ok_or(CliError::MissingPath)?;
    let mut config = Config::new();
    if let Some(ms) = cli.timeout_ms {
        config = config.lock_timeout(Duration::from_millis(ms));
    }
    debug!(%path, "opening store");
    let store = Store::open_with_config(path, JsonValueSerializer::new(), config)?;

    execute(cli.command, &store, &mut out)?;
    out.flush()?;
    store.close()?;
    Ok(())
}

fn execute(command: Commands, store: &JsonStore, out: &mut impl Write) -> CliResult<()> {
    match command {
        Commands::Get { key } => commands::kv::get(store, &key, out),
        Commands::Set { key, value } => commands::kv::set(store, &key, &value),
        Commands::Delete { key } => commands::kv::delete(store, &key, out),
        Commands::Has { key } => commands::kv::has(store, &key, out),
        Commands::Query {
            prefix,
            start,
            end,
            limit,
            reverse,
        } => {
            let query = commands::query::build(prefix, start, end, limit, reverse);
            commands::query::run(store, &query, out)
        }
        Commands::Scan { page_size } => commands::query::scan(store, page_size, out),
        Commands::Import { file } => commands::import::run(store, &file, out),
        Commands::Count => {
            writeln!(out, "{}", store.len()?)?;
            Ok(())
        }
        Commands::Version => print_version(out),
    }
}

fn print_version(out: &mut impl Write) -> CliResult<()> {
    writeln!(out, "HappyStore CLI v{}", env!("CARGO_PKG_VERSION"))?;
    writeln!(out, "HappyStore Core v{}", happystore_core::VERSION)?;
    Ok(())
}
