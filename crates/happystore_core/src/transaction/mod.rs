//! Nested, strictly serializable transactions.
//!
//! HappyStore runs one outermost transaction at a time per store, across
//! threads and processes:
//! - **Outermost frames** hold the store gate and bracket SQLite
//!   `BEGIN EXCLUSIVE` / `COMMIT`
//! - **Nested frames** are savepoints inside the outermost frame
//! - **Implicit frames** wrap single operations that run outside any scope,
//!   or join the calling thread's innermost open frame

mod manager;
mod state;

pub(crate) use manager::{ActiveFrame, TransactionManager};
pub use state::Outcome;
