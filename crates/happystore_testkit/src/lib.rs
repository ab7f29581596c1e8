//! # HappyStore Testkit
//!
//! Test utilities for HappyStore.
//!
//! This crate provides:
//! - Store fixtures backed by memory or a temporary directory
//! - Property-based test generators using proptest
//! - Stress helpers that hammer a store from many threads or handles
//! - An integration harness that checks a store against an in-memory model
//!
//! ## Usage
//!
//! ```rust
//! use happystore_testkit::prelude::*;
//! use serde_json::json;
//!
//! with_temp_store(|store, _path| {
//!     store.set("greeting", &json!("hi")).unwrap();
//!     assert!(store.has("greeting").unwrap());
//! });
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod fixtures;
pub mod generators;
pub mod integration;
pub mod stress;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::fixtures::*;
    pub use crate::generators::*;
    pub use crate::integration::*;
    pub use crate::stress::*;
}

pub use fixtures::*;
pub use generators::*;
pub use integration::*;
pub use stress::*;
