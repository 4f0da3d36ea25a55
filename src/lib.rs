#![forbid(unsafe_code)]

//! `kv-filter` provides policy-filtered views over key-value namespaces.
//!
//! - `storage`: raw engine trait + memory/SQLite implementations
//! - `clock`: injectable time source for expiration
//! - `namespace`: the namespace contract, the base namespace, and the filtered view
//! - `migrations`: schema bootstrap helpers for supported engines

pub mod clock;
pub mod migrations;
pub mod namespace;
pub mod storage;

pub use kv_filter_core::{Error, Result};
