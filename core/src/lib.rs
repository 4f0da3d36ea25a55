//! Shared types for `kv-filter`: errors, namespace configuration, key patterns and the compiled
//! filter policy.

mod error;

pub mod filter;
pub mod key;
pub mod pattern;
pub mod policy;

pub use error::{Error, Result, WriteOp};
