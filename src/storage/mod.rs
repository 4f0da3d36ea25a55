use kv_filter_core::{Error, Result};
use serde_json::Value;

pub mod memory;
#[cfg(feature = "sqlite")]
pub mod sqlite;

/// A stored value together with its expiration and metadata.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredValue {
    pub value: Vec<u8>,
    /// Unix seconds after which the entry is treated as missing.
    pub expiration: Option<u64>,
    pub metadata: Option<Value>,
}

/// A key discovered by [`Storage::list`], without its value.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredKey {
    pub name: String,
    pub expiration: Option<u64>,
    pub metadata: Option<Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StorageListOptions {
    pub prefix: String,
    /// Only keys strictly greater than this one are returned.
    pub start_after: Option<String>,
    /// Skip entries whose expiration is at or before this unix second.
    pub live_at: Option<u64>,
    pub limit: usize,
}

/// Raw key-value engine underneath a namespace.
///
/// `list` returns keys in ascending byte order.
pub trait Storage: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<StoredValue>>;

    fn put(&self, key: &str, value: StoredValue) -> Result<()>;

    /// Returns `true` if an entry was removed.
    fn delete(&self, key: &str) -> Result<bool>;

    /// Remove `key` only if it is still expired at `now` (unix seconds).
    ///
    /// Returns `true` if an entry was removed. An entry rewritten since it was read survives.
    fn delete_expired(&self, key: &str, now: u64) -> Result<bool>;

    fn list(&self, options: &StorageListOptions) -> Result<Vec<StoredKey>>;
}

impl<S: Storage + ?Sized> Storage for std::sync::Arc<S> {
    fn get(&self, key: &str) -> Result<Option<StoredValue>> {
        (**self).get(key)
    }

    fn put(&self, key: &str, value: StoredValue) -> Result<()> {
        (**self).put(key, value)
    }

    fn delete(&self, key: &str) -> Result<bool> {
        (**self).delete(key)
    }

    fn delete_expired(&self, key: &str, now: u64) -> Result<bool> {
        (**self).delete_expired(key, now)
    }

    fn list(&self, options: &StorageListOptions) -> Result<Vec<StoredKey>> {
        (**self).list(options)
    }
}

pub(crate) fn storage_err(err: impl std::fmt::Display) -> Error {
    Error::Storage(err.to_string())
}

pub(crate) fn is_live(expiration: Option<u64>, live_at: Option<u64>) -> bool {
    match (expiration, live_at) {
        (Some(expiration), Some(now)) => expiration > now,
        _ => true,
    }
}
