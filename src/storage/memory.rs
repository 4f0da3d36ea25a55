use std::collections::BTreeMap;
use std::ops::Bound;
use std::sync::RwLock;

use kv_filter_core::Result;

use super::{Storage, StorageListOptions, StoredKey, StoredValue, is_live, storage_err};

/// In-process storage engine backed by an ordered map.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    entries: RwLock<BTreeMap<String, StoredValue>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> Result<usize> {
        let entries = self.entries.read().map_err(storage_err)?;
        Ok(entries.len())
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }
}

impl Storage for MemoryStorage {
    fn get(&self, key: &str) -> Result<Option<StoredValue>> {
        let entries = self.entries.read().map_err(storage_err)?;
        Ok(entries.get(key).cloned())
    }

    fn put(&self, key: &str, value: StoredValue) -> Result<()> {
        let mut entries = self.entries.write().map_err(storage_err)?;
        entries.insert(key.to_string(), value);
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<bool> {
        let mut entries = self.entries.write().map_err(storage_err)?;
        Ok(entries.remove(key).is_some())
    }

    fn delete_expired(&self, key: &str, now: u64) -> Result<bool> {
        let mut entries = self.entries.write().map_err(storage_err)?;
        let expired = entries
            .get(key)
            .is_some_and(|stored| !is_live(stored.expiration, Some(now)));
        if expired {
            entries.remove(key);
        }
        Ok(expired)
    }

    fn list(&self, options: &StorageListOptions) -> Result<Vec<StoredKey>> {
        let entries = self.entries.read().map_err(storage_err)?;
        let prefix = options.prefix.as_str();
        let lower = match &options.start_after {
            Some(after) if after.as_str() >= prefix => Bound::Excluded(after.clone()),
            _ => Bound::Included(prefix.to_string()),
        };

        let keys = entries
            .range::<String, _>((lower, Bound::Unbounded))
            .take_while(|(name, _)| name.starts_with(prefix))
            .filter(|(_, stored)| is_live(stored.expiration, options.live_at))
            .take(options.limit)
            .map(|(name, stored)| StoredKey {
                name: name.clone(),
                expiration: stored.expiration,
                metadata: stored.metadata.clone(),
            })
            .collect();
        Ok(keys)
    }
}
