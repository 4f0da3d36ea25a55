use base64::Engine as _;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;

use kv_filter_core::key::validate_key;
use kv_filter_core::policy::Limits;
use kv_filter_core::{Error, Result};

use super::{GetOptions, ListEntry, ListOptions, ListPage, Namespace, PutOptions, ValueWithMetadata};
use crate::clock::{Clock, SystemClock};
use crate::storage::{Storage, StorageListOptions, StoredValue};

/// Unfiltered namespace over a [`Storage`] engine.
///
/// Expired entries read as missing and are removed lazily on access.
#[derive(Debug)]
pub struct KvNamespace<S, C = SystemClock> {
    storage: S,
    clock: C,
    limits: Limits,
}

impl<S: Storage> KvNamespace<S> {
    pub fn new(storage: S) -> Self {
        Self::with_clock(storage, SystemClock)
    }
}

impl<S: Storage, C: Clock> KvNamespace<S, C> {
    pub fn with_clock(storage: S, clock: C) -> Self {
        Self {
            storage,
            clock,
            limits: Limits::default(),
        }
    }

    pub fn with_limits(mut self, limits: Limits) -> Result<Self> {
        limits.validate()?;
        self.limits = limits;
        Ok(self)
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    fn resolve_expiration(&self, options: &PutOptions) -> Result<Option<u64>> {
        let now = self.clock.now_secs();
        let min_ttl = self.limits.min_ttl_secs;

        if let Some(ttl) = options.expiration_ttl {
            if ttl < min_ttl {
                return Err(Error::InvalidExpiration(format!(
                    "invalid expiration_ttl of {ttl}; expiration TTL must be at least {min_ttl}"
                )));
            }
            return Ok(Some(now.saturating_add(ttl)));
        }

        if let Some(expiration) = options.expiration {
            if expiration <= now {
                return Err(Error::InvalidExpiration(format!(
                    "invalid expiration of {expiration}; please specify an integer greater than the current number of seconds since the UNIX epoch"
                )));
            }
            if expiration < now.saturating_add(min_ttl) {
                return Err(Error::InvalidExpiration(format!(
                    "invalid expiration of {expiration}; expiration times must be at least {min_ttl} seconds in the future"
                )));
            }
            return Ok(Some(expiration));
        }

        Ok(None)
    }

    fn resolve_list_limit(&self, limit: Option<usize>) -> Result<usize> {
        let max = self.limits.max_list_keys;
        match limit {
            None => Ok(max),
            Some(0) => Err(Error::InvalidOption(
                "invalid limit of 0; please specify an integer greater than 0".to_string(),
            )),
            Some(limit) if limit > max => Err(Error::InvalidOption(format!(
                "invalid limit of {limit}; please specify an integer no greater than {max}"
            ))),
            Some(limit) => Ok(limit),
        }
    }
}

fn encode_cursor(last_key: &str) -> String {
    URL_SAFE_NO_PAD.encode(last_key.as_bytes())
}

fn decode_cursor(cursor: &str) -> Result<String> {
    let bytes = URL_SAFE_NO_PAD
        .decode(cursor)
        .map_err(|err| Error::InvalidOption(format!("invalid cursor: {err}")))?;
    String::from_utf8(bytes).map_err(|err| Error::InvalidOption(format!("invalid cursor: {err}")))
}

impl<S: Storage, C: Clock> Namespace for KvNamespace<S, C> {
    fn get_with_metadata(&self, key: &str, options: &GetOptions) -> Result<ValueWithMetadata> {
        validate_key(key, self.limits.max_key_bytes)?;
        if let Some(cache_ttl) = options.cache_ttl
            && cache_ttl < self.limits.min_ttl_secs
        {
            return Err(Error::InvalidOption(format!(
                "invalid cache_ttl of {cache_ttl}; cache TTL must be at least {}",
                self.limits.min_ttl_secs
            )));
        }

        let Some(stored) = self.storage.get(key)? else {
            return Ok(ValueWithMetadata::default());
        };
        let now = self.clock.now_secs();
        if let Some(expiration) = stored.expiration
            && expiration <= now
        {
            // A concurrent put may have replaced the entry since it was read.
            let removed = self.storage.delete_expired(key, now)?;
            tracing::debug!(key, expiration, removed, "expired key read as missing");
            return Ok(ValueWithMetadata::default());
        }

        Ok(ValueWithMetadata {
            value: Some(stored.value),
            metadata: stored.metadata,
        })
    }

    fn put(&self, key: &str, value: Vec<u8>, options: &PutOptions) -> Result<()> {
        validate_key(key, self.limits.max_key_bytes)?;
        if value.len() > self.limits.max_value_bytes {
            return Err(Error::ValueTooLarge {
                size_bytes: value.len(),
                max_bytes: self.limits.max_value_bytes,
            });
        }
        let expiration = self.resolve_expiration(options)?;
        if let Some(metadata) = &options.metadata {
            let size_bytes = serde_json::to_vec(metadata)?.len();
            if size_bytes > self.limits.max_metadata_bytes {
                return Err(Error::MetadataTooLarge {
                    size_bytes,
                    max_bytes: self.limits.max_metadata_bytes,
                });
            }
        }

        self.storage.put(
            key,
            StoredValue {
                value,
                expiration,
                metadata: options.metadata.clone(),
            },
        )
    }

    fn delete(&self, key: &str) -> Result<()> {
        validate_key(key, self.limits.max_key_bytes)?;
        self.storage.delete(key)?;
        Ok(())
    }

    fn list(&self, options: &ListOptions) -> Result<ListPage> {
        let limit = self.resolve_list_limit(options.limit)?;
        let start_after = match options.cursor.as_deref() {
            None | Some("") => None,
            Some(cursor) => Some(decode_cursor(cursor)?),
        };

        let mut keys = self.storage.list(&StorageListOptions {
            prefix: options.prefix.clone().unwrap_or_default(),
            start_after,
            live_at: Some(self.clock.now_secs()),
            limit: limit.saturating_add(1),
        })?;

        let list_complete = keys.len() <= limit;
        keys.truncate(limit);
        let cursor = if list_complete {
            None
        } else {
            keys.last().map(|last| encode_cursor(&last.name))
        };
        tracing::trace!(keys = keys.len(), list_complete, "listed namespace page");

        Ok(ListPage {
            keys: keys
                .into_iter()
                .map(|stored| ListEntry {
                    name: stored.name,
                    expiration: stored.expiration,
                    metadata: stored.metadata,
                })
                .collect(),
            list_complete,
            cursor,
        })
    }
}
