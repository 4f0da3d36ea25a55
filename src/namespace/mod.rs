mod ext;
mod filtered;
mod kv;

use std::sync::Arc;

use kv_filter_core::Result;
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub use ext::NamespaceExt;
pub use filtered::FilteredNamespace;
pub use kv::KvNamespace;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GetOptions {
    /// Edge cache hint in seconds; validated but otherwise unused by local engines.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cache_ttl: Option<u64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PutOptions {
    /// Absolute expiration, unix seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiration: Option<u64>,
    /// Relative expiration, seconds from now. Wins over `expiration` when both are set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiration_ttl: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ListOptions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prefix: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cursor: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ValueWithMetadata {
    pub value: Option<Vec<u8>>,
    pub metadata: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListEntry {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiration: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Value>,
}

impl ListEntry {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            expiration: None,
            metadata: None,
        }
    }
}

/// One page of a key enumeration.
///
/// `cursor` is opaque; pass it back verbatim to continue while `list_complete` is `false`. A
/// page may hold fewer keys than requested, or none, without being the last one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListPage {
    pub keys: Vec<ListEntry>,
    pub list_complete: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cursor: Option<String>,
}

/// The key-value namespace contract shared by base namespaces and filtered views.
pub trait Namespace: Send + Sync {
    fn get_with_metadata(&self, key: &str, options: &GetOptions) -> Result<ValueWithMetadata>;

    fn get(&self, key: &str, options: &GetOptions) -> Result<Option<Vec<u8>>> {
        Ok(self.get_with_metadata(key, options)?.value)
    }

    fn put(&self, key: &str, value: Vec<u8>, options: &PutOptions) -> Result<()>;

    fn delete(&self, key: &str) -> Result<()>;

    fn list(&self, options: &ListOptions) -> Result<ListPage>;
}

impl<N: Namespace + ?Sized> Namespace for Arc<N> {
    fn get_with_metadata(&self, key: &str, options: &GetOptions) -> Result<ValueWithMetadata> {
        (**self).get_with_metadata(key, options)
    }

    fn get(&self, key: &str, options: &GetOptions) -> Result<Option<Vec<u8>>> {
        (**self).get(key, options)
    }

    fn put(&self, key: &str, value: Vec<u8>, options: &PutOptions) -> Result<()> {
        (**self).put(key, value, options)
    }

    fn delete(&self, key: &str) -> Result<()> {
        (**self).delete(key)
    }

    fn list(&self, options: &ListOptions) -> Result<ListPage> {
        (**self).list(options)
    }
}

impl<N: Namespace + ?Sized> Namespace for &N {
    fn get_with_metadata(&self, key: &str, options: &GetOptions) -> Result<ValueWithMetadata> {
        (**self).get_with_metadata(key, options)
    }

    fn get(&self, key: &str, options: &GetOptions) -> Result<Option<Vec<u8>>> {
        (**self).get(key, options)
    }

    fn put(&self, key: &str, value: Vec<u8>, options: &PutOptions) -> Result<()> {
        (**self).put(key, value, options)
    }

    fn delete(&self, key: &str) -> Result<()> {
        (**self).delete(key)
    }

    fn list(&self, options: &ListOptions) -> Result<ListPage> {
        (**self).list(options)
    }
}
