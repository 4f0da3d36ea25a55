use kv_filter_core::{Error, Result};
use serde::Serialize;
use serde::de::DeserializeOwned;

use super::{GetOptions, ListEntry, ListOptions, Namespace, PutOptions};

/// Typed conveniences available on every [`Namespace`].
pub trait NamespaceExt: Namespace {
    fn get_text(&self, key: &str) -> Result<Option<String>> {
        self.get(key, &GetOptions::default())?
            .map(|bytes| {
                String::from_utf8(bytes)
                    .map_err(|err| Error::Serialization(format!("value is not UTF-8: {err}")))
            })
            .transpose()
    }

    fn get_json<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        self.get(key, &GetOptions::default())?
            .map(|bytes| serde_json::from_slice::<T>(&bytes).map_err(Error::from))
            .transpose()
    }

    fn put_text(&self, key: &str, value: &str, options: &PutOptions) -> Result<()> {
        self.put(key, value.as_bytes().to_vec(), options)
    }

    fn put_json<T: Serialize + ?Sized>(
        &self,
        key: &str,
        value: &T,
        options: &PutOptions,
    ) -> Result<()> {
        self.put(key, serde_json::to_vec(value)?, options)
    }

    /// Follow cursors until the listing completes and return every entry seen.
    fn list_all(&self, prefix: Option<&str>) -> Result<Vec<ListEntry>> {
        let mut out = Vec::new();
        let mut cursor: Option<String> = None;
        loop {
            let page = self.list(&ListOptions {
                prefix: prefix.map(str::to_string),
                limit: None,
                cursor: cursor.take(),
            })?;
            out.extend(page.keys);
            if page.list_complete {
                return Ok(out);
            }
            match page.cursor {
                Some(next) => cursor = Some(next),
                None => {
                    return Err(Error::Storage(
                        "incomplete list page returned no cursor".to_string(),
                    ));
                }
            }
        }
    }
}

impl<N: Namespace + ?Sized> NamespaceExt for N {}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::namespace::KvNamespace;
    use crate::storage::memory::MemoryStorage;

    #[test]
    fn text_and_json_helpers_roundtrip() {
        let ns = KvNamespace::new(MemoryStorage::new());
        ns.put_text("greeting", "hello", &PutOptions::default())
            .expect("put");
        ns.put_json("doc", &json!({"a": 1}), &PutOptions::default())
            .expect("put");

        assert_eq!(ns.get_text("greeting").expect("get").as_deref(), Some("hello"));
        assert_eq!(
            ns.get_json::<serde_json::Value>("doc").expect("get"),
            Some(json!({"a": 1}))
        );
        assert_eq!(ns.get_text("missing").expect("get"), None);
    }

    #[test]
    fn get_text_rejects_invalid_utf8() {
        let ns = KvNamespace::new(MemoryStorage::new());
        ns.put("bin", vec![0xff, 0xfe], &PutOptions::default())
            .expect("put");
        assert_eq!(ns.get_text("bin").unwrap_err().code(), "serialization");
    }

    #[test]
    fn list_all_follows_cursors() {
        let ns = KvNamespace::new(MemoryStorage::new())
            .with_limits(kv_filter_core::policy::Limits {
                max_list_keys: 2,
                ..Default::default()
            })
            .expect("limits");
        for key in ["a", "b", "c", "d", "e"] {
            ns.put_text(key, key, &PutOptions::default()).expect("put");
        }
        let names: Vec<_> = ns
            .list_all(None)
            .expect("list")
            .into_iter()
            .map(|entry| entry.name)
            .collect();
        assert_eq!(names, ["a", "b", "c", "d", "e"]);
    }
}
