use kv_filter_core::filter::KeyFilter;
use kv_filter_core::policy::FilterPolicy;
use kv_filter_core::{Error, Result, WriteOp};

use super::{GetOptions, ListOptions, ListPage, Namespace, PutOptions, ValueWithMetadata};

/// A policy-enforcing view over another [`Namespace`].
///
/// Reads and listings only ever expose keys the policy makes visible; a hidden key is
/// indistinguishable from a missing one. A read-only view rejects every write. Writes through a
/// writable view are not checked against key visibility.
///
/// Listing filters each page the wrapped namespace returns and passes `list_complete` and
/// `cursor` through untouched, so pages may come back short or empty while more remain.
#[derive(Debug)]
pub struct FilteredNamespace<N> {
    inner: N,
    filter: KeyFilter,
}

impl<N: Namespace> FilteredNamespace<N> {
    pub fn new(inner: N, policy: &FilterPolicy) -> Result<Self> {
        Ok(Self::with_filter(inner, KeyFilter::from_policy(policy)?))
    }

    pub fn with_filter(inner: N, filter: KeyFilter) -> Self {
        Self { inner, filter }
    }

    pub fn filter(&self) -> &KeyFilter {
        &self.filter
    }

    fn ensure_writable(&self, op: WriteOp) -> Result<()> {
        if self.filter.is_read_only() {
            tracing::debug!(%op, "rejected write to read-only namespace");
            return Err(Error::PermissionDenied { op });
        }
        Ok(())
    }
}

impl<N: Namespace> Namespace for FilteredNamespace<N> {
    fn get_with_metadata(&self, key: &str, options: &GetOptions) -> Result<ValueWithMetadata> {
        if !self.filter.is_included(key) {
            tracing::debug!(key, "key hidden by filter policy");
            return Ok(ValueWithMetadata::default());
        }
        self.inner.get_with_metadata(key, options)
    }

    // Routed through our own `get_with_metadata` so both reads agree on visibility.
    fn get(&self, key: &str, options: &GetOptions) -> Result<Option<Vec<u8>>> {
        Ok(self.get_with_metadata(key, options)?.value)
    }

    fn put(&self, key: &str, value: Vec<u8>, options: &PutOptions) -> Result<()> {
        self.ensure_writable(WriteOp::Put)?;
        self.inner.put(key, value, options)
    }

    fn delete(&self, key: &str) -> Result<()> {
        self.ensure_writable(WriteOp::Delete)?;
        self.inner.delete(key)
    }

    fn list(&self, options: &ListOptions) -> Result<ListPage> {
        let ListPage {
            mut keys,
            list_complete,
            cursor,
        } = self.inner.list(options)?;

        let fetched = keys.len();
        keys.retain(|entry| self.filter.is_included(&entry.name));
        tracing::trace!(fetched, visible = keys.len(), list_complete, "filtered list page");

        Ok(ListPage {
            keys,
            list_complete,
            cursor,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::namespace::KvNamespace;
    use crate::storage::memory::MemoryStorage;

    type Base = Arc<KvNamespace<MemoryStorage>>;

    fn base_with(keys: &[&str]) -> Base {
        let base = Arc::new(KvNamespace::new(MemoryStorage::new()));
        for key in keys {
            base.put(key, key.as_bytes().to_vec(), &PutOptions::default())
                .expect("put");
        }
        base
    }

    #[test]
    fn read_only_rejects_writes_without_touching_base() {
        let base = base_with(&["a"]);
        let view = FilteredNamespace::new(base.clone(), &FilterPolicy::read_only()).expect("view");

        let err = view
            .put("a", b"1".to_vec(), &PutOptions::default())
            .unwrap_err();
        assert!(matches!(err, Error::PermissionDenied { op: WriteOp::Put }));
        let err = view.delete("a").unwrap_err();
        assert!(matches!(
            err,
            Error::PermissionDenied {
                op: WriteOp::Delete
            }
        ));

        assert_eq!(
            base.get("a", &GetOptions::default()).expect("get").as_deref(),
            Some(&b"a"[..])
        );
    }

    #[test]
    fn read_only_rejects_before_key_validation() {
        let view =
            FilteredNamespace::new(base_with(&[]), &FilterPolicy::read_only()).expect("view");
        let err = view.put("", Vec::new(), &PutOptions::default()).unwrap_err();
        assert_eq!(err.code(), "permission_denied");
    }

    #[test]
    fn hidden_keys_read_as_missing() {
        let base = base_with(&["secret"]);
        let view =
            FilteredNamespace::new(base.clone(), &FilterPolicy::excluding(["^secret$"]))
                .expect("view");

        assert_eq!(view.get("secret", &GetOptions::default()).expect("get"), None);
        assert_eq!(
            view.get_with_metadata("secret", &GetOptions::default())
                .expect("get"),
            ValueWithMetadata {
                value: None,
                metadata: None
            }
        );
        assert!(base.get("secret", &GetOptions::default()).expect("get").is_some());
    }

    #[test]
    fn hidden_key_reads_skip_base_validation() {
        let view = FilteredNamespace::new(base_with(&[]), &FilterPolicy::including(["^public-"]))
            .expect("view");
        let got = view
            .get("", &GetOptions { cache_ttl: Some(1) })
            .expect("hidden keys never reach the base namespace");
        assert_eq!(got, None);
    }

    #[test]
    fn visible_reads_propagate_base_errors() {
        let view = FilteredNamespace::new(base_with(&[]), &FilterPolicy::default()).expect("view");
        let err = view
            .get("k", &GetOptions { cache_ttl: Some(1) })
            .unwrap_err();
        assert_eq!(err.code(), "invalid_option");
    }

    #[test]
    fn include_scenario() {
        let base = base_with(&["public-a", "public-b", "secret-a"]);
        let view =
            FilteredNamespace::new(base, &FilterPolicy::including(["^public-"])).expect("view");

        let page = view.list(&ListOptions::default()).expect("list");
        let names: Vec<_> = page.keys.iter().map(|k| k.name.as_str()).collect();
        assert_eq!(names, ["public-a", "public-b"]);
        assert!(page.list_complete);
        assert_eq!(view.get("secret-a", &GetOptions::default()).expect("get"), None);
    }
}
