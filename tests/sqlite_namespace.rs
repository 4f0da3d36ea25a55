#![cfg(feature = "sqlite")]

use std::sync::Arc;

use serde_json::json;

use kv_filter::clock::ManualClock;
use kv_filter::namespace::{
    FilteredNamespace, GetOptions, KvNamespace, ListOptions, Namespace, NamespaceExt, PutOptions,
};
use kv_filter::storage::sqlite::SqliteStorage;
use kv_filter_core::policy::FilterPolicy;

fn open_namespace(path: &std::path::Path) -> KvNamespace<SqliteStorage> {
    let storage = SqliteStorage::open(path).expect("open sqlite");
    KvNamespace::new(storage)
}

#[test]
fn values_survive_reopen() {
    let db = tempfile::NamedTempFile::new().expect("temp db");

    {
        let ns = open_namespace(db.path());
        ns.put(
            "config/a",
            b"alpha".to_vec(),
            &PutOptions {
                metadata: Some(json!({"rev": 1})),
                ..PutOptions::default()
            },
        )
        .expect("put");
    }

    let ns = open_namespace(db.path());
    let got = ns
        .get_with_metadata("config/a", &GetOptions::default())
        .expect("get");
    assert_eq!(got.value.as_deref(), Some(&b"alpha"[..]));
    assert_eq!(got.metadata, Some(json!({"rev": 1})));
}

#[test]
fn filtered_view_over_sqlite_paginates_visible_keys() {
    let db = tempfile::NamedTempFile::new().expect("temp db");
    let base = Arc::new(open_namespace(db.path()));
    for idx in 0..25 {
        let key = if idx % 3 == 0 {
            format!("private/{idx:02}")
        } else {
            format!("public/{idx:02}")
        };
        base.put_text(&key, "v", &PutOptions::default()).expect("put");
    }

    let view = FilteredNamespace::new(
        base.clone(),
        &FilterPolicy {
            read_only: true,
            include: Vec::new(),
            exclude: vec!["glob:private/*".to_string()],
        },
    )
    .expect("view");

    let mut seen = Vec::new();
    let mut cursor = None;
    let mut pages = 0;
    loop {
        let page = view
            .list(&ListOptions {
                prefix: None,
                limit: Some(4),
                cursor: cursor.take(),
            })
            .expect("list");
        pages += 1;
        assert!(page.keys.len() <= 4);
        seen.extend(page.keys.into_iter().map(|entry| entry.name));
        if page.list_complete {
            break;
        }
        cursor = page.cursor;
    }

    assert_eq!(pages, 7);
    assert_eq!(seen.len(), 16);
    assert!(seen.iter().all(|name| name.starts_with("public/")));
    assert_eq!(view.list_all(Some("private/")).expect("list"), Vec::new());
    assert_eq!(base.list_all(Some("private/")).expect("list").len(), 9);

    let err = view.delete("public/01").unwrap_err();
    assert_eq!(err.code(), "permission_denied");
    assert!(base.get_text("public/01").expect("get").is_some());
}

#[test]
fn expiration_is_enforced_against_the_clock() {
    let clock = Arc::new(ManualClock::new(10_000_000));
    let ns = KvNamespace::with_clock(
        SqliteStorage::open_in_memory().expect("open"),
        clock.clone(),
    );
    ns.put(
        "session",
        b"token".to_vec(),
        &PutOptions {
            expiration_ttl: Some(120),
            ..PutOptions::default()
        },
    )
    .expect("put");

    assert_eq!(ns.get_text("session").expect("get").as_deref(), Some("token"));
    clock.advance_ms(120_000);
    assert_eq!(ns.list_all(None).expect("list"), Vec::new());
    assert_eq!(ns.get_text("session").expect("get"), None);
}
