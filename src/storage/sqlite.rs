use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use rusqlite::OptionalExtension;
use serde_json::Value;

use kv_filter_core::{Error, Result};

use super::{Storage, StorageListOptions, StoredKey, StoredValue, storage_err};

/// SQLite-backed storage engine. Access is serialized through one connection.
#[derive(Debug)]
pub struct SqliteStorage {
    conn: Mutex<rusqlite::Connection>,
}

impl SqliteStorage {
    pub fn new(conn: rusqlite::Connection) -> Result<Self> {
        let _ = conn.busy_timeout(Duration::from_secs(5));
        crate::migrations::migrate_sqlite(&conn).map_err(storage_err)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let conn = rusqlite::Connection::open(path).map_err(storage_err)?;
        Self::new(conn)
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = rusqlite::Connection::open_in_memory().map_err(storage_err)?;
        Self::new(conn)
    }

    fn conn(&self) -> Result<MutexGuard<'_, rusqlite::Connection>> {
        self.conn.lock().map_err(storage_err)
    }
}

impl Storage for SqliteStorage {
    fn get(&self, key: &str) -> Result<Option<StoredValue>> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare(
                "SELECT value, expiration, metadata_json
                 FROM kv_entries
                 WHERE key = ?1",
            )
            .map_err(storage_err)?;

        let row = stmt
            .query_row(rusqlite::params![key], |row| {
                Ok((
                    row.get::<_, Vec<u8>>(0)?,
                    row.get::<_, Option<i64>>(1)?,
                    row.get::<_, Option<String>>(2)?,
                ))
            })
            .optional()
            .map_err(storage_err)?;

        let Some((value, expiration, metadata_json)) = row else {
            return Ok(None);
        };
        Ok(Some(StoredValue {
            value,
            expiration: expiration.map(|v| i64_to_u64(v, "expiration")).transpose()?,
            metadata: parse_metadata(metadata_json)?,
        }))
    }

    fn put(&self, key: &str, value: StoredValue) -> Result<()> {
        let expiration = value
            .expiration
            .map(|v| u64_to_i64(v, "expiration"))
            .transpose()?;
        let metadata_json = value
            .metadata
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;

        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO kv_entries(key, value, expiration, metadata_json)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(key) DO UPDATE SET
                value = excluded.value,
                expiration = excluded.expiration,
                metadata_json = excluded.metadata_json",
            rusqlite::params![key, value.value, expiration, metadata_json],
        )
        .map_err(storage_err)?;
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<bool> {
        let conn = self.conn()?;
        let deleted = conn
            .execute(
                "DELETE FROM kv_entries WHERE key = ?1",
                rusqlite::params![key],
            )
            .map_err(storage_err)?;
        Ok(deleted == 1)
    }

    fn delete_expired(&self, key: &str, now: u64) -> Result<bool> {
        let now = u64_to_i64(now, "now")?;
        let conn = self.conn()?;
        let deleted = conn
            .execute(
                "DELETE FROM kv_entries
                 WHERE key = ?1 AND expiration IS NOT NULL AND expiration <= ?2",
                rusqlite::params![key, now],
            )
            .map_err(storage_err)?;
        Ok(deleted == 1)
    }

    fn list(&self, options: &StorageListOptions) -> Result<Vec<StoredKey>> {
        let prefix_len = u64_to_i64(options.prefix.len() as u64, "prefix length")?;
        let live_at = options
            .live_at
            .map(|v| u64_to_i64(v, "live_at"))
            .transpose()?;
        let limit = u64_to_i64(options.limit as u64, "limit")?;

        let conn = self.conn()?;
        let mut stmt = conn
            .prepare(
                "SELECT key, expiration, metadata_json
                 FROM kv_entries
                 WHERE key >= ?1
                   AND (?2 = 0 OR substr(CAST(key AS BLOB), 1, ?2) = CAST(?1 AS BLOB))
                   AND (?3 IS NULL OR key > ?3)
                   AND (?4 IS NULL OR expiration IS NULL OR expiration > ?4)
                 ORDER BY key
                 LIMIT ?5",
            )
            .map_err(storage_err)?;

        let rows = stmt
            .query_map(
                rusqlite::params![
                    options.prefix,
                    prefix_len,
                    options.start_after,
                    live_at,
                    limit
                ],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, Option<i64>>(1)?,
                        row.get::<_, Option<String>>(2)?,
                    ))
                },
            )
            .map_err(storage_err)?;

        let mut out = Vec::new();
        for row in rows {
            let (name, expiration, metadata_json) = row.map_err(storage_err)?;
            out.push(StoredKey {
                name,
                expiration: expiration.map(|v| i64_to_u64(v, "expiration")).transpose()?,
                metadata: parse_metadata(metadata_json)?,
            });
        }
        Ok(out)
    }
}

fn parse_metadata(raw: Option<String>) -> Result<Option<Value>> {
    raw.map(|raw| {
        serde_json::from_str::<Value>(&raw)
            .map_err(|err| Error::Storage(format!("corrupt metadata_json: {err}")))
    })
    .transpose()
}

fn u64_to_i64(value: u64, field: &'static str) -> Result<i64> {
    i64::try_from(value).map_err(|_| Error::Storage(format!("integer overflow converting {field}")))
}

fn i64_to_u64(value: i64, field: &'static str) -> Result<u64> {
    u64::try_from(value)
        .map_err(|_| Error::Storage(format!("invalid negative {field} value: {value}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn put_overwrites_and_roundtrips_metadata() {
        let storage = SqliteStorage::open_in_memory().expect("open");
        storage
            .put(
                "k",
                StoredValue {
                    value: b"one".to_vec(),
                    expiration: Some(42),
                    metadata: Some(serde_json::json!({"n": 1})),
                },
            )
            .expect("put");
        storage
            .put(
                "k",
                StoredValue {
                    value: b"two".to_vec(),
                    expiration: None,
                    metadata: None,
                },
            )
            .expect("put");

        let stored = storage.get("k").expect("get").expect("present");
        assert_eq!(stored.value, b"two");
        assert_eq!(stored.expiration, None);
        assert_eq!(stored.metadata, None);
    }

    #[test]
    fn list_orders_by_key_and_honours_bounds() {
        let storage = SqliteStorage::open_in_memory().expect("open");
        for key in ["b/2", "a", "b/1", "c", "b/3"] {
            storage
                .put(
                    key,
                    StoredValue {
                        value: Vec::new(),
                        expiration: (key == "b/3").then_some(10),
                        metadata: None,
                    },
                )
                .expect("put");
        }

        let keys = storage
            .list(&StorageListOptions {
                prefix: "b/".to_string(),
                start_after: Some("b/1".to_string()),
                live_at: Some(10),
                limit: 10,
            })
            .expect("list");
        let names: Vec<_> = keys.into_iter().map(|k| k.name).collect();
        assert_eq!(names, ["b/2"]);

        let everything = storage
            .list(&StorageListOptions {
                limit: 2,
                ..StorageListOptions::default()
            })
            .expect("list");
        let names: Vec<_> = everything.into_iter().map(|k| k.name).collect();
        assert_eq!(names, ["a", "b/1"]);
    }

    #[test]
    fn prefix_listing_includes_keys_with_high_code_points() {
        let storage = SqliteStorage::open_in_memory().expect("open");
        for key in ["a", "a\u{10FFFF}z", "a\u{10FFFF}\u{10FFFF}", "b", "\u{10FFFF}"] {
            storage
                .put(
                    key,
                    StoredValue {
                        value: Vec::new(),
                        expiration: None,
                        metadata: None,
                    },
                )
                .expect("put");
        }

        let keys = storage
            .list(&StorageListOptions {
                prefix: "a".to_string(),
                limit: 10,
                ..StorageListOptions::default()
            })
            .expect("list");
        let names: Vec<_> = keys.into_iter().map(|k| k.name).collect();
        assert_eq!(names, ["a", "a\u{10FFFF}z", "a\u{10FFFF}\u{10FFFF}"]);

        let page = storage
            .list(&StorageListOptions {
                prefix: "a\u{10FFFF}".to_string(),
                start_after: Some("a\u{10FFFF}z".to_string()),
                limit: 10,
                ..StorageListOptions::default()
            })
            .expect("list");
        let names: Vec<_> = page.into_iter().map(|k| k.name).collect();
        assert_eq!(names, ["a\u{10FFFF}\u{10FFFF}"]);
    }

    #[test]
    fn delete_expired_spares_rewritten_entries() {
        let storage = SqliteStorage::open_in_memory().expect("open");
        let entry = |expiration| StoredValue {
            value: b"v".to_vec(),
            expiration,
            metadata: None,
        };
        storage.put("dead", entry(Some(100))).expect("put");
        storage.put("fresh", entry(None)).expect("put");
        storage.put("later", entry(Some(101))).expect("put");

        assert!(storage.delete_expired("dead", 100).expect("delete"));
        assert!(!storage.delete_expired("fresh", 100).expect("delete"));
        assert!(!storage.delete_expired("later", 100).expect("delete"));
        assert!(storage.get("fresh").expect("get").is_some());
        assert!(storage.get("later").expect("get").is_some());
    }

    #[test]
    fn delete_missing_key_is_not_an_error() {
        let storage = SqliteStorage::open_in_memory().expect("open");
        assert!(!storage.delete("missing").expect("delete"));
    }
}
