use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use clap::Subcommand;
use serde_json::{Value, json};

use kv_filter::namespace::{GetOptions, ListOptions, Namespace, NamespaceExt, PutOptions};

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Read a key. Values that are not UTF-8 are printed as base64 with `"encoding": "base64"`.
    Get {
        key: String,
        /// Include the key's metadata in the output.
        #[arg(long)]
        metadata: bool,
    },
    /// Write a key.
    Put {
        key: String,
        value: String,
        /// Expire the key this many seconds from now.
        #[arg(long)]
        ttl: Option<u64>,
        /// Expire the key at this unix timestamp (seconds).
        #[arg(long)]
        expiration: Option<u64>,
        /// JSON metadata stored alongside the value.
        #[arg(long)]
        metadata: Option<String>,
    },
    /// Delete a key.
    Delete { key: String },
    /// List keys, one page at a time unless `--all` is given.
    List {
        #[arg(long)]
        prefix: Option<String>,
        #[arg(long)]
        limit: Option<usize>,
        #[arg(long)]
        cursor: Option<String>,
        /// Follow cursors until the listing completes.
        #[arg(long, conflicts_with_all = ["limit", "cursor"])]
        all: bool,
    },
}

/// Execute `command` against `namespace` and return the JSON printed to stdout.
pub fn run(namespace: &impl Namespace, command: Command) -> anyhow::Result<Value> {
    match command {
        Command::Get { key, metadata } => {
            let got = namespace.get_with_metadata(&key, &GetOptions::default())?;
            let mut out = json!({ "key": key, "value": null });
            match got.value.map(String::from_utf8) {
                None => {}
                Some(Ok(text)) => out["value"] = Value::String(text),
                Some(Err(err)) => {
                    out["value"] = Value::String(STANDARD.encode(err.as_bytes()));
                    out["encoding"] = json!("base64");
                }
            }
            if metadata {
                out["metadata"] = got.metadata.unwrap_or(Value::Null);
            }
            Ok(out)
        }
        Command::Put {
            key,
            value,
            ttl,
            expiration,
            metadata,
        } => {
            let metadata = metadata
                .map(|raw| serde_json::from_str::<Value>(&raw))
                .transpose()
                .map_err(|err| anyhow::anyhow!("--metadata is not valid JSON: {err}"))?;
            namespace.put_text(
                &key,
                &value,
                &PutOptions {
                    expiration,
                    expiration_ttl: ttl,
                    metadata,
                },
            )?;
            Ok(json!({ "key": key, "written": true }))
        }
        Command::Delete { key } => {
            namespace.delete(&key)?;
            Ok(json!({ "key": key, "deleted": true }))
        }
        Command::List {
            prefix,
            limit,
            cursor,
            all,
        } => {
            if all {
                let keys = namespace.list_all(prefix.as_deref())?;
                return Ok(json!({ "keys": keys, "list_complete": true }));
            }
            let page = namespace.list(&ListOptions {
                prefix,
                limit,
                cursor,
            })?;
            Ok(serde_json::to_value(page)?)
        }
    }
}
