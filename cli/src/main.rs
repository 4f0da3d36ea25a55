use std::path::PathBuf;

use clap::Parser;

use kv_filter::namespace::{FilteredNamespace, KvNamespace};
use kv_filter::storage::sqlite::SqliteStorage;
use kv_filter_cli::commands::{self, Command};
use kv_filter_core::policy::NamespaceConfig;

#[derive(Debug, Parser)]
#[command(name = "kv-filter")]
struct Args {
    /// SQLite database file path (created if missing)
    #[arg(long)]
    sqlite: PathBuf,

    /// Config file path (.toml or .json), parsed as kv_filter_core::policy::NamespaceConfig.
    /// Without it every key is visible and writable.
    #[arg(long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let config = match &args.config {
        Some(path) => kv_filter_cli::config_io::load_config(path)?,
        None => NamespaceConfig::default(),
    };

    let storage = SqliteStorage::open(&args.sqlite)?;
    let base = KvNamespace::new(storage).with_limits(config.limits)?;
    let view = FilteredNamespace::new(base, &config.filter)?;
    tracing::debug!(
        sqlite = %args.sqlite.display(),
        read_only = view.filter().is_read_only(),
        "opened filtered namespace"
    );

    let output = commands::run(&view, args.command)?;
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}
