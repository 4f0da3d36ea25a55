use std::fmt;
use std::path::Path;

use anyhow::anyhow;

use kv_filter_core::filter::KeyFilter;
use kv_filter_core::policy::NamespaceConfig;

const MAX_CONFIG_BYTES: u64 = 4 * 1024 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ConfigFormat {
    Toml,
    Json,
}

impl ConfigFormat {
    /// Extensionless files are read as TOML.
    fn from_path(path: &Path) -> anyhow::Result<Self> {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("toml") | None => Ok(Self::Toml),
            Some("json") => Ok(Self::Json),
            Some(other) => Err(anyhow!(
                "{}: unsupported config extension: {other} (expected .toml or .json)",
                path.display()
            )),
        }
    }
}

impl fmt::Display for ConfigFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Toml => "TOML",
            Self::Json => "JSON",
        })
    }
}

/// Load a namespace config and check it the way the namespace will use it.
///
/// Every error names the file. Besides field validation the filter patterns are compiled here,
/// so a bad regex or glob is reported against the config that holds it.
pub fn load_config(path: impl AsRef<Path>) -> anyhow::Result<NamespaceConfig> {
    let path = path.as_ref();
    let format = ConfigFormat::from_path(path)?;

    let size = std::fs::metadata(path)
        .map_err(|err| anyhow!("{}: cannot read config: {err}", path.display()))?
        .len();
    if size > MAX_CONFIG_BYTES {
        anyhow::bail!(
            "{}: config is {size} bytes; at most {MAX_CONFIG_BYTES} bytes are accepted",
            path.display()
        );
    }
    let raw = std::fs::read_to_string(path)
        .map_err(|err| anyhow!("{}: cannot read config: {err}", path.display()))?;

    let config: NamespaceConfig = match format {
        ConfigFormat::Toml => toml::from_str(&raw).map_err(|err| err.to_string()),
        ConfigFormat::Json => serde_json::from_str(&raw).map_err(|err| err.to_string()),
    }
    .map_err(|err| anyhow!("{}: invalid {format} config: {err}", path.display()))?;

    config
        .validate()
        .and_then(|()| KeyFilter::from_policy(&config.filter).map(drop))
        .map_err(|err| anyhow!("{}: {err}", path.display()))?;

    tracing::debug!(
        config = %path.display(),
        %format,
        read_only = config.filter.read_only,
        include = config.filter.include.len(),
        exclude = config.filter.exclude.len(),
        "loaded namespace config"
    );
    Ok(config)
}
