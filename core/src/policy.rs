use serde::{Deserialize, Serialize};

use crate::Error;
use crate::Result;

/// Maximum number of patterns accepted in a single `include` or `exclude` list.
pub const MAX_PATTERNS: usize = 256;

/// Static visibility and write policy for a filtered namespace.
///
/// When `include` is non-empty it alone decides visibility and `exclude` is ignored.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct FilterPolicy {
    #[serde(default)]
    pub read_only: bool,
    #[serde(default)]
    pub include: Vec<String>,
    #[serde(default)]
    pub exclude: Vec<String>,
}

impl FilterPolicy {
    pub fn read_only() -> Self {
        Self {
            read_only: true,
            ..Self::default()
        }
    }

    pub fn including<I, P>(patterns: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<String>,
    {
        Self {
            include: patterns.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    pub fn excluding<I, P>(patterns: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<String>,
    {
        Self {
            exclude: patterns.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<()> {
        for (field, patterns) in [("include", &self.include), ("exclude", &self.exclude)] {
            if patterns.len() > MAX_PATTERNS {
                return Err(Error::InvalidPolicy(format!(
                    "filter.{field} has too many patterns ({} > {MAX_PATTERNS})",
                    patterns.len()
                )));
            }
            for (idx, pattern) in patterns.iter().enumerate() {
                if pattern.is_empty() {
                    return Err(Error::InvalidPolicy(format!(
                        "filter.{field}[{idx}] must be non-empty"
                    )));
                }
            }
        }
        Ok(())
    }
}

/// Size and count limits enforced by the base namespace.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct Limits {
    #[serde(default = "default_max_key_bytes")]
    pub max_key_bytes: usize,
    #[serde(default = "default_max_value_bytes")]
    pub max_value_bytes: usize,
    #[serde(default = "default_max_metadata_bytes")]
    pub max_metadata_bytes: usize,
    /// Default and maximum page size for `list`.
    #[serde(default = "default_max_list_keys")]
    pub max_list_keys: usize,
    /// Smallest accepted `expiration_ttl` and `cache_ttl`, in seconds.
    #[serde(default = "default_min_ttl_secs")]
    pub min_ttl_secs: u64,
}

const fn default_max_key_bytes() -> usize {
    512
}

const fn default_max_value_bytes() -> usize {
    25 * 1024 * 1024
}

const fn default_max_metadata_bytes() -> usize {
    1024
}

const fn default_max_list_keys() -> usize {
    1000
}

const fn default_min_ttl_secs() -> u64 {
    60
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_key_bytes: default_max_key_bytes(),
            max_value_bytes: default_max_value_bytes(),
            max_metadata_bytes: default_max_metadata_bytes(),
            max_list_keys: default_max_list_keys(),
            min_ttl_secs: default_min_ttl_secs(),
        }
    }
}

impl Limits {
    pub fn validate(&self) -> Result<()> {
        const MAX_LIST_KEYS_CAP: usize = 10_000;

        if self.max_key_bytes == 0 {
            return Err(Error::InvalidPolicy(
                "limits.max_key_bytes must be > 0".to_string(),
            ));
        }
        if self.max_value_bytes == 0 {
            return Err(Error::InvalidPolicy(
                "limits.max_value_bytes must be > 0".to_string(),
            ));
        }
        if self.max_metadata_bytes == 0 {
            return Err(Error::InvalidPolicy(
                "limits.max_metadata_bytes must be > 0".to_string(),
            ));
        }
        if self.max_list_keys == 0 {
            return Err(Error::InvalidPolicy(
                "limits.max_list_keys must be > 0".to_string(),
            ));
        }
        if self.max_list_keys > MAX_LIST_KEYS_CAP {
            return Err(Error::InvalidPolicy(format!(
                "limits.max_list_keys is too large (max {MAX_LIST_KEYS_CAP})"
            )));
        }
        Ok(())
    }
}

/// Everything a namespace needs at construction: the view policy plus base limits.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct NamespaceConfig {
    #[serde(default)]
    pub filter: FilterPolicy,
    #[serde(default)]
    pub limits: Limits,
}

impl NamespaceConfig {
    pub fn validate(&self) -> Result<()> {
        self.filter.validate()?;
        self.limits.validate()
    }
}
