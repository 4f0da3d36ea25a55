use std::fmt;

use thiserror::Error;

/// Write operations a read-only namespace refuses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOp {
    Put,
    Delete,
}

impl fmt::Display for WriteOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WriteOp::Put => f.write_str("put into"),
            WriteOp::Delete => f.write_str("delete from"),
        }
    }
}

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    #[error("storage error: {0}")]
    Storage(String),

    #[error("invalid policy: {0}")]
    InvalidPolicy(String),

    #[error("invalid key: {0}")]
    InvalidKey(String),

    #[error("key is too large ({size_bytes} bytes; max {max_bytes} bytes)")]
    KeyTooLarge { size_bytes: usize, max_bytes: usize },

    #[error("value is too large ({size_bytes} bytes; max {max_bytes} bytes)")]
    ValueTooLarge { size_bytes: usize, max_bytes: usize },

    #[error("metadata is too large ({size_bytes} bytes; max {max_bytes} bytes)")]
    MetadataTooLarge { size_bytes: usize, max_bytes: usize },

    #[error("invalid expiration: {0}")]
    InvalidExpiration(String),

    #[error("invalid option: {0}")]
    InvalidOption(String),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("Unable to {op} read-only namespace")]
    PermissionDenied { op: WriteOp },
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub fn code(&self) -> &'static str {
        match self {
            Error::Storage(_) => "storage",
            Error::InvalidPolicy(_) => "invalid_policy",
            Error::InvalidKey(_) => "invalid_key",
            Error::KeyTooLarge { .. } => "key_too_large",
            Error::ValueTooLarge { .. } => "value_too_large",
            Error::MetadataTooLarge { .. } => "metadata_too_large",
            Error::InvalidExpiration(_) => "invalid_expiration",
            Error::InvalidOption(_) => "invalid_option",
            Error::Serialization(_) => "serialization",
            Error::PermissionDenied { .. } => "permission_denied",
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Serialization(err.to_string())
    }
}
