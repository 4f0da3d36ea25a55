use crate::{Error, Result};

/// Check a key name against the namespace key rules.
pub fn validate_key(key: &str, max_bytes: usize) -> Result<()> {
    if key.is_empty() {
        return Err(Error::InvalidKey("key names must not be empty".to_string()));
    }
    if key == "." || key == ".." {
        return Err(Error::InvalidKey(format!(
            "illegal key name \"{key}\": \".\" and \"..\" are not allowed"
        )));
    }
    if key.len() > max_bytes {
        return Err(Error::KeyTooLarge {
            size_bytes: key.len(),
            max_bytes,
        });
    }
    Ok(())
}
