//! Key patterns used by filter policies.
//!
//! A pattern is either a glob (`glob:logs/**`) matched against the whole key, or a regular
//! expression (`regex:^public-` or a bare `^public-`) searched anywhere in the key.

use globset::{GlobBuilder, GlobSet, GlobSetBuilder};
use regex::{RegexBuilder, RegexSet, RegexSetBuilder};

use crate::{Error, Result};

const GLOB_PREFIX: &str = "glob:";
const REGEX_PREFIX: &str = "regex:";

const MAX_PATTERN_BYTES: usize = 4096;
const MAX_REGEX_COMPILED_SIZE_BYTES: usize = 1_000_000;
const MAX_REGEX_NEST_LIMIT: u32 = 128;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatternKind {
    Glob,
    Regex,
}

/// Split a pattern into its kind and body.
pub fn classify_pattern(pattern: &str) -> (PatternKind, &str) {
    if let Some(body) = pattern.strip_prefix(GLOB_PREFIX) {
        (PatternKind::Glob, body)
    } else if let Some(body) = pattern.strip_prefix(REGEX_PREFIX) {
        (PatternKind::Regex, body)
    } else {
        (PatternKind::Regex, pattern)
    }
}

fn summarize_pattern_for_error(pattern: &str) -> String {
    const MAX_BYTES: usize = 200;
    if pattern.len() <= MAX_BYTES {
        return pattern.to_string();
    }
    let mut end = MAX_BYTES;
    while end > 0 && !pattern.is_char_boundary(end) {
        end = end.saturating_sub(1);
    }
    format!("{}…", &pattern[..end])
}

/// A compiled set of key patterns. Matches when any member matches.
#[derive(Debug, Clone)]
pub struct KeyMatcher {
    regexes: Option<RegexSet>,
    globs: Option<GlobSet>,
}

impl KeyMatcher {
    /// Compile `patterns`; `field` names the policy list in error messages.
    pub fn compile(field: &str, patterns: &[String]) -> Result<Self> {
        let mut regex_bodies = Vec::<&str>::new();
        let mut glob_builder = GlobSetBuilder::new();
        let mut has_globs = false;

        for (idx, pattern) in patterns.iter().enumerate() {
            let preview = summarize_pattern_for_error(pattern);
            if pattern.len() > MAX_PATTERN_BYTES {
                return Err(Error::InvalidPolicy(format!(
                    "{field}[{idx}] is too large ({} bytes; max {MAX_PATTERN_BYTES} bytes)",
                    pattern.len()
                )));
            }
            let (kind, body) = classify_pattern(pattern);
            if body.is_empty() {
                return Err(Error::InvalidPolicy(format!(
                    "{field}[{idx}]: empty pattern is not allowed"
                )));
            }
            match kind {
                PatternKind::Regex => {
                    // Compiled alone first so errors name the offending entry.
                    RegexBuilder::new(body)
                        .size_limit(MAX_REGEX_COMPILED_SIZE_BYTES)
                        .nest_limit(MAX_REGEX_NEST_LIMIT)
                        .build()
                        .map_err(|err| {
                            Error::InvalidPolicy(format!(
                                "invalid {field}[{idx}] regex {preview:?}: {err}"
                            ))
                        })?;
                    regex_bodies.push(body);
                }
                PatternKind::Glob => {
                    let glob = GlobBuilder::new(body)
                        .literal_separator(true)
                        .build()
                        .map_err(|err| {
                            Error::InvalidPolicy(format!(
                                "invalid {field}[{idx}] glob {preview:?}: {err}"
                            ))
                        })?;
                    glob_builder.add(glob);
                    has_globs = true;
                }
            }
        }

        let regexes = if regex_bodies.is_empty() {
            None
        } else {
            Some(
                RegexSetBuilder::new(&regex_bodies)
                    .size_limit(MAX_REGEX_COMPILED_SIZE_BYTES.saturating_mul(regex_bodies.len()))
                    .nest_limit(MAX_REGEX_NEST_LIMIT)
                    .build()
                    .map_err(|err| Error::InvalidPolicy(format!("invalid {field} regexes: {err}")))?,
            )
        };

        let globs = if has_globs {
            Some(
                glob_builder
                    .build()
                    .map_err(|err| Error::InvalidPolicy(format!("invalid {field} globs: {err}")))?,
            )
        } else {
            None
        };

        Ok(Self { regexes, globs })
    }

    pub fn is_match(&self, key: &str) -> bool {
        if self
            .regexes
            .as_ref()
            .is_some_and(|regexes| regexes.is_match(key))
        {
            return true;
        }
        self.globs.as_ref().is_some_and(|globs| globs.is_match(key))
    }
}
