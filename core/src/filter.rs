use crate::Result;
use crate::pattern::KeyMatcher;
use crate::policy::FilterPolicy;

#[derive(Debug, Clone)]
enum Visibility {
    All,
    Include(KeyMatcher),
    Exclude(KeyMatcher),
}

/// Compiled form of a [`FilterPolicy`].
///
/// Exactly one visibility mode is active: a non-empty `include` list wins outright, otherwise a
/// non-empty `exclude` list applies, otherwise every key is visible.
#[derive(Debug, Clone)]
pub struct KeyFilter {
    read_only: bool,
    visibility: Visibility,
}

impl KeyFilter {
    pub fn from_policy(policy: &FilterPolicy) -> Result<Self> {
        policy.validate()?;

        let visibility = if !policy.include.is_empty() {
            if !policy.exclude.is_empty() {
                tracing::warn!(
                    include = policy.include.len(),
                    exclude = policy.exclude.len(),
                    "filter policy sets both include and exclude; exclude is ignored"
                );
            }
            Visibility::Include(KeyMatcher::compile("filter.include", &policy.include)?)
        } else if !policy.exclude.is_empty() {
            Visibility::Exclude(KeyMatcher::compile("filter.exclude", &policy.exclude)?)
        } else {
            Visibility::All
        };

        Ok(Self {
            read_only: policy.read_only,
            visibility,
        })
    }

    pub fn is_read_only(&self) -> bool {
        self.read_only
    }

    pub fn is_included(&self, key: &str) -> bool {
        match &self.visibility {
            Visibility::All => true,
            Visibility::Include(matcher) => matcher.is_match(key),
            Visibility::Exclude(matcher) => !matcher.is_match(key),
        }
    }
}
