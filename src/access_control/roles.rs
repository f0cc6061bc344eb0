//! Role matching for the `roles` rule
//!
//! All patterns of one rule are compiled into a single `RegexSet`, so each
//! actor role is scanned once no matter how many patterns the rule lists.

use crate::error::ConfigError;
use regex::{Regex, RegexSet};

/// Role patterns of one `roles` rule
#[derive(Debug)]
pub struct RoleMatcher {
    set: RegexSet,
}

impl RoleMatcher {
    /// Compile role patterns, naming the first one that is not a valid regex
    pub fn new(patterns: &[String]) -> Result<Self, ConfigError> {
        // RegexSet errors do not say which pattern failed
        if let Some((pattern, e)) = patterns
            .iter()
            .find_map(|p| Regex::new(p).err().map(|e| (p, e)))
        {
            return Err(ConfigError::InvalidPattern {
                pattern: pattern.clone(),
                reason: e.to_string(),
            });
        }

        let set = RegexSet::new(patterns).map_err(|e| ConfigError::InvalidPattern {
            pattern: patterns.join(", "),
            reason: e.to_string(),
        })?;
        Ok(Self { set })
    }

    /// First pattern (in rule order) matched by any of the actor's roles
    pub fn first_match<'a, I>(&self, roles: I) -> Option<&str>
    where
        I: IntoIterator<Item = &'a String>,
    {
        roles
            .into_iter()
            .filter_map(|role| self.set.matches(role).into_iter().next())
            .min()
            .map(|index| self.set.patterns()[index].as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_any_role_grants() {
        let matcher = RoleMatcher::new(&strings(&["^admin$", "^editor$"])).unwrap();

        assert_eq!(
            matcher.first_match(&strings(&["viewer", "editor"])),
            Some("^editor$")
        );
        assert_eq!(matcher.first_match(&strings(&["viewer"])), None);
    }

    #[test]
    fn test_actor_without_roles_never_matches() {
        let matcher = RoleMatcher::new(&strings(&[".*"])).unwrap();
        assert_eq!(matcher.first_match(&strings(&[])), None);
    }

    #[test]
    fn test_earliest_pattern_reported() {
        let matcher = RoleMatcher::new(&strings(&["^admin$", "^site-"])).unwrap();

        // Role order does not matter; rule order does
        assert_eq!(
            matcher.first_match(&strings(&["site-editor", "admin"])),
            Some("^admin$")
        );
    }

    #[test]
    fn test_anchors_are_respected() {
        let matcher = RoleMatcher::new(&strings(&["^editor$"])).unwrap();
        assert_eq!(matcher.first_match(&strings(&["editor-in-chief"])), None);
    }

    #[test]
    fn test_invalid_pattern_is_named() {
        let err = RoleMatcher::new(&strings(&["^admin$", "[unclosed"])).unwrap_err();
        match err {
            ConfigError::InvalidPattern { pattern, .. } => assert_eq!(pattern, "[unclosed"),
            other => panic!("expected invalid pattern, got {other:?}"),
        }
    }
}
