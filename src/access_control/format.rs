//! Identifier formatting
//!
//! Renders internal slugs as names that are valid in the external schema's
//! identifier grammar (`[_A-Za-z][_0-9A-Za-z]*`).

use regex::Regex;
use std::sync::LazyLock;

/// Slugs accepted at configuration time
static SLUG_GRAMMAR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z0-9]+(?:[-_./ ]+[A-Za-z0-9]+)*$").expect("slug grammar is a valid regex")
});

/// External identifier grammar
static IDENTIFIER_GRAMMAR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[_A-Za-z][_0-9A-Za-z]*$").expect("identifier grammar is a valid regex")
});

/// Format a slug as a PascalCase external identifier
///
/// Every run of characters outside `[A-Za-z0-9]` acts as a word separator.
/// A leading digit gets a `_` prefix; an input with no usable characters
/// becomes `_`.
pub fn format_name(slug: &str) -> String {
    let mut formatted = String::with_capacity(slug.len());

    for word in slug
        .split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|w| !w.is_empty())
    {
        let mut chars = word.chars();
        if let Some(first) = chars.next() {
            formatted.push(first.to_ascii_uppercase());
            formatted.push_str(chars.as_str());
        }
    }

    if formatted.is_empty() {
        return "_".to_string();
    }

    if formatted.starts_with(|c: char| c.is_ascii_digit()) {
        formatted.insert(0, '_');
    }

    formatted
}

/// Check a slug against the configuration-time grammar
pub fn is_valid_slug(slug: &str) -> bool {
    SLUG_GRAMMAR.is_match(slug)
}

/// Check a name against the external identifier grammar
pub fn is_valid_identifier(name: &str) -> bool {
    IDENTIFIER_GRAMMAR.is_match(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::collections::HashSet;

    #[rstest]
    #[case("pages", "Pages")]
    #[case("blog-posts", "BlogPosts")]
    #[case("site_settings", "SiteSettings")]
    #[case("api/v2", "ApiV2")]
    #[case("media.assets", "MediaAssets")]
    #[case("2fa-codes", "_2faCodes")]
    #[case("alreadyCamel", "AlreadyCamel")]
    #[case("HTTP-logs", "HTTPLogs")]
    #[case("", "_")]
    #[case("---", "_")]
    fn test_format_name(#[case] slug: &str, #[case] expected: &str) {
        assert_eq!(format_name(slug), expected);
    }

    #[test]
    fn test_format_name_is_deterministic() {
        assert_eq!(format_name("blog-posts"), format_name("blog-posts"));
    }

    #[test]
    fn test_formatted_names_are_identifiers() {
        for slug in ["pages", "2fa", "a-b-c", "x/y.z", "", "é-accent", "users"] {
            assert!(
                is_valid_identifier(&format_name(slug)),
                "{slug} formatted to an invalid identifier"
            );
        }
    }

    #[test]
    fn test_distinct_registry_slugs_stay_distinct() {
        let slugs = ["pages", "posts", "blog-posts", "media", "users", "site-settings"];
        let formatted: HashSet<String> = slugs.iter().map(|s| format_name(s)).collect();
        assert_eq!(formatted.len(), slugs.len());
    }

    #[rstest]
    #[case("pages", true)]
    #[case("blog-posts", true)]
    #[case("api/v2", true)]
    #[case("-leading", false)]
    #[case("trailing-", false)]
    #[case("bad slug!", false)]
    #[case("", false)]
    fn test_slug_grammar(#[case] slug: &str, #[case] valid: bool) {
        assert_eq!(is_valid_slug(slug), valid);
    }
}
