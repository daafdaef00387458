//! Glob matching for repository names and step conditions.
//!
//! Patterns are case-sensitive and `*` matches any run of characters,
//! including `/`, so `*automation-testing` matches
//! `github.com/acme/automation-testing`.

use globset::{GlobBuilder, GlobMatcher};

pub use globset::Error as GlobError;

/// Compile `pattern` into a reusable matcher.
pub fn compile(pattern: &str) -> Result<GlobMatcher, GlobError> {
    Ok(GlobBuilder::new(pattern)
        .literal_separator(false)
        .case_insensitive(false)
        .build()?
        .compile_matcher())
}

/// One-shot match of `text` against `pattern`.
pub fn matches(pattern: &str, text: &str) -> Result<bool, GlobError> {
    Ok(compile(pattern)?.is_match(text))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn star_crosses_path_separators() {
        assert!(matches("*automation-testing", "github.com/acme/automation-testing").unwrap());
        assert!(matches("github.com/sourcegraph/src*", "github.com/sourcegraph/src-cli").unwrap());
    }

    #[test]
    fn literal_patterns_must_match_exactly() {
        assert!(!matches("horse", "github.com/sourcegraph/src-cli").unwrap());
        assert!(matches("github.com/acme/x", "github.com/acme/x").unwrap());
    }

    #[test]
    fn matching_is_case_sensitive() {
        assert!(!matches("*Widgets", "github.com/acme/widgets").unwrap());
    }

    #[test]
    fn invalid_pattern_is_an_error() {
        assert!(compile("a[").is_err());
    }
}
