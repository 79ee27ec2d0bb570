//! Glob pattern matching for key invalidation
//!
//! Patterns support `*` (any sequence, including empty) and `?` (exactly
//! one character). Every other character matches literally; the match is
//! anchored at both ends, so `user:*` matches whole keys, not substrings.

use regex::Regex;

use crate::{CacheError, Result};

/// A compiled glob pattern
#[derive(Debug, Clone)]
pub struct GlobMatcher {
    pattern: String,
    regex: Regex,
}

impl GlobMatcher {
    /// Compile a glob pattern into an anchored matcher
    pub fn new(pattern: &str) -> Result<Self> {
        let mut expr = String::with_capacity(pattern.len() + 8);
        expr.push('^');
        for ch in pattern.chars() {
            match ch {
                '*' => expr.push_str(".*"),
                '?' => expr.push('.'),
                ch => expr.push_str(&regex::escape(ch.encode_utf8(&mut [0u8; 4]))),
            }
        }
        expr.push('$');

        let regex = Regex::new(&expr)
            .map_err(|e| CacheError::Validation(format!("invalid pattern {pattern:?}: {e}")))?;

        Ok(Self {
            pattern: pattern.to_string(),
            regex,
        })
    }

    /// Whether the whole key matches the pattern
    pub fn matches(&self, key: &str) -> bool {
        self.regex.is_match(key)
    }

    /// The original glob pattern
    pub fn pattern(&self) -> &str {
        &self.pattern
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_star_matches_any_sequence() {
        let m = GlobMatcher::new("user:*").unwrap();
        assert!(m.matches("user:1"));
        assert!(m.matches("user:1:profile"));
        assert!(m.matches("user:"));
        assert!(!m.matches("post:1"));
    }

    #[test]
    fn test_question_mark_matches_exactly_one() {
        let m = GlobMatcher::new("a?c").unwrap();
        assert!(m.matches("abc"));
        assert!(!m.matches("ac"));
        assert!(!m.matches("abbc"));
    }

    #[test]
    fn test_anchored_whole_key() {
        let m = GlobMatcher::new("user").unwrap();
        assert!(m.matches("user"));
        assert!(!m.matches("user:1"));
        assert!(!m.matches("a-user"));
    }

    #[test]
    fn test_metacharacters_are_literal() {
        let m = GlobMatcher::new("a.c").unwrap();
        assert!(m.matches("a.c"));
        assert!(!m.matches("abc"));

        let m = GlobMatcher::new("v[1]").unwrap();
        assert!(m.matches("v[1]"));
        assert!(!m.matches("v1"));

        let m = GlobMatcher::new("price:$*").unwrap();
        assert!(m.matches("price:$10"));
    }

    #[test]
    fn test_star_matches_empty() {
        let m = GlobMatcher::new("*").unwrap();
        assert!(m.matches(""));
        assert!(m.matches("anything"));
    }
}
