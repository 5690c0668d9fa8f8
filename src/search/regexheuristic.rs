//! Literal-vs-regex auto-detection (spec §4.8 `looksLikeRegex`,
//! scenario S3). A pattern is treated as a regex only if it contains a
//! character that is syntactically meaningful in a regex and whose
//! presence would be unusual in a plain source-code literal search.

/// Characters whose presence flips detection to "treat as regex".
/// Bare parentheses are deliberately excluded: `main()`, `foo(x, y)`
/// and similar call-site literals are an extremely common literal
/// search and are not regex syntax on their own (spec §8 S3:
/// `looksLikeRegex("main()") == false`). A lone `.` inside a dotted
/// path is likewise ambiguous and not treated as regex-triggering.
const REGEX_METACHARACTERS: &[char] = &[
    '^', '$', '*', '+', '?', '[', ']', '{', '}', '|', '\\',
];

/// Best-effort classification of whether `pattern` was intended as a
/// regex.
pub fn looks_like_regex(pattern: &str) -> bool {
    if pattern.is_empty() {
        return false;
    }
    pattern.chars().any(|c| REGEX_METACHARACTERS.contains(&c))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_identifier_is_not_regex() {
        assert!(!looks_like_regex("find_candidates"));
    }

    #[test]
    fn dotted_path_is_not_regex() {
        assert!(!looks_like_regex("self.config.paths"));
    }

    /// §8 S3's own literal test vector: a bare function-call pattern
    /// must not be misclassified as a regex.
    #[test]
    fn bare_parens_call_site_is_not_regex() {
        assert!(!looks_like_regex("main()"));
        assert!(!looks_like_regex("foo(x, y)"));
    }

    #[test]
    fn anchors_are_regex() {
        assert!(looks_like_regex("^fn main"));
        assert!(looks_like_regex("main$"));
    }

    #[test]
    fn character_class_is_regex() {
        assert!(looks_like_regex("[a-z]+"));
    }

    #[test]
    fn alternation_is_regex() {
        assert!(looks_like_regex("foo|bar"));
    }

    #[test]
    fn escaped_word_boundary_is_regex() {
        assert!(looks_like_regex(r"\bword\b"));
    }

    #[test]
    fn empty_pattern_is_not_regex() {
        assert!(!looks_like_regex(""));
    }
}
