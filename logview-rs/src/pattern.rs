//! Compiled regular expressions used by the viewer.
//!
//! Two kinds of pattern exist:
//!
//! | Constructor | Used for | Case |
//! |-------------|----------|------|
//! | [`Pattern::highlight`] | named-group highlighting | insensitive |
//! | [`Pattern::new_event_matcher`] | deciding whether a line starts a new event | sensitive |
//!
//! Both are validated when set, so an invalid pattern never becomes active.

use std::sync::Arc;

use regex::{Regex, RegexBuilder};
use thiserror::Error;

/// Error returned when a pattern cannot be compiled.
#[derive(Debug, Error)]
pub enum PatternError {
    #[error("invalid regular expression: {0}")]
    InvalidRegex(#[from] regex::Error),
    #[error("highlight pattern has no named capture groups: {0}")]
    NoNamedGroups(String),
}

/// Upper bound on the compiled program size.  Keeps pathological patterns
/// from eating memory; the regex crate rejects anything larger at build time.
const SIZE_LIMIT: usize = 16 * (1 << 20);

/// A compiled pattern ready for matching.
///
/// Cloning is a reference-count increment, not a recompile.
#[derive(Clone)]
pub struct Pattern {
    src: String,
    regex: Arc<Regex>,
}

impl std::fmt::Debug for Pattern {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pattern").field("src", &self.src).finish()
    }
}

/// One non-empty named capture, in byte offsets of the matched text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamedCapture<'p> {
    pub name: &'p str,
    pub start: usize,
    pub end: usize,
}

impl Pattern {
    /// Compile a highlight pattern.  Matching ignores case, and the pattern
    /// must contain at least one named group (`(?P<name>…)`), otherwise it
    /// could never produce a styled span.
    pub fn highlight(src: &str) -> Result<Self, PatternError> {
        let regex = RegexBuilder::new(src)
            .case_insensitive(true)
            .size_limit(SIZE_LIMIT)
            .build()?;
        if !regex.capture_names().any(|n| n.is_some()) {
            return Err(PatternError::NoNamedGroups(src.to_owned()));
        }
        Ok(Self {
            src: src.to_owned(),
            regex: Arc::new(regex),
        })
    }

    /// Compile a new-event matcher.  Text matching it starts a new event;
    /// anything else is a continuation of the previous one.
    pub fn new_event_matcher(src: &str) -> Result<Self, PatternError> {
        let regex = RegexBuilder::new(src).size_limit(SIZE_LIMIT).build()?;
        Ok(Self {
            src: src.to_owned(),
            regex: Arc::new(regex),
        })
    }

    /// The original source string.
    pub fn src(&self) -> &str {
        &self.src
    }

    pub fn is_match(&self, text: &str) -> bool {
        self.regex.is_match(text)
    }

    /// Every non-empty named capture of every non-overlapping match, in match
    /// order and, within one match, in group order.
    pub fn named_captures(&self, text: &str) -> Vec<NamedCapture<'_>> {
        let names: Vec<Option<&str>> = self.regex.capture_names().collect();
        let mut out = Vec::new();
        for caps in self.regex.captures_iter(text) {
            for (idx, name) in names.iter().enumerate() {
                let Some(name) = name else { continue };
                if let Some(m) = caps.get(idx) {
                    if !m.is_empty() {
                        out.push(NamedCapture {
                            name,
                            start: m.start(),
                            end: m.end(),
                        });
                    }
                }
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_regex_is_rejected() {
        let err = Pattern::highlight("(?P<open>abc").unwrap_err();
        assert!(matches!(err, PatternError::InvalidRegex(_)));
    }

    #[test]
    fn highlight_needs_named_groups() {
        let err = Pattern::highlight(r"\d+").unwrap_err();
        assert!(matches!(err, PatternError::NoNamedGroups(_)));
    }

    #[test]
    fn highlight_ignores_case() {
        let p = Pattern::highlight(r"(?P<level>error)").unwrap();
        assert!(p.is_match("ERROR: disk full"));
    }

    #[test]
    fn new_event_matcher_is_case_sensitive() {
        let p = Pattern::new_event_matcher("^Caused").unwrap();
        assert!(p.is_match("Caused by: x"));
        assert!(!p.is_match("caused by: x"));
    }

    #[test]
    fn captures_cover_all_matches() {
        let p = Pattern::highlight(r"(?P<num>\d+)").unwrap();
        let caps = p.named_captures("a1 b22 c333");
        let spans: Vec<_> = caps.iter().map(|c| (c.start, c.end)).collect();
        assert_eq!(spans, vec![(1, 2), (4, 6), (8, 11)]);
    }

    #[test]
    fn empty_and_unnamed_groups_are_skipped() {
        let p = Pattern::highlight(r"(\w+)=(?P<val>\w*)").unwrap();
        let caps = p.named_captures("a= b=2");
        assert_eq!(caps.len(), 1);
        assert_eq!(caps[0].name, "val");
        assert_eq!((caps[0].start, caps[0].end), (5, 6));
    }

    #[test]
    fn groups_within_a_match_keep_group_order() {
        let p = Pattern::highlight(r"(?P<k>\w+)=(?P<v>\w+)").unwrap();
        let names: Vec<_> = p.named_captures("x=1 y=2").iter().map(|c| c.name).collect();
        assert_eq!(names, vec!["k", "v", "k", "v"]);
    }

    #[test]
    fn clone_shares_compiled_regex() {
        let p = Pattern::highlight(r"(?P<w>\w+)").unwrap();
        let q = p.clone();
        assert!(Arc::ptr_eq(&p.regex, &q.regex));
        assert_eq!(q.src(), r"(?P<w>\w+)");
    }
}
