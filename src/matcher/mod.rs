//! Matcher compilation and list evaluation
//!
//! Filter options accept a comma-separated mix of literal text and
//! `/pattern/flags` tokens. Commas inside `{...}` blocks do not split, so
//! JSON snippets survive tokenization intact.
//!
//! # Syntax
//!
//! ```text
//! error, timeout            two literal matchers (substring containment)
//! /^web\.\d+/i              one regex matcher, case-insensitive
//! warn, /drop(ped)? \d+/    literals and regexes mix freely
//! ```
//!
//! Supported flags are `i` (case-insensitive), `m` (multi-line) and `g`.
//! The `g` flag only matters when a matcher is used for stripping: a global
//! matcher removes every occurrence, a non-global one removes the first.
//! Lists meant for stripping (clean lists) are compiled with an implicit
//! `g` on their literal tokens.
//!
//! A matcher that fails to compile is dropped with a warning naming the
//! filter and option it came from; the rest of the list stays usable.

mod compile;

pub use compile::{compile_list, compile_single};

use regex::Regex;

/// A single compiled matcher.
#[derive(Debug, Clone)]
pub enum Matcher {
    /// Matches via substring containment. `global` marks replace-all
    /// stripping behavior.
    Literal { text: String, global: bool },
    /// Matches via pattern test. `global` mirrors the `g` flag.
    Regex { pattern: Regex, global: bool },
}

/// How many matchers of a list must hit for the list to match.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchMode {
    All,
    Any,
}

impl Matcher {
    pub fn is_match(&self, text: &str) -> bool {
        match self {
            Matcher::Literal { text: needle, .. } => text.contains(needle.as_str()),
            Matcher::Regex { pattern, .. } => pattern.is_match(text),
        }
    }

    /// Remove matched text: every occurrence for global matchers, only the
    /// first otherwise.
    pub fn strip(&self, text: &str) -> String {
        match self {
            Matcher::Literal {
                text: needle,
                global,
            } => {
                if *global {
                    text.replace(needle.as_str(), "")
                } else {
                    text.replacen(needle.as_str(), "", 1)
                }
            }
            Matcher::Regex { pattern, global } => {
                if *global {
                    pattern.replace_all(text, "").into_owned()
                } else {
                    pattern.replace(text, "").into_owned()
                }
            }
        }
    }

    /// True for the single-token wildcard form: a literal `*`, or a regex
    /// whose source reduces to `*` once `/` and `\` are removed.
    pub fn is_wildcard(&self) -> bool {
        match self {
            Matcher::Literal { text, .. } => text == "*",
            Matcher::Regex { pattern, .. } => {
                let stripped: String = pattern
                    .as_str()
                    .chars()
                    .filter(|c| !matches!(c, '/' | '\\'))
                    .collect();
                stripped == "*"
            }
        }
    }
}

/// Evaluate `text` against a matcher list.
///
/// An empty list returns true regardless of mode. This permissiveness is
/// part of the caller-visible contract (an empty whitelist means "match
/// everything") and must not be tightened.
pub fn evaluate(text: &str, matchers: &[Matcher], mode: MatchMode) -> bool {
    if matchers.is_empty() {
        return true;
    }

    let mut considered = 0usize;
    let mut hits = 0usize;
    for matcher in matchers {
        considered += 1;
        if matcher.is_match(text) {
            hits += 1;
        }
    }

    match mode {
        MatchMode::All => hits == considered,
        MatchMode::Any => hits > 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn literal(text: &str) -> Matcher {
        Matcher::Literal {
            text: text.to_string(),
            global: false,
        }
    }

    #[test]
    fn test_empty_list_is_permissive_in_both_modes() {
        assert!(evaluate("anything", &[], MatchMode::All));
        assert!(evaluate("anything", &[], MatchMode::Any));
    }

    #[test]
    fn test_all_mode_requires_every_matcher() {
        let matchers = vec![literal("disk"), literal("full")];
        assert!(evaluate("disk is full", &matchers, MatchMode::All));
        assert!(!evaluate("disk is fine", &matchers, MatchMode::All));
    }

    #[test]
    fn test_any_mode_requires_one_matcher() {
        let matchers = vec![literal("disk"), literal("memory")];
        assert!(evaluate("low memory warning", &matchers, MatchMode::Any));
        assert!(!evaluate("cpu idle", &matchers, MatchMode::Any));
    }

    #[test]
    fn test_regex_matcher() {
        let matchers = compile_list("t", "Blacklist", "/^web\\.\\d+/i", false);
        assert_eq!(matchers.len(), 1);
        assert!(evaluate("Web.3 started", &matchers, MatchMode::Any));
        assert!(!evaluate("server web.3 started", &matchers, MatchMode::Any));
    }

    #[test]
    fn test_wildcard_detection() {
        let star = compile_list("t", "Whitelist AND", "*", false);
        assert_eq!(star.len(), 1);
        assert!(star[0].is_wildcard());

        let not_star = compile_list("t", "Whitelist AND", "*x", false);
        assert!(!not_star[0].is_wildcard());
    }

    #[test]
    fn test_strip_first_vs_all_occurrences() {
        let first = literal("na");
        assert_eq!(first.strip("banana"), "bana");

        let every = Matcher::Literal {
            text: "na".to_string(),
            global: true,
        };
        assert_eq!(every.strip("banana"), "ba");
    }
}
