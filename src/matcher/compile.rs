use super::Matcher;
use regex::{Regex, RegexBuilder};
use std::sync::LazyLock;
use tracing::warn;

static REGEX_TOKEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^/(.*)/([gim]*)$").expect("valid regex-token pattern"));

/// Compile a raw comma-separated option string into a matcher list.
///
/// `filter_name` and `option_title` only feed the warning emitted when a
/// regex token fails to compile; the bad token is dropped and the rest of
/// the list survives. `add_global` marks literal tokens for replace-all
/// stripping and is requested by clean lists.
pub fn compile_list(
    filter_name: &str,
    option_title: &str,
    input: &str,
    add_global: bool,
) -> Vec<Matcher> {
    let mut result = Vec::new();
    if crate::config::is_like_empty(input) {
        return result;
    }

    for token in split_outside_braces(input) {
        let token = token.trim();
        if token.is_empty() {
            continue;
        }
        if let Some(matcher) = compile_single(filter_name, option_title, token, add_global) {
            result.push(matcher);
        }
    }

    result
}

/// Compile one token: a `/pattern/flags` regex or a literal. Used directly
/// for the global blacklist, whose entries are one matcher each and never
/// comma-split.
pub fn compile_single(
    filter_name: &str,
    option_title: &str,
    token: &str,
    add_global: bool,
) -> Option<Matcher> {
    if let Some(caps) = REGEX_TOKEN.captures(token) {
        let pattern = &caps[1];
        let flags = &caps[2];
        match RegexBuilder::new(pattern)
            .case_insensitive(flags.contains('i'))
            .multi_line(flags.contains('m'))
            .build()
        {
            Ok(compiled) => Some(Matcher::Regex {
                pattern: compiled,
                global: flags.contains('g'),
            }),
            Err(err) => {
                warn!(
                    "Filter '{filter_name}', option '{option_title}': regex error: {err}; \
                     this list entry will be ignored"
                );
                None
            }
        }
    } else {
        Some(Matcher::Literal {
            text: token.to_string(),
            global: add_global,
        })
    }
}

/// Split on commas that are not enclosed in `{...}`, so embedded JSON
/// snippets stay whole.
fn split_outside_braces(input: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut start = 0usize;

    for (i, c) in input.char_indices() {
        match c {
            '{' => depth += 1,
            '}' => depth = depth.saturating_sub(1),
            ',' if depth == 0 => {
                parts.push(&input[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    parts.push(&input[start..]);

    parts
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_keeps_braced_commas_together() {
        assert_eq!(
            split_outside_braces("a,{x,y},b"),
            vec!["a", "{x,y}", "b"]
        );
    }

    #[test]
    fn test_compile_mixed_list() {
        let matchers = compile_list("t", "Blacklist", "plain, /^\\d+$/ ,  ", false);
        assert_eq!(matchers.len(), 2);
        assert!(matches!(&matchers[0], Matcher::Literal { text, .. } if text == "plain"));
        assert!(matches!(&matchers[1], Matcher::Regex { .. }));
    }

    #[test]
    fn test_invalid_regex_is_dropped_not_fatal() {
        let matchers = compile_list("t", "Whitelist OR", "/[z-a]/, keep", false);
        assert_eq!(matchers.len(), 1);
        assert!(matches!(&matchers[0], Matcher::Literal { text, .. } if text == "keep"));
    }

    #[test]
    fn test_empty_like_input_yields_empty_list() {
        assert!(compile_list("t", "Clean", "", false).is_empty());
        assert!(compile_list("t", "Clean", " [] ", false).is_empty());
    }

    #[test]
    fn test_clean_list_literals_are_global() {
        let matchers = compile_list("t", "Clean", "na", true);
        assert!(matches!(
            &matchers[0],
            Matcher::Literal { global: true, .. }
        ));
    }
}
