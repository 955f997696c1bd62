//! Merge Engine — collapses repeated messages into one counted entry.

use crate::entry::{DraftEntry, StoredEntry};
use regex::Regex;
use std::collections::VecDeque;
use tracing::warn;

/// The merge annotation template, split around its `#` placeholder and
/// compiled into a counter-extraction pattern once per engine.
#[derive(Debug)]
pub struct MergePattern {
    template: String,
    counter_re: Option<Regex>,
}

impl MergePattern {
    pub fn new(template: &str) -> Self {
        let (prefix, suffix) = match template.split_once('#') {
            Some(parts) => parts,
            None => (template, ""),
        };
        let pattern = format!(
            "{}(\\d+){}.*",
            regex::escape(prefix),
            regex::escape(suffix)
        );
        let counter_re = match Regex::new(&pattern) {
            Ok(re) => Some(re),
            Err(err) => {
                warn!("Merge template '{template}' produced an unusable pattern: {err}");
                None
            }
        };

        Self {
            template: template.to_string(),
            counter_re,
        }
    }

    /// Extract the occurrence counter from a stored message, if the
    /// message carries one.
    fn counter_of(&self, message: &str) -> Option<u64> {
        let caps = self.counter_re.as_ref()?.captures(message)?;
        caps[1].parse().ok()
    }

    fn annotation(&self, counter: u64) -> String {
        self.template.replacen('#', &counter.to_string(), 1)
    }
}

/// Try to merge `draft` into an existing entry of `entries` (newest-first).
///
/// The first stored entry whose message contains the draft message as a
/// substring is removed, and the draft message gains the counter
/// annotation: previous counter + 1, or 2 when the old entry carried none
/// (the old entry plus this new one). Returns true when a merge happened.
pub fn merge_into(
    entries: &mut VecDeque<StoredEntry>,
    draft: &mut DraftEntry,
    pattern: &MergePattern,
) -> bool {
    let found = entries
        .iter()
        .position(|entry| entry.message().contains(draft.message.as_str()));
    let Some(position) = found else {
        return false;
    };

    let counter = match pattern.counter_of(entries[position].message()) {
        Some(previous) => previous + 1,
        None => 2,
    };
    draft.message = format!("{}{}", pattern.annotation(counter), draft.message);
    entries.remove(position);

    true
}
