//! Entry Builder — turns an admitted event into the stored entry shape.
//!
//! Building happens in two steps: a [`DraftEntry`] collects the cleaned
//! field values (still subject to merging), and [`project`] produces the
//! final [`StoredEntry`] with the configured column order and optional
//! markup.

use crate::config::EngineConfig;
use crate::event::LogEvent;
use crate::rules::CompiledRule;
use crate::timefmt::format_timestamp;
use chrono::{DateTime, Local};
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::sync::LazyLock;
use tracing::warn;

static OVERRIDE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r##"##(\{\s?".*"\s?\})##"##).expect("valid override regex"));

/// One published log entry: the configured column subset of the event plus
/// `date`, with `ts` always present as the final key.
///
/// The inner map preserves insertion order, so the persisted JSON schema
/// survives a serialize/deserialize round-trip bit-exactly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StoredEntry(pub Map<String, Value>);

impl StoredEntry {
    pub fn ts(&self) -> i64 {
        self.0.get("ts").and_then(Value::as_i64).unwrap_or(0)
    }

    pub fn message(&self) -> &str {
        self.0.get("message").and_then(Value::as_str).unwrap_or("")
    }

    pub fn set_date(&mut self, date: String) {
        if self.0.contains_key("date") {
            self.0.insert("date".to_string(), Value::String(date));
        }
    }
}

/// Field values of an admitted event before projection and markup.
#[derive(Debug, Clone, PartialEq)]
pub struct DraftEntry {
    pub date: String,
    pub severity: String,
    pub from: String,
    pub message: String,
    pub ts: i64,
}

/// Apply the per-filter transformations to an admitted, normalized event.
///
/// Order matters and is load-bearing: clean-list stripping, source-prefix
/// stripping, date computation, embedded override, max-length truncation.
pub fn build_draft(
    rule: &CompiledRule,
    event: &LogEvent,
    config: &EngineConfig,
    now: DateTime<Local>,
) -> DraftEntry {
    let mut draft = DraftEntry {
        date: String::new(),
        severity: event.severity.clone(),
        from: event.from.clone(),
        message: event.message.clone(),
        ts: event.ts,
    };

    for matcher in &rule.clean {
        draft.message = matcher.strip(&draft.message);
    }

    // 'web.0 adapter disabled' -> 'adapter disabled'. The original drops
    // the source plus one separator character, whatever it is.
    if !draft.from.is_empty() && draft.message.starts_with(&draft.from) {
        draft.message = draft
            .message
            .get(draft.from.len() + 1..)
            .unwrap_or("")
            .to_string();
    }

    draft.date = format_timestamp(
        draft.ts,
        &config.date_format,
        &config.txt_today,
        &config.txt_yesterday,
        now,
    );

    apply_override(&mut draft);

    if let Some(max_length) = rule.max_length {
        if max_length > 3 {
            draft.message = draft.message.chars().take(max_length).collect();
        }
    }

    draft
}

/// Per-message field override: a `##({...})##` token embedded in the
/// message replaces any of `date`, `severity`, `from`, `message`.
/// Malformed JSON is a data-quality issue, not a fault: log and move on
/// with the message unchanged.
fn apply_override(draft: &mut DraftEntry) {
    let Some(caps) = OVERRIDE_RE.captures(&draft.message) else {
        return;
    };
    let token = caps.get(0).expect("whole match").as_str().to_string();

    match serde_json::from_str::<Map<String, Value>>(&caps[1]) {
        Ok(replacer) => {
            let mut message_override = None;
            for (key, value) in &replacer {
                let text = match value {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                };
                match key.as_str() {
                    "date" => draft.date = text,
                    "severity" => draft.severity = text,
                    "from" => draft.from = text,
                    "message" => message_override = Some(text),
                    _ => {}
                }
            }
            draft.message = match message_override {
                Some(message) => message,
                None => draft.message.replacen(&token, "", 1),
            };
        }
        Err(err) => {
            warn!("Ignoring malformed field override token in log message: {err}");
        }
    }
}

/// Project a draft into the configured column order, append `ts` as the
/// final key, and wrap flagged fields in styled spans.
pub fn project(draft: &DraftEntry, config: &EngineConfig) -> StoredEntry {
    let severity_class = capitalize(&draft.severity);
    let mut map = Map::new();

    for key in config.json_keys() {
        let value = match key {
            "date" if config.css.date => css_span(&severity_class, "Date", &draft.date),
            "date" => draft.date.clone(),
            "severity" if config.css.severity => {
                css_span(&severity_class, "Severity", &draft.severity)
            }
            "severity" => draft.severity.clone(),
            "from" if config.css.from => css_span(&severity_class, "From", &draft.from),
            "from" => draft.from.clone(),
            "message" if config.css.message => {
                css_span(&severity_class, "Message", &draft.message)
            }
            "message" => draft.message.clone(),
            _ => continue,
        };
        map.insert(key.to_string(), Value::String(value));
    }
    map.insert("ts".to_string(), Value::Number(draft.ts.into()));

    StoredEntry(map)
}

pub fn css_span(severity_class: &str, field: &str, value: &str) -> String {
    format!("<span class='log{severity_class} log{field}'>{value}</span>")
}

pub fn capitalize(value: &str) -> String {
    let mut chars = value.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
