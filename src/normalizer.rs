//! Normalizer — first stage of the ingestion pipeline.
//!
//! Cleans a raw event's message and blanks it as soon as any step
//! disqualifies the event. Callers drop events whose normalized message is
//! empty before any per-filter rule runs.

use crate::config::{EngineConfig, is_like_empty};
use crate::event::LogEvent;
use crate::matcher::{self, MatchMode, Matcher};
use regex::Regex;
use std::sync::LazyLock;

static MULTISPACE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("valid multispace regex"));
static HEAD_TAIL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\S+)\s(.*)").expect("valid head/tail regex"));
static PID_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\([0-9]{1,9}\)\s").expect("valid pid regex"));
static SCRIPT_PREFIX_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"script\.js\.[^:]*: ").expect("valid script prefix regex"));

pub struct Normalizer {
    identity: String,
    global_blacklist: Vec<Matcher>,
    remove_pid: bool,
    remove_compact: bool,
    remove_script_js: bool,
    remove_only_script_js: bool,
}

impl Normalizer {
    pub fn new(config: &EngineConfig) -> Self {
        // Each blacklist entry is exactly one matcher; items are never
        // comma-split, so literal commas stay part of the text.
        let global_blacklist = config
            .global_blacklist
            .iter()
            .filter(|entry| entry.active && !is_like_empty(&entry.item))
            .filter_map(|entry| {
                matcher::compile_single("<global>", "Global blacklist", entry.item.trim(), false)
            })
            .collect();

        Self {
            identity: config.identity.clone(),
            global_blacklist,
            remove_pid: config.remove_pid,
            remove_compact: config.remove_compact,
            remove_script_js: config.remove_script_js,
            remove_only_script_js: config.remove_only_script_js,
        }
    }

    /// Returns the event with a cleaned message. An empty message means the
    /// event failed verification and must be discarded.
    pub fn normalize(&self, mut event: LogEvent) -> LogEvent {
        let mut msg = if is_like_empty(&event.message) {
            String::new()
        } else {
            MULTISPACE_RE.replace_all(&event.message, " ").into_owned()
        };

        // Never process our own output, that would loop forever.
        if event.from == self.identity {
            msg.clear();
        }

        if !msg.is_empty() {
            // The evaluator treats an empty list as a match, so the
            // emptiness check must stay on the caller side.
            if !self.global_blacklist.is_empty()
                && matcher::evaluate(&msg, &self.global_blacklist, MatchMode::Any)
            {
                msg.clear();
            }

            if !event.severity_is_valid() {
                msg.clear();
            }

            if self.remove_pid {
                msg = remove_pid(&msg);
            }

            if self.remove_compact {
                msg = msg.replacen("(COMPACT) ", "", 1);
            }

            if msg.contains("script.js") && self.remove_script_js {
                msg = SCRIPT_PREFIX_RE.replace(&msg, "").into_owned();
            }

            if msg.contains("script.js") && self.remove_only_script_js {
                if let Some(pos) = msg.rfind('.') {
                    msg = msg[pos + 1..].to_string();
                }
            }

            if is_like_empty(&event.from) {
                msg.clear();
            }
        }

        event.message = msg;
        event
    }
}

/// Strip a process id inserted after the source token, turning
/// `web.0 (123) started` into `web.0 started`.
fn remove_pid(msg: &str) -> String {
    if let Some(caps) = HEAD_TAIL_RE.captures(msg) {
        let head = &caps[1];
        let tail = PID_RE.replace(&caps[2], "");
        format!("{head} {tail}")
    } else {
        msg.to_string()
    }
}
