//! Timestamp formatting with calendar-relative Today/Yesterday labels.

use chrono::{DateTime, Datelike, Local, TimeZone, Timelike};
use regex::Regex;
use std::sync::LazyLock;

static HASH_SEGMENT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"#(.*)#").expect("valid hash segment regex"));

/// Render a millisecond timestamp through a date template.
///
/// Tokens `YYYY`, `YY`, `MM`, `DD`, `hh`, `mm`, `ss`, `ms` are each
/// substituted once (first occurrence, `YYYY` before `YY`) with the
/// zero-padded local-time field. A `#...#` segment becomes `txt_today` or
/// `txt_yesterday` when the timestamp falls on the current or previous
/// local calendar day relative to `now`; otherwise only the `#` delimiters
/// are dropped.
pub fn format_timestamp(
    ts: i64,
    template: &str,
    txt_today: &str,
    txt_yesterday: &str,
    now: DateTime<Local>,
) -> String {
    let when = match Local.timestamp_millis_opt(ts).single() {
        Some(when) => when,
        None => return template.to_string(),
    };

    let mut result = template.to_string();

    if let Some(caps) = HASH_SEGMENT_RE.captures(&result) {
        let label = day_label(when, now, txt_today, txt_yesterday);
        if let Some(label) = label {
            let segment = format!("#{}#", &caps[1]);
            result = result.replacen(&segment, label, 1);
        } else {
            result = result.replace('#', "");
        }
    }

    let year = when.year();
    result = result.replacen("YYYY", &format!("{year:04}"), 1);
    result = result.replacen("YY", &format!("{:02}", year.rem_euclid(100)), 1);
    result = result.replacen("MM", &format!("{:02}", when.month()), 1);
    result = result.replacen("DD", &format!("{:02}", when.day()), 1);
    result = result.replacen("hh", &format!("{:02}", when.hour()), 1);
    result = result.replacen("mm", &format!("{:02}", when.minute()), 1);
    result = result.replacen("ss", &format!("{:02}", when.second()), 1);
    result = result.replacen("ms", &format!("{:03}", when.timestamp_subsec_millis()), 1);

    result
}

fn day_label<'a>(
    when: DateTime<Local>,
    now: DateTime<Local>,
    txt_today: &'a str,
    txt_yesterday: &'a str,
) -> Option<&'a str> {
    let date = when.date_naive();
    let today = now.date_naive();
    if date == today {
        Some(txt_today)
    } else if Some(date) == today.pred_opt() {
        Some(txt_yesterday)
    } else {
        None
    }
}
