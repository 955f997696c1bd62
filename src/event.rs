use serde::{Deserialize, Serialize};

/// The four severities the engine accepts. Events carrying anything else
/// are discarded during normalization.
pub const SEVERITIES: [&str; 4] = ["debug", "info", "warn", "error"];

/// A raw log event as delivered by the event source.
///
/// `severity` stays a plain string on the wire: validation happens in the
/// normalizer, and an embedded override may later replace it with arbitrary
/// text for display purposes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEvent {
    /// Source instance the line came from, like `web.0`.
    #[serde(default)]
    pub from: String,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub severity: String,
    /// Milliseconds since the Unix epoch.
    #[serde(default)]
    pub ts: i64,
}

impl LogEvent {
    pub fn severity_is_valid(&self) -> bool {
        SEVERITIES.contains(&self.severity.as_str())
    }
}
