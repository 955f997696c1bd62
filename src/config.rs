use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::sync::LazyLock;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to parse config file '{path}': {source}")]
    Parse {
        path: String,
        #[source]
        source: toml::de::Error,
    },
}

/// Engine configuration.
///
/// The host is responsible for validation and clamping before the engine
/// starts (interval >= 2 s, maxLogs 1..=500, forbidden characters stripped
/// from filter names); the engine assumes every value here is already valid
/// and treats the whole structure as immutable for the process lifetime.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Source name the engine itself logs under. Events carrying this
    /// source are dropped to prevent feedback loops.
    pub identity: String,
    /// Upper bound on stored entries, applied to every filter.
    pub max_logs: usize,
    /// Snapshot refresh interval in seconds.
    pub update_interval_secs: u64,
    /// Number of visualization table slots (0 disables tables).
    pub vis_tables: usize,
    /// Date template. `YYYY/YY/MM/DD/hh/mm/ss/ms` tokens are substituted;
    /// a `#...#` segment is replaced by `txt_today`/`txt_yesterday` when
    /// the timestamp falls on the current/previous local day.
    pub date_format: String,
    pub txt_today: String,
    pub txt_yesterday: String,
    /// Merge annotation template, containing one `#` placeholder for the
    /// occurrence counter.
    pub txt_merge: String,
    /// Comma-separated column order for the published JSON objects. Each
    /// entry is one of `date`, `severity`, `from`, `message`; `ts` is
    /// always appended as the final key.
    pub json_columns: String,
    /// Newest-first snapshot output when true, oldest-first when false.
    pub sort_descending: bool,
    pub remove_pid: bool,
    pub remove_compact: bool,
    /// Strip a `script.js.<Name>: ` prefix from script log messages.
    pub remove_script_js: bool,
    /// Reduce script log messages to the text after the last dot instead.
    pub remove_only_script_js: bool,
    pub css: CssFlags,
    pub global_blacklist: Vec<BlacklistEntry>,
    pub filters: Vec<FilterRule>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            identity: "log-sieve.0".to_string(),
            max_logs: 100,
            update_interval_secs: 20,
            vis_tables: 0,
            date_format: "#YYYY-MM-DD# hh:mm:ss".to_string(),
            txt_today: "Today".to_string(),
            txt_yesterday: "Yesterday".to_string(),
            txt_merge: "[# Entries] ".to_string(),
            json_columns: "date,severity,from,message".to_string(),
            sort_descending: true,
            remove_pid: false,
            remove_compact: false,
            remove_script_js: false,
            remove_only_script_js: false,
            css: CssFlags::default(),
            global_blacklist: Vec::new(),
            filters: Vec::new(),
        }
    }
}

impl EngineConfig {
    /// Column keys in publication order, without the trailing `ts`.
    pub fn json_keys(&self) -> Vec<&str> {
        self.json_columns
            .split(',')
            .map(str::trim)
            .filter(|key| !key.is_empty())
            .collect()
    }

    pub fn update_interval_ms(&self) -> i64 {
        self.update_interval_secs as i64 * 1000
    }
}

/// Per-field switches for wrapping published values in styled spans.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CssFlags {
    pub date: bool,
    pub severity: bool,
    pub from: bool,
    pub message: bool,
}

/// One entry of the global blacklist, applied to every incoming message
/// before any per-filter rule runs.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BlacklistEntry {
    pub active: bool,
    /// Literal text or `/pattern/flags`.
    pub item: String,
}

impl Default for BlacklistEntry {
    fn default() -> Self {
        Self {
            active: true,
            item: String::new(),
        }
    }
}

/// One named admission filter.
///
/// The raw list fields mix literal tokens and `/pattern/flags` tokens,
/// comma-separated; commas inside `{...}` blocks do not split.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterRule {
    pub name: String,
    pub active: bool,
    pub debug: bool,
    pub info: bool,
    pub warn: bool,
    pub error: bool,
    /// Every matcher must hit (empty or a lone `*` admits everything).
    pub whitelist_and: String,
    /// At least one matcher must hit (empty or a lone `*` admits everything).
    pub whitelist_or: String,
    /// Any matcher hit rejects the event.
    pub blacklist: String,
    /// Matched text is stripped from admitted messages.
    pub clean: String,
    /// Collapse duplicate messages into one counted entry.
    pub merge: bool,
    /// Truncate admitted messages to this many characters (ignored unless > 3).
    pub max_length: Option<usize>,
}

impl Default for FilterRule {
    fn default() -> Self {
        Self {
            name: String::new(),
            active: true,
            debug: true,
            info: true,
            warn: true,
            error: true,
            whitelist_and: String::new(),
            whitelist_or: String::new(),
            blacklist: String::new(),
            clean: String::new(),
            merge: false,
            max_length: None,
        }
    }
}

pub fn load_config(path: Option<&Path>) -> Result<EngineConfig, ConfigError> {
    if let Some(path) = path {
        load_config_from_path(path)
    } else {
        Ok(default_config().clone())
    }
}

pub fn load_config_from_path(path: &Path) -> Result<EngineConfig, ConfigError> {
    let path_display = path.display().to_string();
    let raw = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path_display.clone(),
        source,
    })?;

    toml::from_str::<EngineConfig>(&raw).map_err(|source| ConfigError::Parse {
        path: path_display,
        source,
    })
}

pub fn default_config() -> &'static EngineConfig {
    static DEFAULT_CONFIG: LazyLock<EngineConfig> = LazyLock::new(EngineConfig::default);
    &DEFAULT_CONFIG
}

/// Emptiness test for config and state values.
///
/// A value is empty when nothing remains after stripping whitespace and the
/// characters `'`, `"`, `[`, `]`. So `"[]"`, `"''"` and whitespace-only
/// strings all count as empty, while a string of digits does not. Several
/// admission paths depend on exactly this boundary; do not reduce it to a
/// blank check.
pub fn is_like_empty(value: &str) -> bool {
    !value
        .chars()
        .any(|c| !c.is_whitespace() && !matches!(c, '\'' | '"' | '[' | ']'))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults_match_documented_values() {
        let config = EngineConfig::default();
        assert_eq!(config.max_logs, 100);
        assert_eq!(config.update_interval_secs, 20);
        assert_eq!(config.txt_today, "Today");
        assert_eq!(config.txt_yesterday, "Yesterday");
        assert_eq!(
            config.json_keys(),
            vec!["date", "severity", "from", "message"]
        );
        assert!(config.sort_descending);
    }

    #[test]
    fn test_load_config_from_toml() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"
max_logs = 3
update_interval_secs = 5
vis_tables = 2

[css]
severity = true

[[filters]]
name = "Errors"
debug = false
info = false
warn = false
whitelist_and = "*"
"#
        )
        .unwrap();

        let config = load_config_from_path(file.path()).unwrap();
        assert_eq!(config.max_logs, 3);
        assert_eq!(config.update_interval_secs, 5);
        assert_eq!(config.vis_tables, 2);
        assert!(config.css.severity);
        assert!(!config.css.date);
        assert_eq!(config.filters.len(), 1);
        let rule = &config.filters[0];
        assert_eq!(rule.name, "Errors");
        assert!(rule.active);
        assert!(rule.error);
        assert!(!rule.warn);
        assert_eq!(rule.whitelist_and, "*");
    }

    #[test]
    fn test_is_like_empty_boundaries() {
        assert!(is_like_empty(""));
        assert!(is_like_empty("   "));
        assert!(is_like_empty("[]"));
        assert!(is_like_empty("\"\""));
        assert!(is_like_empty("[' ']"));
        assert!(!is_like_empty("0"));
        assert!(!is_like_empty("[x]"));
    }
}
