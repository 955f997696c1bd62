//! Per-filter admission rules, compiled once at engine construction.

use crate::config::FilterRule;
use crate::event::LogEvent;
use crate::matcher::{self, MatchMode, Matcher};

/// A filter rule with its option lists compiled to matchers.
#[derive(Debug)]
pub struct CompiledRule {
    pub name: String,
    pub active: bool,
    severity_debug: bool,
    severity_info: bool,
    severity_warn: bool,
    severity_error: bool,
    whitelist_and: Vec<Matcher>,
    whitelist_or: Vec<Matcher>,
    blacklist: Vec<Matcher>,
    pub clean: Vec<Matcher>,
    pub merge: bool,
    pub max_length: Option<usize>,
}

impl CompiledRule {
    pub fn compile(rule: &FilterRule) -> Self {
        Self {
            name: rule.name.clone(),
            active: rule.active,
            severity_debug: rule.debug,
            severity_info: rule.info,
            severity_warn: rule.warn,
            severity_error: rule.error,
            whitelist_and: matcher::compile_list(
                &rule.name,
                "Whitelist AND",
                &rule.whitelist_and,
                false,
            ),
            whitelist_or: matcher::compile_list(
                &rule.name,
                "Whitelist OR",
                &rule.whitelist_or,
                false,
            ),
            blacklist: matcher::compile_list(&rule.name, "Blacklist", &rule.blacklist, false),
            clean: matcher::compile_list(&rule.name, "Clean", &rule.clean, true),
            merge: rule.merge,
            max_length: rule.max_length,
        }
    }

    fn severity_enabled(&self, severity: &str) -> bool {
        match severity {
            "debug" => self.severity_debug,
            "info" => self.severity_info,
            "warn" => self.severity_warn,
            "error" => self.severity_error,
            _ => false,
        }
    }

    /// Decide whether a normalized event passes this filter.
    ///
    /// Check order: active flag, severity gate, whitelist-AND,
    /// whitelist-OR, blacklist. The first failing check rejects. A
    /// whitelist that is empty or a lone `*` admits everything, so the
    /// evaluator only runs for real lists.
    pub fn admit(&self, event: &LogEvent) -> bool {
        if !self.active {
            return false;
        }

        if !self.severity_enabled(&event.severity) {
            return false;
        }

        if !self.whitelist_and.is_empty()
            && !is_lone_wildcard(&self.whitelist_and)
            && !matcher::evaluate(&event.message, &self.whitelist_and, MatchMode::All)
        {
            return false;
        }

        if !self.whitelist_or.is_empty()
            && !is_lone_wildcard(&self.whitelist_or)
            && !matcher::evaluate(&event.message, &self.whitelist_or, MatchMode::Any)
        {
            return false;
        }

        if !self.blacklist.is_empty()
            && matcher::evaluate(&event.message, &self.blacklist, MatchMode::Any)
        {
            return false;
        }

        true
    }
}

fn is_lone_wildcard(matchers: &[Matcher]) -> bool {
    matchers.len() == 1 && matchers[0].is_wildcard()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_rule() -> FilterRule {
        FilterRule {
            name: "Test".to_string(),
            ..FilterRule::default()
        }
    }

    fn event(message: &str, severity: &str) -> LogEvent {
        LogEvent {
            from: "web.0".to_string(),
            message: message.to_string(),
            severity: severity.to_string(),
            ts: 0,
        }
    }

    #[test]
    fn test_inactive_rule_rejects() {
        let mut rule = base_rule();
        rule.active = false;
        assert!(!CompiledRule::compile(&rule).admit(&event("x", "error")));
    }

    #[test]
    fn test_severity_gate() {
        let mut rule = base_rule();
        rule.debug = false;
        rule.info = false;
        rule.warn = false;
        let compiled = CompiledRule::compile(&rule);
        assert!(compiled.admit(&event("x", "error")));
        assert!(!compiled.admit(&event("x", "warn")));
        assert!(!compiled.admit(&event("x", "unknown")));
    }

    #[test]
    fn test_empty_and_wildcard_whitelists_admit() {
        let compiled = CompiledRule::compile(&base_rule());
        assert!(compiled.admit(&event("anything at all", "info")));

        let mut rule = base_rule();
        rule.whitelist_and = "*".to_string();
        rule.whitelist_or = "*".to_string();
        let compiled = CompiledRule::compile(&rule);
        assert!(compiled.admit(&event("anything at all", "info")));
    }

    #[test]
    fn test_whitelist_and_requires_all() {
        let mut rule = base_rule();
        rule.whitelist_and = "disk, full".to_string();
        let compiled = CompiledRule::compile(&rule);
        assert!(compiled.admit(&event("disk is full", "warn")));
        assert!(!compiled.admit(&event("disk is fine", "warn")));
    }

    #[test]
    fn test_whitelist_or_requires_one() {
        let mut rule = base_rule();
        rule.whitelist_or = "disk, memory".to_string();
        let compiled = CompiledRule::compile(&rule);
        assert!(compiled.admit(&event("low memory", "warn")));
        assert!(!compiled.admit(&event("cpu idle", "warn")));
    }

    #[test]
    fn test_blacklist_rejects_on_any_hit() {
        let mut rule = base_rule();
        rule.blacklist = "/noisy/i".to_string();
        let compiled = CompiledRule::compile(&rule);
        assert!(!compiled.admit(&event("some Noisy line", "error")));
        assert!(compiled.admit(&event("quiet line", "error")));
    }
}
