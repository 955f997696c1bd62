//! Engine — owns every piece of mutable state (filter buffers, table
//! bindings, the state store handle) and applies all mutations from a
//! single logical writer. The scheduler drives it; nothing here spawns
//! tasks or blocks.

use crate::config::{EngineConfig, is_like_empty};
use crate::entry::{self, StoredEntry};
use crate::event::LogEvent;
use crate::kv::{StateStore, StateValue};
use crate::merge::{self, MergePattern};
use crate::normalizer::Normalizer;
use crate::publish::{self, SnapshotOptions, filter_key, table_key};
use crate::rules::CompiledRule;
use crate::store::FilterStore;
use chrono::{DateTime, Local};
use tracing::{debug, warn};

const LAST_TIME_UPDATED: &str = "lastTimeUpdated";
/// Offset added to the refresh window so a log arriving right at the
/// interval boundary still counts as recent activity.
const REFRESH_GRACE_MS: i64 = 2000;

/// A control signal, decoded by the host from its own addressing scheme.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControlSignal {
    EmptyAll,
    EmptyFilter(String),
    EmptyTable(usize),
    ForceUpdate,
    SelectTable { index: usize, filter: String },
}

pub struct Engine {
    config: EngineConfig,
    normalizer: Normalizer,
    rules: Vec<CompiledRule>,
    merge_pattern: MergePattern,
    store: FilterStore,
    table_bindings: Vec<String>,
    kv: Box<dyn StateStore>,
}

impl Engine {
    pub fn new(config: EngineConfig, kv: Box<dyn StateStore>) -> Self {
        let normalizer = Normalizer::new(&config);
        let merge_pattern = MergePattern::new(&config.txt_merge);

        let mut rules: Vec<CompiledRule> = Vec::new();
        for rule in config.filters.iter().filter(|rule| rule.active) {
            if rule.name.is_empty() {
                warn!("Skipping an active filter with an empty name");
                continue;
            }
            if rules.iter().any(|compiled| compiled.name == rule.name) {
                warn!(
                    "Duplicate active filter name '{}'; keeping the first definition",
                    rule.name
                );
                continue;
            }
            rules.push(CompiledRule::compile(rule));
        }

        let store = FilterStore::new(
            rules.iter().map(|rule| rule.name.clone()),
            config.max_logs,
        );
        let table_bindings = vec![String::new(); config.vis_tables];

        Self {
            config,
            normalizer,
            rules,
            merge_pattern,
            store,
            table_bindings,
            kv,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn states(&self) -> &dyn StateStore {
        self.kv.as_ref()
    }

    pub fn active_filter_names(&self) -> Vec<String> {
        self.rules.iter().map(|rule| rule.name.clone()).collect()
    }

    pub fn store(&self) -> &FilterStore {
        &self.store
    }

    pub fn table_binding(&self, index: usize) -> Option<&str> {
        self.table_bindings.get(index).map(String::as_str)
    }

    fn all_table_indices(&self) -> Vec<usize> {
        (0..self.config.vis_tables).collect()
    }

    /// Load prior snapshots and table selections from the state store.
    ///
    /// Persisted arrays may be sorted either way; the direction is
    /// detected from the first and last timestamps and normalized to
    /// newest-first. A malformed blob only costs that one filter its
    /// history.
    pub fn restore(&mut self) {
        for name in self.active_filter_names() {
            let Some(value) = self.kv.get(&filter_key(&name, "json")) else {
                continue;
            };
            let Some(text) = value.as_text() else {
                continue;
            };
            if is_like_empty(text) {
                continue;
            }
            match serde_json::from_str::<Vec<StoredEntry>>(text) {
                Ok(mut entries) => {
                    if entries.len() >= 2 && entries[0].ts() < entries[entries.len() - 1].ts() {
                        entries.reverse();
                    }
                    self.store.replace(&name, entries.into());
                }
                Err(err) => {
                    warn!("Filter '{name}': ignoring malformed persisted snapshot: {err}");
                }
            }
        }

        for index in 0..self.table_bindings.len() {
            if let Some(value) = self.kv.get(&table_key(index, "selection")) {
                if let Some(text) = value.as_text() {
                    if !is_like_empty(text) {
                        self.table_bindings[index] = text.to_string();
                    }
                }
            }
        }
    }

    /// Run one event through normalization and every active filter.
    pub fn ingest(&mut self, event: LogEvent, now: DateTime<Local>) {
        let normalized = self.normalizer.normalize(event);
        if normalized.message.is_empty() {
            return;
        }

        for rule in &self.rules {
            if !rule.admit(&normalized) {
                continue;
            }

            let mut draft = entry::build_draft(rule, &normalized, &self.config, now);
            if rule.merge {
                if let Some(entries) = self.store.entries_mut(&rule.name) {
                    merge::merge_into(entries, &mut draft, &self.merge_pattern);
                }
            }
            let projected = entry::project(&draft, &self.config);
            self.store.insert(&rule.name, projected);
        }
    }

    fn publish_filter(&mut self, filter_name: &str, update_filter_output: bool, table_indices: Vec<usize>) {
        publish::publish(
            self.kv.as_mut(),
            &self.store,
            &self.table_bindings,
            filter_name,
            self.config.sort_descending,
            &SnapshotOptions {
                update_filter_output,
                table_indices,
            },
        );
    }

    /// Periodic snapshot refresh. Filters without any recent activity are
    /// skipped; everything else is republished to the filter output and
    /// all bound tables.
    pub fn refresh_pass(&mut self, now: DateTime<Local>) {
        let now_ms = now.timestamp_millis();
        let window_ms = self.config.update_interval_ms() + REFRESH_GRACE_MS;

        for name in self.active_filter_names() {
            if self.store.is_empty(&name) {
                debug!("Filter '{name}': no logs so far");
                continue;
            }
            let newest_ts = self.store.newest_ts(&name);
            if newest_ts + window_ms < now_ms {
                debug!("Filter '{name}': no recent log activity, skipping refresh");
                continue;
            }
            let tables = self.all_table_indices();
            self.publish_filter(&name, true, tables);
        }

        self.kv.set(LAST_TIME_UPDATED, StateValue::Number(now_ms));
    }

    /// Recompute every stored entry's date label and republish. Runs just
    /// after midnight, when "Today" entries become "Yesterday".
    pub fn relabel_pass(&mut self, now: DateTime<Local>) {
        for name in self.active_filter_names() {
            let mut counter = 0usize;
            if let Some(entries) = self.store.entries_mut(&name) {
                for stored in entries.iter_mut() {
                    let mut date = crate::timefmt::format_timestamp(
                        stored.ts(),
                        &self.config.date_format,
                        &self.config.txt_today,
                        &self.config.txt_yesterday,
                        now,
                    );
                    if self.config.css.date {
                        date = entry::css_span("Info", "Date", &date);
                    }
                    stored.set_date(date);
                    counter += 1;
                }
            }

            let tables = self.all_table_indices();
            self.publish_filter(&name, true, tables);
            debug!("Filter '{name}': relabeled {counter} stored dates");
        }
    }

    pub fn handle_signal(&mut self, signal: ControlSignal, now: DateTime<Local>) {
        match signal {
            ControlSignal::EmptyAll => {
                for name in self.active_filter_names() {
                    self.empty_filter(&name);
                }
            }
            ControlSignal::EmptyFilter(name) => {
                if self.is_active_filter(&name) {
                    self.empty_filter(&name);
                } else {
                    debug!("Ignoring empty signal for unknown filter '{name}'");
                }
            }
            ControlSignal::ForceUpdate => {
                for name in self.active_filter_names() {
                    let tables = self.all_table_indices();
                    self.publish_filter(&name, true, tables);
                }
                self.kv
                    .set(LAST_TIME_UPDATED, StateValue::Number(now.timestamp_millis()));
            }
            ControlSignal::SelectTable { index, filter } => {
                if !self.is_active_filter(&filter) {
                    debug!("Ignoring selection of unknown filter '{filter}'");
                    return;
                }
                let Some(current) = self.table_bindings.get(index) else {
                    return;
                };
                if current != &filter {
                    self.table_bindings[index] = filter.clone();
                    self.publish_filter(&filter, false, vec![index]);
                }
            }
            ControlSignal::EmptyTable(index) => {
                let Some(bound) = self.table_bindings.get(index) else {
                    return;
                };
                let bound = bound.clone();
                if !is_like_empty(&bound) && self.is_active_filter(&bound) {
                    self.empty_filter(&bound);
                }
            }
        }
    }

    fn is_active_filter(&self, name: &str) -> bool {
        self.rules.iter().any(|rule| rule.name == name)
    }

    /// Clear one filter's history and push the empty snapshot to its
    /// output and any bound tables.
    fn empty_filter(&mut self, name: &str) {
        self.store.clear(name);
        let tables = self.all_table_indices();
        self.publish_filter(name, true, tables);
    }
}
