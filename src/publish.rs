//! Snapshot Publisher — serializes a filter's store and fans the result
//! out to the filter's own output keys and any bound table slots.

use crate::kv::{StateStore, StateValue};
use crate::store::FilterStore;
use tracing::warn;

pub struct SnapshotOptions {
    /// Also write the filter's own `filters.<name>.*` keys.
    pub update_filter_output: bool,
    /// Candidate table slots; only those currently bound to the filter
    /// are written.
    pub table_indices: Vec<usize>,
}

pub fn filter_key(filter_name: &str, leaf: &str) -> String {
    format!("filters.{filter_name}.{leaf}")
}

pub fn table_key(index: usize, leaf: &str) -> String {
    format!("visualization.table{index}.{leaf}")
}

/// Publish one filter's snapshot.
///
/// `mostRecentLogTime` is taken from the newest stored entry before any
/// reordering (0 when empty). An empty store still publishes the empty
/// triple to the filter output when requested; table slots receive the
/// triple whenever they are listed and bound to this filter.
pub fn publish(
    kv: &mut dyn StateStore,
    store: &FilterStore,
    table_bindings: &[String],
    filter_name: &str,
    sort_descending: bool,
    options: &SnapshotOptions,
) {
    let most_recent_ts = store.newest_ts(filter_name);
    let snapshot = store.snapshot_ordered(filter_name, sort_descending);
    let count = snapshot.len() as i64;
    let json = match serde_json::to_string(&snapshot) {
        Ok(json) => json,
        Err(err) => {
            warn!("Filter '{filter_name}': snapshot serialization failed: {err}");
            return;
        }
    };

    if options.update_filter_output {
        kv.set(
            &filter_key(filter_name, "json"),
            StateValue::Text(json.clone()),
        );
        kv.set(&filter_key(filter_name, "jsonCount"), StateValue::Number(count));
        kv.set(
            &filter_key(filter_name, "mostRecentLogTime"),
            StateValue::Number(most_recent_ts),
        );
    }

    for &index in &options.table_indices {
        let bound = table_bindings.get(index).map(String::as_str);
        if bound != Some(filter_name) {
            continue;
        }
        kv.set(&table_key(index, "json"), StateValue::Text(json.clone()));
        kv.set(&table_key(index, "jsonCount"), StateValue::Number(count));
        kv.set(
            &table_key(index, "mostRecentLogTime"),
            StateValue::Number(most_recent_ts),
        );
    }
}
