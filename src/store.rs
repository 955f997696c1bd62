//! Filter Store — one bounded, newest-first buffer per filter name.

use crate::entry::StoredEntry;
use std::collections::{HashMap, VecDeque};

/// Owns every filter's log history. The capacity bound is global and holds
/// at all times: an insert trims the tail in the same step.
#[derive(Debug)]
pub struct FilterStore {
    buffers: HashMap<String, VecDeque<StoredEntry>>,
    max_logs: usize,
}

impl FilterStore {
    pub fn new(filter_names: impl IntoIterator<Item = String>, max_logs: usize) -> Self {
        let buffers = filter_names
            .into_iter()
            .map(|name| (name, VecDeque::new()))
            .collect();
        Self { buffers, max_logs }
    }

    pub fn insert(&mut self, filter_name: &str, entry: StoredEntry) {
        if let Some(buffer) = self.buffers.get_mut(filter_name) {
            buffer.push_front(entry);
            buffer.truncate(self.max_logs);
        }
    }

    /// Replace a filter's buffer wholesale (startup restore). The result
    /// is trimmed so the capacity invariant survives a shrunk limit.
    pub fn replace(&mut self, filter_name: &str, entries: VecDeque<StoredEntry>) {
        if let Some(buffer) = self.buffers.get_mut(filter_name) {
            *buffer = entries;
            buffer.truncate(self.max_logs);
        }
    }

    pub fn clear(&mut self, filter_name: &str) {
        if let Some(buffer) = self.buffers.get_mut(filter_name) {
            buffer.clear();
        }
    }

    pub fn len(&self, filter_name: &str) -> usize {
        self.buffers.get(filter_name).map_or(0, VecDeque::len)
    }

    pub fn is_empty(&self, filter_name: &str) -> bool {
        self.len(filter_name) == 0
    }

    /// Timestamp of the newest entry, 0 when the buffer is empty.
    pub fn newest_ts(&self, filter_name: &str) -> i64 {
        self.buffers
            .get(filter_name)
            .and_then(VecDeque::front)
            .map_or(0, StoredEntry::ts)
    }

    pub fn entries(&self, filter_name: &str) -> Option<&VecDeque<StoredEntry>> {
        self.buffers.get(filter_name)
    }

    pub fn entries_mut(&mut self, filter_name: &str) -> Option<&mut VecDeque<StoredEntry>> {
        self.buffers.get_mut(filter_name)
    }

    /// Copy of the buffer in the requested direction. The internal
    /// newest-first order is never touched by a read.
    pub fn snapshot_ordered(&self, filter_name: &str, descending: bool) -> Vec<StoredEntry> {
        let Some(buffer) = self.buffers.get(filter_name) else {
            return Vec::new();
        };
        let mut snapshot: Vec<StoredEntry> = buffer.iter().cloned().collect();
        if !descending {
            snapshot.reverse();
        }
        snapshot
    }
}
