//! StateStore — the persistent key-value collaborator.
//!
//! The engine reads prior snapshots from it at startup and writes
//! `json`/`jsonCount`/`mostRecentLogTime` values per filter and per bound
//! table. The trait is deliberately small so hosts can back it with
//! whatever they have; the file-backed implementation here is what the
//! stdin host uses.

use serde_json::Value;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::warn;

#[derive(Debug, Error)]
pub enum StateStoreError {
    #[error("Failed to read state file '{path}': {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("State file '{path}' is not a JSON object: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

/// A single state value. Snapshot blobs are text, counts and timestamps
/// are numbers.
#[derive(Debug, Clone, PartialEq)]
pub enum StateValue {
    Text(String),
    Number(i64),
}

impl StateValue {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            StateValue::Text(text) => Some(text),
            StateValue::Number(_) => None,
        }
    }

    pub fn as_number(&self) -> Option<i64> {
        match self {
            StateValue::Number(number) => Some(*number),
            StateValue::Text(_) => None,
        }
    }
}

pub trait StateStore: Send {
    fn get(&self, key: &str) -> Option<StateValue>;
    fn set(&mut self, key: &str, value: StateValue);
}

/// In-memory store, used by tests and as a null host.
#[derive(Debug, Default)]
pub struct MemoryStateStore {
    values: BTreeMap<String, StateValue>,
}

impl MemoryStateStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl StateStore for MemoryStateStore {
    fn get(&self, key: &str) -> Option<StateValue> {
        self.values.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: StateValue) {
        self.values.insert(key.to_string(), value);
    }
}

/// Stores all state values as one flat JSON object on disk, rewritten on
/// every set. Good enough for the snapshot sizes this engine produces.
#[derive(Debug)]
pub struct FileStateStore {
    path: PathBuf,
    values: BTreeMap<String, StateValue>,
}

impl FileStateStore {
    /// Open the store, loading any existing file. A missing file is a
    /// fresh store, not an error.
    pub fn open(path: &Path) -> Result<Self, StateStoreError> {
        let mut values = BTreeMap::new();

        if path.exists() {
            let raw = fs::read_to_string(path).map_err(|source| StateStoreError::Read {
                path: path.display().to_string(),
                source,
            })?;
            let parsed: BTreeMap<String, Value> =
                serde_json::from_str(&raw).map_err(|source| StateStoreError::Parse {
                    path: path.display().to_string(),
                    source,
                })?;
            for (key, value) in parsed {
                match value {
                    Value::String(text) => {
                        values.insert(key, StateValue::Text(text));
                    }
                    Value::Number(number) => {
                        if let Some(number) = number.as_i64() {
                            values.insert(key, StateValue::Number(number));
                        }
                    }
                    _ => {}
                }
            }
        }

        Ok(Self {
            path: path.to_path_buf(),
            values,
        })
    }

    fn persist(&self) {
        let mut object = serde_json::Map::new();
        for (key, value) in &self.values {
            let json_value = match value {
                StateValue::Text(text) => Value::String(text.clone()),
                StateValue::Number(number) => Value::Number((*number).into()),
            };
            object.insert(key.clone(), json_value);
        }
        let body = serde_json::to_string_pretty(&Value::Object(object))
            .expect("state map serializes");
        if let Err(err) = fs::write(&self.path, body) {
            warn!("Failed to write state file '{}': {err}", self.path.display());
        }
    }
}

impl StateStore for FileStateStore {
    fn get(&self, key: &str) -> Option<StateValue> {
        self.values.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: StateValue) {
        self.values.insert(key.to_string(), value);
        self.persist();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_store_round_trip() {
        let mut store = MemoryStateStore::new();
        store.set("a.json", StateValue::Text("[]".to_string()));
        store.set("a.jsonCount", StateValue::Number(0));
        assert_eq!(store.get("a.json").unwrap().as_text(), Some("[]"));
        assert_eq!(store.get("a.jsonCount").unwrap().as_number(), Some(0));
        assert!(store.get("missing").is_none());
    }

    #[test]
    fn test_file_store_persists_and_reloads() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("states.json");

        let mut store = FileStateStore::open(&path).unwrap();
        store.set("filters.Errors.json", StateValue::Text("[{\"ts\":1}]".to_string()));
        store.set("filters.Errors.jsonCount", StateValue::Number(1));

        let reloaded = FileStateStore::open(&path).unwrap();
        assert_eq!(
            reloaded.get("filters.Errors.json").unwrap().as_text(),
            Some("[{\"ts\":1}]")
        );
        assert_eq!(
            reloaded.get("filters.Errors.jsonCount").unwrap().as_number(),
            Some(1)
        );
    }
}
