//! Observation store - per-document history across passes
//!
//! Holds the last analysis snapshot of every document so the analyzer can
//! accumulate reading time between passes. The whole map lives in one JSON
//! file that is replaced atomically on flush.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::error::StoreError;
use crate::store::write_json_atomic;

/// Last known analysis of one document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObservationRecord {
    /// Epoch milliseconds
    #[serde(default)]
    pub last_opened: u64,
    /// Accumulated seconds
    #[serde(default)]
    pub reading_time: u64,
    #[serde(default)]
    pub completion_ratio: f64,
    #[serde(default)]
    pub has_annotations: bool,
    /// Epoch seconds of the pass that wrote this record
    #[serde(default)]
    pub last_checked: u64,
}

/// JSON-file backed `doc_id -> ObservationRecord` map
#[derive(Debug)]
pub struct ObservationStore {
    path: PathBuf,
    records: BTreeMap<String, ObservationRecord>,
    dirty: bool,
}

impl ObservationStore {
    /// Load the state file; a missing or unreadable file yields an empty store
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let records = match load_records(&path) {
            Ok(records) => records,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Failed to load reading state, starting empty");
                BTreeMap::new()
            }
        };

        debug!(path = %path.display(), count = records.len(), "Opened observation store");
        Self {
            path,
            records,
            dirty: false,
        }
    }

    pub fn get(&self, doc_id: &str) -> Option<&ObservationRecord> {
        self.records.get(doc_id)
    }

    pub fn put(&mut self, doc_id: impl Into<String>, record: ObservationRecord) {
        self.records.insert(doc_id.into(), record);
        self.dirty = true;
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Drop records of documents that are no longer in the store
    pub fn prune(&mut self, live_ids: &HashSet<&str>) -> usize {
        let before = self.records.len();
        self.records.retain(|id, _| live_ids.contains(id.as_str()));
        let removed = before - self.records.len();
        if removed > 0 {
            self.dirty = true;
        }
        removed
    }

    /// Persist pending writes; returns whether anything was written
    pub fn flush(&mut self) -> Result<bool, StoreError> {
        if !self.dirty {
            return Ok(false);
        }

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| StoreError::io(parent, e))?;
        }

        let value = serde_json::to_value(&self.records).map_err(|e| StoreError::json(&self.path, e))?;
        write_json_atomic(&self.path, &value)?;

        self.dirty = false;
        debug!(path = %self.path.display(), count = self.records.len(), "Flushed observation store");
        Ok(true)
    }
}

fn load_records(path: &Path) -> Result<BTreeMap<String, ObservationRecord>, StoreError> {
    if !path.exists() {
        return Ok(BTreeMap::new());
    }
    let content = std::fs::read_to_string(path).map_err(|e| StoreError::io(path, e))?;
    serde_json::from_str(&content).map_err(|e| StoreError::json(path, e))
}
