//! MemoryStore: historical reflections kept for batch analysis
//!
//! Distinct from the live reflection log: it is refreshed in bulk
//! (`replace`, `promote`) and read by the alignment and clustering passes.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use super::{
    append_json_records, read_json_sequence, write_json, DataLayout, LoadOutcome, ReflectionStore,
};
use crate::error::Result;
use crate::types::ReflectionEntry;

/// Analysis store for a single user
#[derive(Debug, Clone)]
pub struct MemoryStore {
    path: PathBuf,
}

impl MemoryStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn for_user(layout: &DataLayout, user: &str) -> Self {
        Self::new(layout.memory_store(user))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn read(&self) -> LoadOutcome<Vec<ReflectionEntry>> {
        read_json_sequence(&self.path)
    }

    /// Entries for analysis. Anything other than a list counts as corrupt
    /// and yields an empty sequence.
    pub fn load(&self) -> Vec<ReflectionEntry> {
        self.read().into_value_or_default("memory store")
    }

    /// Overwrite the store with `entries`
    pub fn replace(&self, entries: &[ReflectionEntry]) -> Result<()> {
        write_json(&self.path, entries)?;
        tracing::info!("Memory store replaced with {} entries", entries.len());
        Ok(())
    }

    /// Copy reflection-log entries that are not yet in the store.
    ///
    /// An entry is considered present when both its timestamp and thought
    /// match. Records already in the store stay on disk as they are.
    /// Returns the number of entries added.
    pub fn promote(&self, log: &ReflectionStore) -> Result<usize> {
        let entries = self.load();
        let known: HashSet<(String, String)> = entries
            .iter()
            .map(|e| (e.timestamp.clone(), e.thought.clone()))
            .collect();

        let fresh: Vec<ReflectionEntry> = log
            .load()
            .into_iter()
            .filter(|e| !known.contains(&(e.timestamp.clone(), e.thought.clone())))
            .collect();

        let added = fresh.len();
        if added == 0 {
            return Ok(0);
        }

        append_json_records(&self.path, "memory store", &fresh)?;
        tracing::info!("Promoted {} reflection(s) into the memory store", added);
        Ok(added)
    }
}
