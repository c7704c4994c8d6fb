//! ReflectionStore: append-only log of one user's reflections
//!
//! The log lives in a single JSON array. `append` loads the current array,
//! pushes the new entry, and writes the whole array back. A failed write is
//! logged and the entry is lost; the caller is not interrupted.

use std::path::{Path, PathBuf};

use super::{append_json_records, read_json_sequence, DataLayout, LoadOutcome};
use crate::types::ReflectionEntry;

/// Durable reflection log for a single user
#[derive(Debug, Clone)]
pub struct ReflectionStore {
    path: PathBuf,
}

impl ReflectionStore {
    /// Store backed by an explicit file
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Store for `user` under `layout`
    pub fn for_user(layout: &DataLayout, user: &str) -> Self {
        Self::new(layout.session_memory(user))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Raw read, distinguishing why nothing was loaded
    pub fn read(&self) -> LoadOutcome<Vec<ReflectionEntry>> {
        read_json_sequence(&self.path)
    }

    /// All entries in insertion order; empty when missing or corrupt
    pub fn load(&self) -> Vec<ReflectionEntry> {
        self.read().into_value_or_default("session memory")
    }

    /// Append a reflection stamped with the current UTC time.
    ///
    /// Returns `true` when the log was persisted.
    pub fn append(&self, thought: &str, response: &str, tag: &str) -> bool {
        self.append_entry(ReflectionEntry::new(thought, response, tag))
    }

    /// Append a pre-built entry. Records already on disk are kept as they
    /// are, even when [`load`](Self::load) cannot decode them.
    pub fn append_entry(&self, entry: ReflectionEntry) -> bool {
        match append_json_records(&self.path, "session memory", &[entry]) {
            Ok(()) => {
                tracing::info!("Saved new reflection to session memory.");
                true
            }
            Err(e) => {
                tracing::error!("Failed to save session memory: {}", e);
                false
            }
        }
    }

    /// Number of persisted entries
    pub fn len(&self) -> usize {
        self.load().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_store() -> (tempfile::TempDir, ReflectionStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = ReflectionStore::new(dir.path().join("session_memory.json"));
        (dir, store)
    }

    #[test]
    fn test_empty_store_loads_nothing() {
        let (_dir, store) = temp_store();
        assert!(store.load().is_empty());
        assert_eq!(store.read(), LoadOutcome::Absent);
    }

    #[test]
    fn test_append_then_load() {
        let (_dir, store) = temp_store();
        assert!(store.append("a", "b", ""));

        let entries = store.load();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].thought, "a");
        assert_eq!(entries[0].response, "b");
        assert!(!entries[0].timestamp.is_empty());
    }

    #[test]
    fn test_append_preserves_order() {
        let (_dir, store) = temp_store();
        store.append("first", "r1", "");
        store.append("second", "r2", "work");
        store.append("third", "r3", "");

        let thoughts: Vec<_> = store.load().into_iter().map(|e| e.thought).collect();
        assert_eq!(thoughts, vec!["first", "second", "third"]);
    }

    #[test]
    fn test_load_is_idempotent() {
        let (_dir, store) = temp_store();
        store.append("x", "y", "z");
        assert_eq!(store.load(), store.load());
    }

    #[test]
    fn test_corrupt_log_is_replaced_on_append() {
        let (_dir, store) = temp_store();
        std::fs::write(store.path(), r#"{"not":"a list"}"#).unwrap();
        assert!(store.load().is_empty());

        store.append("fresh", "start", "");
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_append_keeps_undecodable_records() {
        let (_dir, store) = temp_store();
        std::fs::write(
            store.path(),
            r#"[{"timestamp":"t0","thought":"old","response":"r","tag":""},
                {"timestamp":"t1","thought":42,"response":"r","tag":null}]"#,
        )
        .unwrap();
        assert_eq!(store.len(), 1);

        assert!(store.append("new", "reply", ""));

        let raw: Vec<serde_json::Value> =
            serde_json::from_str(&std::fs::read_to_string(store.path()).unwrap()).unwrap();
        assert_eq!(raw.len(), 3);
        assert_eq!(raw[1]["thought"], 42);

        let thoughts: Vec<_> = store.load().into_iter().map(|e| e.thought).collect();
        assert_eq!(thoughts, vec!["old", "new"]);
    }

    #[test]
    fn test_write_failure_is_swallowed() {
        let dir = tempfile::tempdir().unwrap();
        // A directory where the file should be makes the write fail
        let blocked = dir.path().join("blocked");
        std::fs::create_dir(&blocked).unwrap();
        let store = ReflectionStore::new(&blocked);

        assert!(!store.append("lost", "entry", ""));
        assert!(store.load().is_empty());
    }
}
