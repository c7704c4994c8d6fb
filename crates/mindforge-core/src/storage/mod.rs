//! Persistent Storage Layer: per-user JSON documents
//!
//! Every persisted resource is a single JSON document that is read and
//! written as a whole unit (replace, not patch):
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                 <data_dir>/<user>/                       │
//! ├──────────────────────────────────────────────────────────┤
//! │ session_memory.json │ memory_store.json │ user_profile.json │
//! │  (ReflectionStore)  │   (MemoryStore)   │  (ProfileStore)   │
//! └──────────────────────────────────────────────────────────┘
//! ```
//!
//! Reads never fail: they produce a [`LoadOutcome`] that distinguishes a
//! missing document from a corrupt or wrong-shaped one, and callers collapse
//! it to a safe default. Writes return `Result` so the caller can log them;
//! no store rolls back in-memory state on a failed write.
//!
//! There is no cross-process coordination. Two writers to the same user
//! directory race and the last write wins.

pub mod memory_store;
pub mod profile_store;
pub mod reflection_store;

pub use memory_store::MemoryStore;
pub use profile_store::ProfileStore;
pub use reflection_store::ReflectionStore;

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::{Path, PathBuf};

use crate::error::{Result, ResultExt};

/// Result of reading a persisted resource
#[derive(Debug, Clone, PartialEq)]
pub enum LoadOutcome<T> {
    /// Resource missing or zero-length
    Absent,
    /// Resource unreadable or not valid JSON
    Corrupt(String),
    /// Valid JSON with the wrong top-level structure
    WrongShape(String),
    /// Parsed value
    Loaded(T),
}

impl<T> LoadOutcome<T> {
    pub fn is_loaded(&self) -> bool {
        matches!(self, LoadOutcome::Loaded(_))
    }

    pub fn map<U, F: FnOnce(T) -> U>(self, f: F) -> LoadOutcome<U> {
        match self {
            LoadOutcome::Absent => LoadOutcome::Absent,
            LoadOutcome::Corrupt(r) => LoadOutcome::Corrupt(r),
            LoadOutcome::WrongShape(r) => LoadOutcome::WrongShape(r),
            LoadOutcome::Loaded(v) => LoadOutcome::Loaded(f(v)),
        }
    }

    pub fn and_then<U, F: FnOnce(T) -> LoadOutcome<U>>(self, f: F) -> LoadOutcome<U> {
        match self {
            LoadOutcome::Absent => LoadOutcome::Absent,
            LoadOutcome::Corrupt(r) => LoadOutcome::Corrupt(r),
            LoadOutcome::WrongShape(r) => LoadOutcome::WrongShape(r),
            LoadOutcome::Loaded(v) => f(v),
        }
    }

    /// Collapse to `Option`, logging corrupt and wrong-shaped resources
    pub fn into_option(self, resource: &str) -> Option<T> {
        match self {
            LoadOutcome::Loaded(v) => Some(v),
            LoadOutcome::Absent => {
                tracing::debug!("{} not found or empty", resource);
                None
            }
            LoadOutcome::Corrupt(reason) => {
                tracing::error!("Corrupted {}: {}", resource, reason);
                None
            }
            LoadOutcome::WrongShape(reason) => {
                tracing::error!("Invalid structure in {}: {}", resource, reason);
                None
            }
        }
    }

    /// Collapse to the value or `T::default()`
    pub fn into_value_or_default(self, resource: &str) -> T
    where
        T: Default,
    {
        self.into_option(resource).unwrap_or_default()
    }
}

/// Resolves per-user resource locations under a data root
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataLayout {
    root: PathBuf,
}

impl DataLayout {
    pub const SESSION_MEMORY: &'static str = "session_memory.json";
    pub const MEMORY_STORE: &'static str = "memory_store.json";
    pub const USER_PROFILE: &'static str = "user_profile.json";

    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory holding one user's documents
    pub fn user_dir(&self, user: &str) -> PathBuf {
        self.root.join(sanitize_user_key(user))
    }

    pub fn session_memory(&self, user: &str) -> PathBuf {
        self.user_dir(user).join(Self::SESSION_MEMORY)
    }

    pub fn memory_store(&self, user: &str) -> PathBuf {
        self.user_dir(user).join(Self::MEMORY_STORE)
    }

    pub fn user_profile(&self, user: &str) -> PathBuf {
        self.user_dir(user).join(Self::USER_PROFILE)
    }
}

/// Map a user key onto a safe directory name
pub fn sanitize_user_key(user: &str) -> String {
    let cleaned: String = user
        .trim()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' || c == '-' {
                c
            } else {
                '_'
            }
        })
        .collect();
    if cleaned.is_empty() {
        "default".to_string()
    } else {
        cleaned
    }
}

/// Read a JSON document. Missing or empty files are `Absent`.
pub(crate) fn read_json(path: &Path) -> LoadOutcome<serde_json::Value> {
    match std::fs::metadata(path) {
        Ok(meta) if meta.len() == 0 => return LoadOutcome::Absent,
        Ok(_) => {}
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return LoadOutcome::Absent,
        Err(e) => return LoadOutcome::Corrupt(format!("stat failed: {e}")),
    }

    let content = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) => return LoadOutcome::Corrupt(format!("read failed: {e}")),
    };
    if content.trim().is_empty() {
        return LoadOutcome::Absent;
    }

    match serde_json::from_str(&content) {
        Ok(value) => LoadOutcome::Loaded(value),
        Err(e) => LoadOutcome::Corrupt(format!("invalid JSON: {e}")),
    }
}

/// Read a JSON array as raw elements. A non-array document is `WrongShape`.
pub(crate) fn read_json_array(path: &Path) -> LoadOutcome<Vec<serde_json::Value>> {
    read_json(path).and_then(|value| match value {
        serde_json::Value::Array(items) => LoadOutcome::Loaded(items),
        other => LoadOutcome::WrongShape(format!("expected a list, found {}", json_kind(&other))),
    })
}

/// Read a JSON array of records. Elements that do not decode are skipped
/// with a warning; they stay on disk untouched.
pub(crate) fn read_json_sequence<T: DeserializeOwned>(path: &Path) -> LoadOutcome<Vec<T>> {
    read_json_array(path).map(|items| {
        let total = items.len();
        let records: Vec<T> = items
            .into_iter()
            .filter_map(|item| serde_json::from_value(item).ok())
            .collect();
        if records.len() < total {
            tracing::warn!(
                "Skipped {} malformed record(s) in {}",
                total - records.len(),
                path.display()
            );
        }
        records
    })
}

/// Append records to the raw array on disk. Existing elements are written
/// back as read, including ones that do not decode. A missing, corrupt or
/// non-array document starts a new array.
pub(crate) fn append_json_records<T: Serialize>(
    path: &Path,
    resource: &str,
    records: &[T],
) -> Result<()> {
    let mut items = read_json_array(path).into_value_or_default(resource);
    for record in records {
        items.push(serde_json::to_value(record)?);
    }
    write_json(path, &items)
}

/// Write a document as pretty JSON, replacing any previous content
pub(crate) fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Creating directory '{}'", parent.display()))?;
    }
    let body = serde_json::to_string_pretty(value)?;
    std::fs::write(path, body).with_context(|| format!("Writing '{}'", path.display()))?;
    Ok(())
}

pub(crate) fn json_kind(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "a boolean",
        serde_json::Value::Number(_) => "a number",
        serde_json::Value::String(_) => "a string",
        serde_json::Value::Array(_) => "a list",
        serde_json::Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ReflectionEntry;

    #[test]
    fn test_sanitize_user_key() {
        assert_eq!(sanitize_user_key("alice"), "alice");
        assert_eq!(sanitize_user_key("../etc/passwd"), "___etc_passwd");
        assert_eq!(sanitize_user_key("   "), "default");
        assert_eq!(sanitize_user_key("bob-smith_2"), "bob-smith_2");
    }

    #[test]
    fn test_layout_paths_are_per_user() {
        let layout = DataLayout::new("/data");
        assert_eq!(
            layout.session_memory("alice"),
            PathBuf::from("/data/alice/session_memory.json")
        );
        assert_ne!(layout.user_profile("alice"), layout.user_profile("bob"));
    }

    #[test]
    fn test_read_missing_and_empty_are_absent() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.json");
        assert_eq!(read_json(&missing), LoadOutcome::Absent);

        let empty = dir.path().join("empty.json");
        std::fs::write(&empty, "").unwrap();
        assert_eq!(read_json(&empty), LoadOutcome::Absent);
    }

    #[test]
    fn test_read_corrupt() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.json");
        std::fs::write(&path, "{ not json").unwrap();
        assert!(matches!(read_json(&path), LoadOutcome::Corrupt(_)));
    }

    #[test]
    fn test_sequence_rejects_object() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("obj.json");
        std::fs::write(&path, r#"{"thought":"a"}"#).unwrap();

        let outcome = read_json_sequence::<ReflectionEntry>(&path);
        assert!(matches!(outcome, LoadOutcome::WrongShape(_)));
        assert!(outcome.into_value_or_default("test").is_empty());
    }

    #[test]
    fn test_sequence_skips_bad_elements() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mixed.json");
        std::fs::write(&path, r#"[{"thought":"a","response":"b"}, 7, "x"]"#).unwrap();

        let records = read_json_sequence::<ReflectionEntry>(&path).into_value_or_default("test");
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].thought, "a");
    }

    #[test]
    fn test_append_records_keeps_undecodable_elements() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mixed.json");
        std::fs::write(&path, r#"[{"thought":"a","response":"b"}, {"thought":42}, null]"#).unwrap();

        append_json_records(&path, "test", &[ReflectionEntry::new("c", "d", "")]).unwrap();

        let LoadOutcome::Loaded(raw) = read_json_array(&path) else {
            panic!("array expected");
        };
        assert_eq!(raw.len(), 4);
        assert_eq!(raw[1], serde_json::json!({"thought": 42}));
        assert_eq!(raw[2], serde_json::Value::Null);
        assert_eq!(raw[3]["thought"], "c");
    }

    #[test]
    fn test_write_creates_parent_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/deeper/doc.json");
        write_json(&path, &vec![1, 2, 3]).unwrap();
        assert_eq!(
            read_json(&path),
            LoadOutcome::Loaded(serde_json::json!([1, 2, 3]))
        );
    }

    #[test]
    fn test_outcome_map_preserves_failure() {
        let outcome: LoadOutcome<u32> = LoadOutcome::Corrupt("x".into());
        assert_eq!(outcome.map(|v| v + 1), LoadOutcome::Corrupt("x".into()));
        assert_eq!(LoadOutcome::Loaded(1).map(|v| v + 1), LoadOutcome::Loaded(2));
    }
}
