//! ProfileStore: the persisted user profile document

use std::path::{Path, PathBuf};

use super::{json_kind, read_json, write_json, DataLayout, LoadOutcome};
use crate::error::Result;
use crate::profile::{UserProfile, DEFAULT_PROMPT};

/// Profile document for a single user
#[derive(Debug, Clone)]
pub struct ProfileStore {
    path: PathBuf,
}

impl ProfileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn for_user(layout: &DataLayout, user: &str) -> Self {
        Self::new(layout.user_profile(user))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the profile, injecting defaults for missing fields
    pub fn read(&self) -> LoadOutcome<UserProfile> {
        read_json(&self.path).and_then(|value| {
            if !value.is_object() {
                return LoadOutcome::WrongShape(format!(
                    "expected an object, found {}",
                    json_kind(&value)
                ));
            }
            match serde_json::from_value::<UserProfile>(value) {
                Ok(profile) => LoadOutcome::Loaded(profile.normalize()),
                Err(e) => LoadOutcome::WrongShape(format!("field type mismatch: {e}")),
            }
        })
    }

    /// Profile if one exists and is readable
    pub fn load(&self) -> Option<UserProfile> {
        self.read().into_option("user profile")
    }

    pub fn exists(&self) -> bool {
        self.read().is_loaded()
    }

    pub fn save(&self, profile: &UserProfile) -> Result<()> {
        write_json(&self.path, profile)?;
        tracing::debug!("Saved user profile to {}", self.path.display());
        Ok(())
    }

    /// System prompt for the next reflection, falling back to the default
    /// whenever the profile cannot be used
    pub fn active_prompt(&self) -> String {
        match self.read() {
            LoadOutcome::Loaded(profile) => profile.generated_prompt,
            LoadOutcome::Absent => {
                tracing::info!("User profile not found or empty. Using default prompt.");
                DEFAULT_PROMPT.to_string()
            }
            other => {
                other.into_option("user profile");
                tracing::warn!("Using default prompt.");
                DEFAULT_PROMPT.to_string()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ConversationTurn;

    fn temp_store() -> (tempfile::TempDir, ProfileStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = ProfileStore::new(dir.path().join("user_profile.json"));
        (dir, store)
    }

    #[test]
    fn test_absent_profile() {
        let (_dir, store) = temp_store();
        assert!(store.load().is_none());
        assert_eq!(store.active_prompt(), DEFAULT_PROMPT);
    }

    #[test]
    fn test_save_and_load() {
        let (_dir, store) = temp_store();
        let mut profile = UserProfile {
            name: "Ada".into(),
            generated_prompt: "Be kind.".into(),
            ..UserProfile::default()
        };
        profile.history.push(ConversationTurn::user("hello"));
        store.save(&profile).unwrap();

        assert_eq!(store.load(), Some(profile));
        assert_eq!(store.active_prompt(), "Be kind.");
    }

    #[test]
    fn test_partial_profile_gets_defaults() {
        let (_dir, store) = temp_store();
        std::fs::write(store.path(), r#"{"name":"Ada","bio":"hi","level":2}"#).unwrap();

        let profile = store.load().unwrap();
        assert!(profile.history.is_empty());
        assert_eq!(profile.rca_score, 0);
        assert_eq!(profile.level, 2);
    }

    #[test]
    fn test_list_profile_is_wrong_shape() {
        let (_dir, store) = temp_store();
        std::fs::write(store.path(), "[1, 2]").unwrap();
        assert!(matches!(store.read(), LoadOutcome::WrongShape(_)));
        assert_eq!(store.active_prompt(), DEFAULT_PROMPT);
    }

    #[test]
    fn test_corrupt_profile_uses_default_prompt() {
        let (_dir, store) = temp_store();
        std::fs::write(store.path(), "{ broken").unwrap();
        assert!(matches!(store.read(), LoadOutcome::Corrupt(_)));
        assert_eq!(store.active_prompt(), DEFAULT_PROMPT);
    }
}
