//! Core types for MindForge
//!
//! This module defines the records shared by every layer:
//! - Reflection entries (the append-only log unit)
//! - Conversation turns (profile history)
//! - Timestamps

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Timestamp type alias
pub type Timestamp = DateTime<Utc>;

/// Create a timestamp for the current moment
pub fn now() -> Timestamp {
    Utc::now()
}

/// Render a timestamp the way it is persisted (ISO-8601, UTC, microseconds)
pub fn iso_timestamp(ts: Timestamp) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// One thought + response pair recorded by the reflection log.
///
/// Every field carries a serde default so partially written records still
/// load; an entry missing `thought` or `response` simply does not qualify
/// for alignment scoring.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReflectionEntry {
    /// ISO-8601 UTC string. Kept as text so legacy records without an offset
    /// still load.
    #[serde(default)]
    pub timestamp: String,

    #[serde(default)]
    pub thought: String,

    #[serde(default)]
    pub response: String,

    #[serde(default)]
    pub tag: String,
}

impl ReflectionEntry {
    /// Build an entry stamped with the current UTC time. Surrounding
    /// whitespace is trimmed from every text field.
    pub fn new(thought: &str, response: &str, tag: &str) -> Self {
        Self::at(now(), thought, response, tag)
    }

    /// Build an entry with an explicit timestamp
    pub fn at(ts: Timestamp, thought: &str, response: &str, tag: &str) -> Self {
        Self {
            timestamp: iso_timestamp(ts),
            thought: thought.trim().to_string(),
            response: response.trim().to_string(),
            tag: tag.trim().to_string(),
        }
    }

    /// Both sides of the exchange are present
    pub fn is_complete(&self) -> bool {
        !self.thought.is_empty() && !self.response.is_empty()
    }

    /// Parsed timestamp, if it is well-formed RFC 3339
    pub fn parsed_timestamp(&self) -> Option<Timestamp> {
        DateTime::parse_from_rfc3339(&self.timestamp)
            .ok()
            .map(|ts| ts.with_timezone(&Utc))
    }
}

/// Speaker of a conversation turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
        };
        f.write_str(s)
    }
}

/// A single `{role, content}` turn in the running conversation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationTurn {
    pub role: Role,
    pub content: String,
}

impl ConversationTurn {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_entry_trims_fields() {
        let entry = ReflectionEntry::new("  I feel lost \n", "\ttell me more ", "  mood ");
        assert_eq!(entry.thought, "I feel lost");
        assert_eq!(entry.response, "tell me more");
        assert_eq!(entry.tag, "mood");
        assert!(entry.parsed_timestamp().is_some());
    }

    #[test]
    fn test_iso_timestamp_is_utc() {
        let ts = Utc.with_ymd_and_hms(2024, 3, 1, 12, 30, 0).unwrap();
        assert_eq!(iso_timestamp(ts), "2024-03-01T12:30:00.000000Z");
    }

    #[test]
    fn test_entry_missing_fields_default() {
        let entry: ReflectionEntry = serde_json::from_str(r#"{"thought":"only this"}"#).unwrap();
        assert_eq!(entry.thought, "only this");
        assert!(entry.response.is_empty());
        assert!(!entry.is_complete());
    }

    #[test]
    fn test_legacy_naive_timestamp_still_loads() {
        let entry: ReflectionEntry = serde_json::from_str(
            r#"{"timestamp":"2024-05-02T10:11:12.123456","thought":"a","response":"b","tag":""}"#,
        )
        .unwrap();
        assert!(entry.is_complete());
        assert!(entry.parsed_timestamp().is_none());
    }

    #[test]
    fn test_role_serializes_lowercase() {
        let turn = ConversationTurn::assistant("hello");
        let json = serde_json::to_string(&turn).unwrap();
        assert_eq!(json, r#"{"role":"assistant","content":"hello"}"#);
    }
}
