//! Error types for MindForge Core
//!
//! This module defines all error types used throughout the reflection engine.
//! We use `thiserror` for ergonomic error definitions with automatic Display/Error implementations.
//!
//! Most persistence paths never surface these errors to callers: missing or
//! corrupt resources degrade to defaults (see [`crate::storage::LoadOutcome`]).
//! The variants below cover the remaining failures that a caller must see.

use thiserror::Error;

/// Result type alias for MindForge operations
pub type Result<T> = std::result::Result<T, MindforgeError>;

/// Main error type for MindForge operations
#[derive(Error, Debug)]
pub enum MindforgeError {
    /// Text generation capability errors
    #[error("Generation error: {0}")]
    Generation(#[from] GenerationError),

    /// Clustering errors
    #[error("Clustering error: {0}")]
    Clustering(#[from] ClusteringError),

    /// Caller supplied unusable input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// An operation needs an onboarded profile and none exists
    #[error("No user profile found for '{0}'. Run onboarding first.")]
    ProfileMissing(String),

    /// Configuration is inconsistent
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Config file parse errors
    #[error("Config parse error: {0}")]
    ConfigParse(#[from] toml::de::Error),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic error with context
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        source: Box<MindforgeError>,
    },
}

/// Errors raised by a text-generation capability
#[derive(Error, Debug)]
pub enum GenerationError {
    #[error("API credential missing (set {0})")]
    MissingCredentials(&'static str),

    #[error("Provider returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Provider returned no usable completion")]
    EmptyCompletion,

    #[error("Malformed provider response: {0}")]
    Malformed(String),

    #[error("Transport failure: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Generator unavailable: {0}")]
    Unavailable(String),
}

/// Errors raised while vectorizing or partitioning thoughts
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ClusteringError {
    #[error("Empty vocabulary: every thought consists only of stop words")]
    EmptyVocabulary,

    #[error("Requested {k} clusters but only {samples} samples available")]
    TooFewSamples { k: usize, samples: usize },

    #[error("Cluster count must be at least 1, got {0}")]
    InvalidClusterCount(usize),
}

impl From<reqwest::Error> for MindforgeError {
    fn from(err: reqwest::Error) -> Self {
        Self::Generation(GenerationError::Transport(err))
    }
}

impl MindforgeError {
    /// Add context to an error
    pub fn context(self, context: impl Into<String>) -> Self {
        Self::WithContext {
            context: context.into(),
            source: Box::new(self),
        }
    }
}

/// Extension trait for adding context to Results
pub trait ResultExt<T> {
    /// Add context to a Result
    fn context(self, context: impl Into<String>) -> Result<T>;

    /// Add lazy context to a Result
    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String;
}

impl<T, E> ResultExt<T> for std::result::Result<T, E>
where
    E: Into<MindforgeError>,
{
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.into().context(context))
    }

    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| e.into().context(f()))
    }
}
