//! MindForge Core - Reflection memory and symbolic analysis for a journaling companion
//!
//! MindForge Core keeps a per-user reflection log, measures how well each reply
//! stays on the user's words, groups recurring themes, and tracks a simple
//! level progression.
//!
//! # Architecture
//!
//! 1. **Storage** (`storage`): JSON documents per user that degrade to defaults
//! 2. **Alignment** (`alignment`): Character-level thought/response similarity
//! 3. **Clustering** (`clustering`): Seeded TF-IDF + k-means themes with optional labels
//! 4. **Progression** (`progression`): Per-turn score/level rules and the onboarding tier
//! 5. **Engine** (`engine`): Explicit per-user context tying the layers together
//!
//! # Quick Start
//!
//! ```
//! use mindforge_core::{AlignmentScorer, ReflectionEntry};
//!
//! let entries = vec![
//!     ReflectionEntry::new("I feel lost", "You feel lost; what changed?", ""),
//!     ReflectionEntry::new("", "skipped", ""),
//! ];
//!
//! // The incomplete entry is ignored
//! let report = AlignmentScorer::report(&entries, 0.75);
//! assert_eq!(report.scored_entries, 1);
//! assert!(report.score > 0.0 && report.score <= 1.0);
//! ```

#![deny(unsafe_code)]
#![warn(rust_2018_idioms, missing_debug_implementations, clippy::all)]

pub mod alignment;
pub mod clustering;
pub mod config;
pub mod engine;
pub mod error;
pub mod llm;
pub mod profile;
pub mod progression;
pub mod storage;
pub mod types;

// Re-export commonly used types for convenience
pub use alignment::{AlignmentReport, AlignmentScorer, AlignmentTrend};
pub use clustering::{Cluster, ClusterMap, ThoughtClusterer};
pub use config::EngineConfig;
pub use engine::{AnalysisReport, ReflectionEngine, StatusReport, TurnReport};
pub use error::{ClusteringError, GenerationError, MindforgeError, Result};
pub use llm::{GenerationRequest, OpenAICompatibleClient, ScriptedGenerator, TextGenerator};
pub use profile::{Domain, OnboardingForm, UserProfile};
pub use progression::{FunctionalTier, ProgressionEngine, TurnOutcome};
pub use storage::{DataLayout, LoadOutcome, MemoryStore, ProfileStore, ReflectionStore};
pub use types::{ConversationTurn, ReflectionEntry, Role, Timestamp};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");
