//! Alignment Scoring
//!
//! A cheap proxy for "did the response effort match the thought effort":
//! for each complete entry,
//!
//! ```text
//! alignment = 1 - |len(thought) - len(response)| / max(len(thought), len(response), 1)
//! ```
//!
//! clamped to `[0, 1]`, then averaged and rounded to three decimals. It is
//! purely textual so scoring never needs a second model call. Scores are
//! recomputed on every request and never cached.
//!
//! # Example
//!
//! ```
//! use mindforge_core::alignment::AlignmentScorer;
//! use mindforge_core::types::ReflectionEntry;
//!
//! let entries = vec![ReflectionEntry::new(
//!     "I feel lost",
//!     "That's understandable; tell me more",
//!     "",
//! )];
//! assert_eq!(AlignmentScorer::score(&entries), 0.314);
//! ```

pub mod scorer;

pub use scorer::{entry_alignment, AlignmentReport, AlignmentScorer, AlignmentTrend};
