//! Length-balance alignment scorer

use serde::{Deserialize, Serialize};

use crate::types::ReflectionEntry;

/// Mean difference between later and earlier halves that counts as movement
const TREND_EPSILON: f64 = 0.05;

/// Alignment of a single thought/response pair, or `None` when either side
/// is empty.
///
/// Lengths are counted in characters. The denominator floors at one, so two
/// empty strings would align perfectly; they never reach this formula
/// because empty sides are rejected first.
pub fn entry_alignment(thought: &str, response: &str) -> Option<f64> {
    if thought.is_empty() || response.is_empty() {
        return None;
    }
    Some(length_alignment(
        thought.chars().count(),
        response.chars().count(),
    ))
}

fn length_alignment(thought_len: usize, response_len: usize) -> f64 {
    let diff = thought_len.abs_diff(response_len) as f64;
    let denom = thought_len.max(response_len).max(1) as f64;
    (1.0 - diff / denom).clamp(0.0, 1.0)
}

fn round3(value: f64) -> f64 {
    (value * 1000.0).round() / 1000.0
}

fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}

/// Direction of alignment across the history
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlignmentTrend {
    /// Later reflections are better balanced
    Improving,

    /// No meaningful change (or too little data)
    Stable,

    /// Later reflections are less balanced
    Declining,
}

/// Aggregate alignment over a memory set
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlignmentReport {
    /// Mean alignment, rounded to three decimals
    pub score: f64,

    /// Entries that had both a thought and a response
    pub scored_entries: usize,

    pub trend: AlignmentTrend,

    /// `score >= threshold`
    pub aligned: bool,
}

/// Stateless alignment computations
#[derive(Debug, Clone, Copy, Default)]
pub struct AlignmentScorer;

impl AlignmentScorer {
    /// Per-entry alignments for every complete entry, in order
    pub fn entry_scores(entries: &[ReflectionEntry]) -> Vec<f64> {
        entries
            .iter()
            .filter_map(|e| entry_alignment(&e.thought, &e.response))
            .collect()
    }

    /// Mean alignment in `[0, 1]`, rounded to three decimals. `0.0` when no
    /// entry qualifies.
    pub fn score(entries: &[ReflectionEntry]) -> f64 {
        mean(&Self::entry_scores(entries))
            .map(round3)
            .unwrap_or(0.0)
    }

    /// Compare the later half of the history against the earlier half
    pub fn trend(entries: &[ReflectionEntry]) -> AlignmentTrend {
        let scores = Self::entry_scores(entries);
        if scores.len() < 2 {
            return AlignmentTrend::Stable;
        }
        let (earlier, later) = scores.split_at(scores.len() / 2);
        let delta = match (mean(earlier), mean(later)) {
            (Some(a), Some(b)) => b - a,
            _ => 0.0,
        };

        if delta > TREND_EPSILON {
            AlignmentTrend::Improving
        } else if delta < -TREND_EPSILON {
            AlignmentTrend::Declining
        } else {
            AlignmentTrend::Stable
        }
    }

    /// Score, trend and threshold check in one pass over `entries`
    pub fn report(entries: &[ReflectionEntry], threshold: f64) -> AlignmentReport {
        let scored_entries = Self::entry_scores(entries).len();
        let score = Self::score(entries);
        AlignmentReport {
            score,
            scored_entries,
            trend: Self::trend(entries),
            aligned: scored_entries > 0 && score >= threshold,
        }
    }
}
