//! Level progression
//!
//! Two independent state paths live here:
//!
//! 1. **Per-turn loop** ([`ProgressionEngine`]): every reflection turn adds a
//!    fixed increment to `rca_score`; when the score reaches
//!    `level * threshold` the level rises by exactly one. At most one level
//!    is gained per turn even if a large increment clears several
//!    thresholds at once.
//! 2. **Onboarding tier** ([`classify_tier`]): a one-shot functional tier
//!    (1..=4) derived from normalized domain scores and the user's bio. The
//!    per-turn loop never touches it.
//!
//! ```text
//!            turn: score += inc                 start over
//!   ┌────────────────────────────┐      ┌─────────────────────────┐
//!   │                            ▼      │                         ▼
//! (level L, score S) ── S ≥ L·T ──► (L+1, S)     (any) ──► (1, 0, history = [])
//! ```

pub mod tier;

pub use tier::{classify_tier, heuristic_tier, FunctionalTier};

use serde::{Deserialize, Serialize};

use crate::config::EngineConfig;
use crate::profile::UserProfile;

/// Outcome of one reflection turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TurnOutcome {
    pub rca_score: u32,
    pub level: u32,
    pub leveled_up: bool,
}

/// Applies the per-turn score and level rules
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgressionEngine {
    increment: u32,
    threshold: u32,
}

impl Default for ProgressionEngine {
    fn default() -> Self {
        Self::new(10, 50)
    }
}

impl ProgressionEngine {
    /// A zero threshold is raised to one so every level stays reachable
    pub fn new(increment: u32, threshold: u32) -> Self {
        Self {
            increment,
            threshold: threshold.max(1),
        }
    }

    pub fn from_config(config: &EngineConfig) -> Self {
        Self::new(config.score_increment, config.level_threshold)
    }

    pub fn increment(&self) -> u32 {
        self.increment
    }

    pub fn threshold(&self) -> u32 {
        self.threshold
    }

    /// Score needed before `level` advances
    pub fn score_for_next_level(&self, level: u32) -> u32 {
        level.max(1).saturating_mul(self.threshold)
    }

    /// Fold one reflection turn into the profile
    pub fn apply_turn(&self, profile: &mut UserProfile) -> TurnOutcome {
        profile.level = profile.level.max(1);
        profile.rca_score = profile.rca_score.saturating_add(self.increment);

        let crossed = profile.rca_score >= self.score_for_next_level(profile.level);
        let next = profile.level.saturating_add(1);
        let leveled_up = crossed && next > profile.level;
        if leveled_up {
            profile.level = next;
            tracing::info!("Level up! Welcome to Level {}", profile.level);
        }

        TurnOutcome {
            rca_score: profile.rca_score,
            level: profile.level,
            leveled_up,
        }
    }

    /// "Start over": clear history, score back to 0, level back to 1
    pub fn reset(&self, profile: &mut UserProfile) {
        profile.history.clear();
        profile.rca_score = 0;
        profile.level = 1;
    }

    /// Fraction of the way from the current score to the next level
    pub fn progress_to_next(&self, profile: &UserProfile) -> f64 {
        let target = self.score_for_next_level(profile.level) as f64;
        (profile.rca_score as f64 / target).clamp(0.0, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ConversationTurn;

    fn profile(score: u32, level: u32) -> UserProfile {
        UserProfile {
            rca_score: score,
            level,
            ..UserProfile::default()
        }
    }

    #[test]
    fn test_crossing_threshold_levels_up() {
        let engine = ProgressionEngine::new(10, 50);
        let mut p = profile(45, 1);
        let outcome = engine.apply_turn(&mut p);

        assert_eq!(outcome.rca_score, 55);
        assert_eq!(outcome.level, 2);
        assert!(outcome.leveled_up);
    }

    #[test]
    fn test_below_threshold_keeps_level() {
        let engine = ProgressionEngine::default();
        let mut p = profile(0, 1);
        for _ in 0..4 {
            assert!(!engine.apply_turn(&mut p).leveled_up);
        }
        assert_eq!((p.rca_score, p.level), (40, 1));

        assert!(engine.apply_turn(&mut p).leveled_up);
        assert_eq!((p.rca_score, p.level), (50, 2));
    }

    #[test]
    fn test_large_increment_gains_single_level() {
        let engine = ProgressionEngine::new(500, 50);
        let mut p = profile(0, 1);
        let outcome = engine.apply_turn(&mut p);

        assert_eq!(outcome.rca_score, 500);
        assert_eq!(outcome.level, 2);
    }

    #[test]
    fn test_level_never_decreases_across_turns() {
        let engine = ProgressionEngine::new(7, 20);
        let mut p = profile(0, 1);
        let mut last = p.level;
        for _ in 0..100 {
            engine.apply_turn(&mut p);
            assert!(p.level >= last);
            last = p.level;
        }
    }

    #[test]
    fn test_reset() {
        let engine = ProgressionEngine::default();
        let mut p = profile(130, 3);
        p.history.push(ConversationTurn::user("hi"));
        p.tier = FunctionalTier::new(2);

        engine.reset(&mut p);
        assert_eq!((p.rca_score, p.level), (0, 1));
        assert!(p.history.is_empty());
        assert_eq!(p.tier, FunctionalTier::new(2));
    }

    #[test]
    fn test_level_ceiling_does_not_overflow() {
        let engine = ProgressionEngine::default();
        let mut p = profile(u32::MAX, u32::MAX);
        let outcome = engine.apply_turn(&mut p);

        assert_eq!(outcome.level, u32::MAX);
        assert_eq!(outcome.rca_score, u32::MAX);
        assert!(!outcome.leveled_up);
    }

    #[test]
    fn test_zero_threshold_clamped() {
        assert_eq!(ProgressionEngine::new(10, 0).threshold(), 1);
    }

    #[test]
    fn test_progress_fraction() {
        let engine = ProgressionEngine::default();
        assert!((engine.progress_to_next(&profile(25, 1)) - 0.5).abs() < 1e-9);
        assert_eq!(engine.progress_to_next(&profile(500, 1)), 1.0);
    }
}
