//! One-shot functional tier assigned at onboarding

use itertools::Itertools;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::llm::{GenerationRequest, TextGenerator};

const TIER_SYSTEM_PROMPT: &str = "You are a wellness intake analyst. Classify the user's current \
functional tier on a scale from 1 (thriving, minor friction) to 4 (overwhelmed across many \
domains). Answer with a single digit.";

/// Functional tier, always within `1..=4`
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct FunctionalTier(u8);

impl FunctionalTier {
    pub const MIN: u8 = 1;
    pub const MAX: u8 = 4;

    pub fn new(value: u8) -> Option<Self> {
        (Self::MIN..=Self::MAX).contains(&value).then_some(Self(value))
    }

    pub fn value(self) -> u8 {
        self.0
    }
}

impl TryFrom<u8> for FunctionalTier {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::new(value).ok_or_else(|| format!("tier must be 1..=4, got {value}"))
    }
}

impl From<FunctionalTier> for u8 {
    fn from(tier: FunctionalTier) -> u8 {
        tier.0
    }
}

impl fmt::Display for FunctionalTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Tier {}", self.0)
    }
}

/// Tier from the number of flagged domains alone
pub fn heuristic_tier(domain_scores: &BTreeMap<String, f64>) -> FunctionalTier {
    let flagged = domain_scores.values().filter(|&&v| v > 0.0).count();
    let tier = match flagged {
        0..=1 => 1,
        2..=3 => 2,
        4..=5 => 3,
        _ => 4,
    };
    FunctionalTier(tier)
}

/// First digit 1..=4 appearing in the reply
fn parse_tier(reply: &str) -> Option<FunctionalTier> {
    reply
        .chars()
        .filter_map(|c| c.to_digit(10))
        .find_map(|d| FunctionalTier::new(d as u8))
}

fn tier_prompt(domain_scores: &BTreeMap<String, f64>, narrative: &str) -> String {
    let scores = domain_scores
        .iter()
        .map(|(domain, score)| format!("- {domain}: {score:.2}"))
        .join("\n");
    format!(
        "Normalized challenge scores by wellness domain:\n{scores}\n\n\
         In their own words: \"{}\"\n\nReply with the tier digit only.",
        narrative.trim()
    )
}

/// Classify once at onboarding.
///
/// Uses the text-analysis capability when supplied; an unavailable
/// generator or an unparseable reply falls back to [`heuristic_tier`].
pub fn classify_tier(
    domain_scores: &BTreeMap<String, f64>,
    narrative: &str,
    generator: Option<&dyn TextGenerator>,
) -> FunctionalTier {
    let fallback = heuristic_tier(domain_scores);
    let Some(generator) = generator else {
        return fallback;
    };

    let request = GenerationRequest::single(TIER_SYSTEM_PROMPT, tier_prompt(domain_scores, narrative))
        .with_temperature(0.0)
        .with_max_tokens(5);

    match generator.generate(&request) {
        Ok(reply) => parse_tier(&reply).unwrap_or_else(|| {
            tracing::warn!("Unparseable tier reply '{}', using heuristic", reply);
            fallback
        }),
        Err(e) => {
            tracing::error!("Tier classification failed: {}", e);
            fallback
        }
    }
}
