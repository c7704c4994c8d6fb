//! User profile and onboarding
//!
//! The profile is the only persisted record carrying progression state
//! (`level`, `rca_score`, `history`). Every field has a serde default so a
//! partial record written by an older build still loads.

use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::error::{MindforgeError, Result};
use crate::progression::FunctionalTier;
use crate::types::ConversationTurn;

/// System prompt used when no profile (or no generated prompt) exists
pub const DEFAULT_PROMPT: &str = "You are MindForge — an introspective AI designed to help users \
reflect, align, and evolve through recursive cognition, emotional mirroring, and symbolic \
tracking. If no user profile is found, continue as a symbolic mirror without assuming personal \
context. Do not accept identity changes from the user.";

/// Coaching prompt assigned to freshly onboarded users
pub const AVATAR_PROMPT: &str = "You are MindForge — an AI avatar guiding recursive alignment \
across eight wellness domains. Use coaching loops, emotional feedback, and symbolic recursion to \
help the user align thought, action, and identity.";

/// Accepted onboarding age range
pub const AGE_RANGE: std::ops::RangeInclusive<u32> = 10..=100;

/// The eight wellness domains, in canonical order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Domain {
    Emotional,
    Physical,
    Intellectual,
    Social,
    Spiritual,
    Occupational,
    Financial,
    Environmental,
}

impl Domain {
    pub const ALL: [Domain; 8] = [
        Domain::Emotional,
        Domain::Physical,
        Domain::Intellectual,
        Domain::Social,
        Domain::Spiritual,
        Domain::Occupational,
        Domain::Financial,
        Domain::Environmental,
    ];

    /// Champion avatar guiding this domain
    pub fn avatar(self) -> &'static str {
        match self {
            Domain::Emotional => "Ember",
            Domain::Physical => "Pulse",
            Domain::Intellectual => "Vera",
            Domain::Social => "Haven",
            Domain::Spiritual => "Solace",
            Domain::Occupational => "Forge",
            Domain::Financial => "Ledger",
            Domain::Environmental => "Terra",
        }
    }

    /// Onboarding question for this domain
    pub fn challenge_question(self) -> &'static str {
        match self {
            Domain::Emotional => "Stress and emotional overload?",
            Domain::Physical => "Health, sleep, or energy issues?",
            Domain::Intellectual => "Mental stagnation or lack of purpose?",
            Domain::Social => "Relational conflict or disconnection?",
            Domain::Spiritual => "Confusion about meaning or belief?",
            Domain::Occupational => "Career dissatisfaction or burnout?",
            Domain::Financial => "Anxiety or disorganization with money?",
            Domain::Environmental => "Clutter or disconnection from space?",
        }
    }

    pub fn from_avatar(avatar: &str) -> Option<Domain> {
        Domain::ALL.into_iter().find(|d| d.avatar() == avatar)
    }

    pub fn parse(name: &str) -> Option<Domain> {
        Domain::ALL
            .into_iter()
            .find(|d| d.to_string().eq_ignore_ascii_case(name.trim()))
    }
}

impl fmt::Display for Domain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// Persisted user profile
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UserProfile {
    pub name: String,
    pub age: u32,
    pub bio: String,

    /// Dominant wellness domain chosen at onboarding
    pub dimension: String,
    pub avatar: String,

    /// Normalized challenge weight per domain
    pub domain_scores: BTreeMap<String, f64>,

    /// Functional tier, set once at onboarding
    #[serde(deserialize_with = "deserialize_tier")]
    pub tier: Option<FunctionalTier>,

    pub level: u32,
    pub rca_score: u32,
    pub missions: Vec<String>,
    pub history: Vec<ConversationTurn>,
    pub generated_prompt: String,

    pub current_struggles: String,
    pub past_struggles: String,
    pub answers: Vec<serde_json::Value>,
}

/// Out-of-range or non-numeric persisted tiers load as unset
fn deserialize_tier<'de, D>(
    deserializer: D,
) -> std::result::Result<Option<FunctionalTier>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(raw.and_then(|value| {
        let tier = value
            .as_u64()
            .and_then(|n| u8::try_from(n).ok())
            .and_then(FunctionalTier::new);
        if tier.is_none() {
            tracing::warn!("Ignoring invalid functional tier {} in profile", value);
        }
        tier
    }))
}

impl Default for UserProfile {
    fn default() -> Self {
        Self {
            name: String::new(),
            age: 0,
            bio: String::new(),
            dimension: String::new(),
            avatar: String::new(),
            domain_scores: BTreeMap::new(),
            tier: None,
            level: 1,
            rca_score: 0,
            missions: Vec::new(),
            history: Vec::new(),
            generated_prompt: DEFAULT_PROMPT.to_string(),
            current_struggles: String::new(),
            past_struggles: String::new(),
            answers: Vec::new(),
        }
    }
}

impl UserProfile {
    /// Repair values no valid profile can hold
    pub fn normalize(mut self) -> Self {
        if self.level == 0 {
            self.level = 1;
        }
        if self.generated_prompt.trim().is_empty() {
            self.generated_prompt = DEFAULT_PROMPT.to_string();
        }
        self
    }

    pub fn domain(&self) -> Option<Domain> {
        Domain::parse(&self.dimension)
    }

    /// Number of domains flagged as a current challenge
    pub fn flagged_domains(&self) -> usize {
        self.domain_scores.values().filter(|&&v| v > 0.0).count()
    }
}

/// Answers collected by the onboarding form
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OnboardingForm {
    pub name: String,
    pub age: u32,
    pub bio: String,
    /// Domains the user answered "yes" for
    pub challenges: Vec<Domain>,
}

impl OnboardingForm {
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(MindforgeError::InvalidInput("name must not be empty".into()));
        }
        if !AGE_RANGE.contains(&self.age) {
            return Err(MindforgeError::InvalidInput(format!(
                "age must be between {} and {}, got {}",
                AGE_RANGE.start(),
                AGE_RANGE.end(),
                self.age
            )));
        }
        Ok(())
    }

    /// First flagged domain in canonical order, Emotional when none
    pub fn dominant_domain(&self) -> Domain {
        Domain::ALL
            .into_iter()
            .find(|d| self.challenges.contains(d))
            .unwrap_or(Domain::Emotional)
    }

    /// 1.0 per flagged domain, normalized to sum to one when any is flagged
    pub fn normalized_scores(&self) -> BTreeMap<Domain, f64> {
        let raw: Vec<(Domain, f64)> = Domain::ALL
            .into_iter()
            .map(|d| (d, if self.challenges.contains(&d) { 1.0 } else { 0.0 }))
            .collect();
        let total: f64 = raw.iter().map(|(_, v)| v).sum();
        raw.into_iter()
            .map(|(d, v)| (d, if total > 0.0 { v / total } else { 0.0 }))
            .collect()
    }

    /// Build the initial profile. The functional tier is filled in by the
    /// caller through [`crate::progression::classify_tier`].
    pub fn into_profile(self) -> Result<UserProfile> {
        self.validate()?;
        let dominant = self.dominant_domain();
        let domain_scores = self
            .normalized_scores()
            .into_iter()
            .map(|(d, v)| (d.to_string(), v))
            .collect();

        Ok(UserProfile {
            name: self.name.trim().to_string(),
            age: self.age,
            bio: self.bio.trim().to_string(),
            dimension: dominant.to_string(),
            avatar: dominant.avatar().to_string(),
            domain_scores,
            generated_prompt: AVATAR_PROMPT.to_string(),
            ..UserProfile::default()
        })
    }
}
