//! Reflection Engine: the explicit per-user context object
//!
//! Owns the configuration, the three stores of one user, the progression
//! rules and an optional text generator. Nothing here is process-global;
//! two engines for different users share no state.
//!
//! Failure policy:
//! - missing/corrupt documents degrade to defaults inside the stores
//! - generator failures become a placeholder reply and change no state
//! - write failures are logged and reported in the returned structs; the
//!   in-memory progression is not rolled back

use serde::{Deserialize, Serialize};

use crate::alignment::{AlignmentReport, AlignmentScorer};
use crate::clustering::{label_clusters, Cluster, LabelSettings, ThoughtClusterer};
use crate::config::EngineConfig;
use crate::error::{GenerationError, MindforgeError, Result};
use crate::llm::{GenerationRequest, TextGenerator};
use crate::profile::{OnboardingForm, UserProfile};
use crate::progression::{classify_tier, FunctionalTier, ProgressionEngine};
use crate::storage::{DataLayout, MemoryStore, ProfileStore, ReflectionStore};
use crate::types::{ConversationTurn, ReflectionEntry};

/// Reply shown when the generator is unreachable or refuses the call
pub const GENERATION_UNAVAILABLE_REPLY: &str = "GPT unavailable. Check API key or usage limits.";

/// Reply shown when the generator answers with nothing usable
pub const EMPTY_COMPLETION_REPLY: &str = "GPT did not return a valid response.";

/// Result of one reflection turn
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TurnReport {
    pub reply: String,
    /// The generator produced a real reply and progression ran
    pub answered: bool,
    pub rca_score: u32,
    pub level: u32,
    pub leveled_up: bool,
    /// Profile write succeeded
    pub persisted: bool,
}

/// Profile snapshot plus live alignment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusReport {
    pub name: String,
    pub avatar: String,
    pub dimension: String,
    pub bio: String,
    pub tier: Option<FunctionalTier>,
    pub level: u32,
    pub rca_score: u32,
    pub next_level_at: u32,
    pub reflections: usize,
    pub alignment: AlignmentReport,
}

/// Alignment and clusters over the analysis set
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisReport {
    /// `memory_store` or `session_memory`
    pub source: String,
    pub entries: usize,
    pub alignment: AlignmentReport,
    pub clusters: Vec<Cluster>,
}

/// Per-user reflection context
#[derive(Debug)]
pub struct ReflectionEngine {
    user: String,
    config: EngineConfig,
    reflections: ReflectionStore,
    memory: MemoryStore,
    profiles: ProfileStore,
    progression: ProgressionEngine,
    clusterer: ThoughtClusterer,
    generator: Option<Box<dyn TextGenerator>>,
}

impl ReflectionEngine {
    /// Engine for `user` with stores under `config.data_dir`
    pub fn new(config: EngineConfig, user: impl Into<String>) -> Self {
        let user = user.into();
        let layout = DataLayout::new(&config.data_dir);
        Self {
            reflections: ReflectionStore::for_user(&layout, &user),
            memory: MemoryStore::for_user(&layout, &user),
            profiles: ProfileStore::for_user(&layout, &user),
            progression: ProgressionEngine::from_config(&config),
            clusterer: ThoughtClusterer::with_seed(config.cluster_seed),
            generator: None,
            config,
            user,
        }
    }

    pub fn with_generator(mut self, generator: Box<dyn TextGenerator>) -> Self {
        self.generator = Some(generator);
        self
    }

    pub fn user(&self) -> &str {
        &self.user
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn reflections(&self) -> &ReflectionStore {
        &self.reflections
    }

    pub fn memory(&self) -> &MemoryStore {
        &self.memory
    }

    pub fn profiles(&self) -> &ProfileStore {
        &self.profiles
    }

    pub fn has_generator(&self) -> bool {
        self.generator.is_some()
    }

    fn generator(&self) -> Option<&dyn TextGenerator> {
        self.generator.as_deref()
    }

    fn require_generator(&self) -> Result<&dyn TextGenerator> {
        self.generator()
            .ok_or(MindforgeError::Generation(GenerationError::MissingCredentials(
                crate::config::API_KEY_ENV,
            )))
    }

    fn require_profile(&self) -> Result<UserProfile> {
        self.profiles
            .load()
            .ok_or_else(|| MindforgeError::ProfileMissing(self.user.clone()))
    }

    /// Create (or overwrite) the profile from onboarding answers.
    ///
    /// With `classify` set the functional tier is requested from the
    /// generator; otherwise the score heuristic decides.
    pub fn onboard(&self, form: OnboardingForm, classify: bool) -> Result<UserProfile> {
        let mut profile = form.into_profile()?;
        let generator = if classify {
            Some(self.require_generator()?)
        } else {
            None
        };
        let tier = classify_tier(&profile.domain_scores, &profile.bio, generator);
        profile.tier = Some(tier);

        self.profiles.save(&profile)?;
        tracing::info!(
            "Onboarded '{}' as {} ({}), {}",
            profile.name,
            profile.avatar,
            profile.dimension,
            tier
        );
        Ok(profile)
    }

    /// Run one reflection turn.
    pub fn reflect(&self, thought: &str) -> Result<TurnReport> {
        let thought = thought.trim();
        if thought.is_empty() {
            return Err(MindforgeError::InvalidInput(
                "Please write something to reflect on.".into(),
            ));
        }
        let generator = self.require_generator()?;
        let mut profile = self.require_profile()?;

        let request = GenerationRequest::conversation(
            profile.generated_prompt.clone(),
            &profile.history,
            thought,
        )
        .with_model(self.config.model.clone())
        .with_temperature(self.config.temperature)
        .with_max_tokens(self.config.max_tokens);

        let reply = match generator.generate(&request) {
            Ok(reply) => reply,
            Err(e) => {
                tracing::error!("Reflection generation failed via {}: {}", generator.name(), e);
                let placeholder = match e {
                    GenerationError::EmptyCompletion => EMPTY_COMPLETION_REPLY,
                    _ => GENERATION_UNAVAILABLE_REPLY,
                };
                return Ok(TurnReport {
                    reply: placeholder.to_string(),
                    answered: false,
                    rca_score: profile.rca_score,
                    level: profile.level,
                    leveled_up: false,
                    persisted: false,
                });
            }
        };

        profile.history.push(ConversationTurn::user(thought));
        profile.history.push(ConversationTurn::assistant(reply.clone()));
        let outcome = self.progression.apply_turn(&mut profile);

        let persisted = match self.profiles.save(&profile) {
            Ok(()) => true,
            Err(e) => {
                tracing::error!("Failed to save profile after reflection: {}", e);
                false
            }
        };
        self.reflections.append(thought, &reply, "");

        Ok(TurnReport {
            reply,
            answered: true,
            rca_score: outcome.rca_score,
            level: outcome.level,
            leveled_up: outcome.leveled_up,
            persisted,
        })
    }

    /// Clear history and progression
    pub fn start_over(&self) -> Result<UserProfile> {
        let mut profile = self.require_profile()?;
        self.progression.reset(&mut profile);
        self.profiles.save(&profile)?;
        tracing::info!("Progress reset for '{}'", self.user);
        Ok(profile)
    }

    /// Profile snapshot with alignment of the live log
    pub fn status(&self) -> Result<StatusReport> {
        let profile = self.require_profile()?;
        let entries = self.reflections.load();
        Ok(StatusReport {
            next_level_at: self.progression.score_for_next_level(profile.level),
            reflections: entries.len(),
            alignment: AlignmentScorer::report(&entries, self.config.alignment_threshold),
            name: profile.name,
            avatar: profile.avatar,
            dimension: profile.dimension,
            bio: profile.bio,
            tier: profile.tier,
            level: profile.level,
            rca_score: profile.rca_score,
        })
    }

    /// Last `limit` reflections, oldest first
    pub fn history(&self, limit: Option<usize>) -> Vec<ReflectionEntry> {
        let entries = self.reflections.load();
        match limit {
            Some(n) if n < entries.len() => entries[entries.len() - n..].to_vec(),
            _ => entries,
        }
    }

    /// Copy new reflections into the analysis store
    pub fn promote(&self) -> Result<usize> {
        self.memory.promote(&self.reflections)
    }

    /// Entries used for analysis: the memory store, or the live log when the
    /// store is empty
    pub fn analysis_set(&self) -> (&'static str, Vec<ReflectionEntry>) {
        let stored = self.memory.load();
        if stored.is_empty() {
            ("session_memory", self.reflections.load())
        } else {
            ("memory_store", stored)
        }
    }

    /// Alignment and symbolic clusters over the analysis set.
    ///
    /// Labels are requested only when `label` is set; without a generator
    /// they fall back to the placeholder label.
    pub fn analyze(&self, k: Option<usize>, label: bool) -> AnalysisReport {
        let (source, entries) = self.analysis_set();
        let alignment = AlignmentScorer::report(&entries, self.config.alignment_threshold);

        let k = k.unwrap_or(self.config.cluster_count);
        let groups = self.clusterer.cluster(&entries, k);
        let generator = if label { self.generator() } else { None };
        let clusters = label_clusters(groups, generator, &LabelSettings::from(&self.config));

        AnalysisReport {
            source: source.to_string(),
            entries: entries.len(),
            alignment,
            clusters,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::ScriptedGenerator;
    use crate::profile::Domain;

    fn engine(dir: &tempfile::TempDir, generator: Option<ScriptedGenerator>) -> ReflectionEngine {
        let config = EngineConfig::default().with_data_dir(dir.path());
        let engine = ReflectionEngine::new(config, "ada");
        match generator {
            Some(g) => engine.with_generator(Box::new(g)),
            None => engine,
        }
    }

    fn form() -> OnboardingForm {
        OnboardingForm {
            name: "Ada".into(),
            age: 30,
            bio: "Curious.".into(),
            challenges: vec![Domain::Financial],
        }
    }

    #[test]
    fn test_reflect_without_profile() {
        let dir = tempfile::tempdir().unwrap();
        let engine = engine(&dir, Some(ScriptedGenerator::always("hi")));
        assert!(matches!(
            engine.reflect("hello"),
            Err(MindforgeError::ProfileMissing(_))
        ));
    }

    #[test]
    fn test_reflect_blank_input() {
        let dir = tempfile::tempdir().unwrap();
        let engine = engine(&dir, Some(ScriptedGenerator::always("hi")));
        assert!(matches!(
            engine.reflect("   "),
            Err(MindforgeError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_reflect_without_generator() {
        let dir = tempfile::tempdir().unwrap();
        let engine = engine(&dir, None);
        engine.onboard(form(), false).unwrap();
        assert!(matches!(
            engine.reflect("hello"),
            Err(MindforgeError::Generation(GenerationError::MissingCredentials(_)))
        ));
    }

    #[test]
    fn test_reflect_updates_profile_and_log() {
        let dir = tempfile::tempdir().unwrap();
        let engine = engine(&dir, Some(ScriptedGenerator::always("Tell me more.")));
        engine.onboard(form(), false).unwrap();

        let report = engine.reflect("  I feel stuck  ").unwrap();
        assert!(report.answered);
        assert!(report.persisted);
        assert_eq!(report.rca_score, 10);
        assert_eq!(report.level, 1);

        let profile = engine.profiles().load().unwrap();
        assert_eq!(profile.history.len(), 2);
        assert_eq!(profile.history[0].content, "I feel stuck");

        let log = engine.reflections().load();
        assert_eq!(log.len(), 1);
        assert_eq!(log[0].response, "Tell me more.");
    }

    #[test]
    fn test_generator_failure_changes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let engine = engine(&dir, Some(ScriptedGenerator::failing("quota")));
        engine.onboard(form(), false).unwrap();

        let report = engine.reflect("hello").unwrap();
        assert!(!report.answered);
        assert_eq!(report.reply, GENERATION_UNAVAILABLE_REPLY);
        assert_eq!(report.rca_score, 0);
        assert!(engine.reflections().load().is_empty());
        assert!(engine.profiles().load().unwrap().history.is_empty());
    }

    /// Answers normally but leaves a directory where the profile file was,
    /// so the save that follows the turn fails
    #[derive(Debug)]
    struct ProfileBlockingGenerator {
        profile_path: std::path::PathBuf,
    }

    impl TextGenerator for ProfileBlockingGenerator {
        fn generate(&self, _: &GenerationRequest) -> std::result::Result<String, GenerationError> {
            std::fs::remove_file(&self.profile_path)
                .and_then(|_| std::fs::create_dir(&self.profile_path))
                .map_err(|e| GenerationError::Unavailable(e.to_string()))?;
            Ok("Keep going.".to_string())
        }

        fn name(&self) -> &str {
            "profile-blocking"
        }
    }

    #[test]
    fn test_profile_save_failure_is_reported_not_rolled_back() {
        let dir = tempfile::tempdir().unwrap();
        let config = EngineConfig::default().with_data_dir(dir.path());
        let seeded = ReflectionEngine::new(config.clone(), "ada");
        let mut profile = form().into_profile().unwrap();
        profile.rca_score = 45;
        seeded.profiles().save(&profile).unwrap();

        let engine = ReflectionEngine::new(config, "ada").with_generator(Box::new(
            ProfileBlockingGenerator {
                profile_path: seeded.profiles().path().to_path_buf(),
            },
        ));
        let report = engine.reflect("still trying").unwrap();

        assert!(report.answered);
        assert!(!report.persisted);
        assert_eq!((report.rca_score, report.level), (55, 2));
        assert!(report.leveled_up);

        let log = engine.reflections().load();
        assert_eq!(log.len(), 1);
        assert_eq!(log[0].thought, "still trying");
        assert!(engine.profiles().load().is_none());
    }

    #[test]
    fn test_empty_completion_placeholder() {
        let dir = tempfile::tempdir().unwrap();
        let gen = ScriptedGenerator::new();
        gen.push_reply("");
        let engine = engine(&dir, Some(gen));
        engine.onboard(form(), false).unwrap();

        assert_eq!(engine.reflect("hello").unwrap().reply, EMPTY_COMPLETION_REPLY);
    }

    #[test]
    fn test_history_limit() {
        let dir = tempfile::tempdir().unwrap();
        let engine = engine(&dir, None);
        for i in 0..5 {
            engine.reflections().append(&format!("t{i}"), "r", "");
        }
        let last_two: Vec<_> = engine
            .history(Some(2))
            .into_iter()
            .map(|e| e.thought)
            .collect();
        assert_eq!(last_two, vec!["t3", "t4"]);
        assert_eq!(engine.history(None).len(), 5);
        assert_eq!(engine.history(Some(50)).len(), 5);
    }

    #[test]
    fn test_analysis_prefers_memory_store() {
        let dir = tempfile::tempdir().unwrap();
        let engine = engine(&dir, None);
        engine.reflections().append("live", "entry", "");
        assert_eq!(engine.analysis_set().0, "session_memory");

        engine
            .memory()
            .replace(&[ReflectionEntry::new("stored", "entry", "")])
            .unwrap();
        let (source, entries) = engine.analysis_set();
        assert_eq!(source, "memory_store");
        assert_eq!(entries[0].thought, "stored");
    }
}
