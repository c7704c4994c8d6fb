//! Engine configuration
//!
//! Layering, lowest to highest precedence: built-in defaults, an optional
//! TOML file, then `MINDFORGE_*` environment variables (a `.env` file is
//! honoured via `dotenvy`). The API credential is read from the environment
//! only and never serialized.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::error::{MindforgeError, Result, ResultExt};

/// Environment variable holding the text-generation credential
pub const API_KEY_ENV: &str = "OPENAI_API_KEY";

/// Environment variable naming an optional TOML config file
pub const CONFIG_PATH_ENV: &str = "MINDFORGE_CONFIG";

/// Main engine configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Root directory for per-user persisted resources
    pub data_dir: PathBuf,

    /// Model used for reflection replies
    pub model: String,

    /// Sampling temperature for reflection replies
    pub temperature: f64,

    /// Response-length cap for reflection replies
    pub max_tokens: u32,

    /// Model used for cluster labels
    pub label_model: String,

    pub label_temperature: f64,

    pub label_max_tokens: u32,

    /// Base URL of the OpenAI-compatible endpoint
    pub api_base_url: String,

    /// Score added per reflection turn
    pub score_increment: u32,

    /// Per-level score threshold (level N needs N * threshold)
    pub level_threshold: u32,

    /// Alignment score considered "aligned"
    pub alignment_threshold: f64,

    /// Default number of thought clusters
    pub cluster_count: usize,

    /// Seed for clustering initialisation
    pub cluster_seed: u64,

    /// Credential, environment only
    #[serde(skip)]
    pub api_key: Option<String>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("database"),
            model: "gpt-4".to_string(),
            temperature: 0.65,
            max_tokens: 1000,
            label_model: "gpt-4".to_string(),
            label_temperature: 0.6,
            label_max_tokens: 20,
            api_base_url: "https://api.openai.com/v1".to_string(),
            score_increment: 10,
            level_threshold: 50,
            alignment_threshold: 0.75,
            cluster_count: 4,
            cluster_seed: 42,
            api_key: None,
        }
    }
}

impl EngineConfig {
    /// Create a new configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the data directory
    pub fn with_data_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.data_dir = dir.into();
        self
    }

    /// Set the progression constants
    pub fn with_progression(mut self, increment: u32, threshold: u32) -> Self {
        self.score_increment = increment;
        self.level_threshold = threshold;
        self
    }

    /// Set the credential
    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    /// Full layered load: defaults, file (explicit path or `MINDFORGE_CONFIG`),
    /// `.env`, then process environment.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        dotenvy::dotenv().ok();

        let file = path
            .map(Path::to_path_buf)
            .or_else(|| std::env::var_os(CONFIG_PATH_ENV).map(PathBuf::from));

        let mut config = match file {
            Some(p) => Self::from_file(&p)?,
            None => Self::default(),
        };
        config.apply_env_from(|name| std::env::var(name).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a TOML file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Reading config '{}'", path.display()))?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    /// Render the configuration as TOML (credential omitted)
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self)
            .map_err(|e| MindforgeError::InvalidConfig(format!("cannot render config: {e}")))
    }

    /// Override fields from environment-style lookups
    pub fn apply_env_from<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup("MINDFORGE_DATA_DIR") {
            self.data_dir = PathBuf::from(v);
        }
        if let Some(v) = lookup("MINDFORGE_MODEL") {
            self.model = v;
        }
        if let Some(v) = lookup("MINDFORGE_LABEL_MODEL") {
            self.label_model = v;
        }
        if let Some(v) = lookup("MINDFORGE_API_BASE_URL") {
            self.api_base_url = v;
        }
        parse_into(&lookup, "MINDFORGE_TEMPERATURE", &mut self.temperature)?;
        parse_into(&lookup, "MINDFORGE_MAX_TOKENS", &mut self.max_tokens)?;
        parse_into(&lookup, "MINDFORGE_SCORE_INCREMENT", &mut self.score_increment)?;
        parse_into(&lookup, "MINDFORGE_LEVEL_THRESHOLD", &mut self.level_threshold)?;
        parse_into(&lookup, "MINDFORGE_ALIGNMENT_THRESHOLD", &mut self.alignment_threshold)?;
        parse_into(&lookup, "MINDFORGE_CLUSTER_COUNT", &mut self.cluster_count)?;
        parse_into(&lookup, "MINDFORGE_CLUSTER_SEED", &mut self.cluster_seed)?;

        if let Some(key) = lookup(API_KEY_ENV).filter(|k| !k.trim().is_empty()) {
            self.api_key = Some(key);
        }
        Ok(())
    }

    /// Check cross-field invariants
    pub fn validate(&self) -> Result<()> {
        if self.level_threshold == 0 {
            return Err(MindforgeError::InvalidConfig(
                "level_threshold must be at least 1".into(),
            ));
        }
        if self.score_increment == 0 {
            return Err(MindforgeError::InvalidConfig(
                "score_increment must be at least 1".into(),
            ));
        }
        if !(0.0..=2.0).contains(&self.temperature) {
            return Err(MindforgeError::InvalidConfig(format!(
                "temperature must be in [0, 2], got {}",
                self.temperature
            )));
        }
        if self.cluster_count < 2 {
            return Err(MindforgeError::InvalidConfig(format!(
                "cluster_count must be at least 2, got {}",
                self.cluster_count
            )));
        }
        if !(0.0..=1.0).contains(&self.alignment_threshold) {
            return Err(MindforgeError::InvalidConfig(format!(
                "alignment_threshold must be in [0, 1], got {}",
                self.alignment_threshold
            )));
        }
        Ok(())
    }
}

fn parse_into<F, T>(lookup: &F, name: &str, slot: &mut T) -> Result<()>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    if let Some(raw) = lookup(name) {
        *slot = raw.trim().parse().map_err(|_| {
            MindforgeError::InvalidConfig(format!("{name} has an unparseable value '{raw}'"))
        })?;
    }
    Ok(())
}
