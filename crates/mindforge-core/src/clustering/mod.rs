//! Symbolic Thought Clustering
//!
//! Groups a user's historical thoughts into unsupervised clusters and asks
//! the text-generation capability for a short symbolic label per cluster.
//!
//! ```text
//! memory ──► thoughts ──► Partitioner (TF-IDF + seeded k-means) ──► id → [thought]
//!                                                                      │
//!                                        TextGenerator ◄── label() ◄───┘
//! ```
//!
//! Clustering is best-effort enrichment: every failure is logged and turns
//! into an empty mapping. Labeling is a separate step that fails on its own
//! and falls back to a placeholder label.

pub mod kmeans;
pub mod tfidf;

pub use kmeans::{KMeansConfig, KMeansFit};
pub use tfidf::{TfidfMatrix, TfidfVectorizer};

use itertools::Itertools;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

use crate::config::EngineConfig;
use crate::error::ClusteringError;
use crate::llm::{GenerationRequest, TextGenerator};
use crate::types::ReflectionEntry;

/// Label when there is nothing to label or no generator
pub const UNNAMED_CLUSTER: &str = "Unnamed Cluster";

/// Label when the generator call fails
pub const UNLABELED_CLUSTER: &str = "Unlabeled Cluster";

/// Thoughts sent to the generator per cluster
pub const MAX_LABEL_THOUGHTS: usize = 8;

const LABEL_SYSTEM_PROMPT: &str = "You are a symbolic compression engine.";

/// Cluster id → member thoughts, in id order
pub type ClusterMap = BTreeMap<usize, Vec<String>>;

/// Vectorize-and-partition capability
pub trait Partitioner: Send + Sync + std::fmt::Debug {
    /// One group index per input text
    fn partition(&self, texts: &[String], k: usize) -> Result<Vec<usize>, ClusteringError>;
}

/// Default partitioner: TF-IDF features, seeded k-means++
#[derive(Debug, Clone, Copy)]
pub struct TfidfKMeans {
    pub seed: u64,
    pub n_init: usize,
}

impl Default for TfidfKMeans {
    fn default() -> Self {
        Self {
            seed: 42,
            n_init: 10,
        }
    }
}

impl Partitioner for TfidfKMeans {
    fn partition(&self, texts: &[String], k: usize) -> Result<Vec<usize>, ClusteringError> {
        let matrix = TfidfVectorizer::new().fit_transform(texts)?;
        let config = KMeansConfig::new(k)
            .with_seed(self.seed)
            .with_n_init(self.n_init);
        Ok(kmeans::fit(&matrix.rows, &config)?.assignments)
    }
}

/// A labeled group of thoughts. Derived per analysis pass, never persisted
/// as authoritative state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cluster {
    pub id: usize,
    pub label: String,
    pub members: Vec<String>,
}

/// Settings for the label request
#[derive(Debug, Clone, PartialEq)]
pub struct LabelSettings {
    pub model: Option<String>,
    pub temperature: f64,
    pub max_tokens: u32,
}

impl Default for LabelSettings {
    fn default() -> Self {
        Self {
            model: None,
            temperature: 0.6,
            max_tokens: 20,
        }
    }
}

impl From<&EngineConfig> for LabelSettings {
    fn from(config: &EngineConfig) -> Self {
        Self {
            model: Some(config.label_model.clone()),
            temperature: config.label_temperature,
            max_tokens: config.label_max_tokens,
        }
    }
}

/// Effective cluster count: `max(2, distinct)` when fewer distinct thoughts
/// than requested
pub fn effective_k(requested: usize, distinct: usize) -> usize {
    if distinct < requested {
        distinct.max(2)
    } else {
        requested
    }
}

/// Groups thoughts through a [`Partitioner`]
#[derive(Debug, Clone, Default)]
pub struct ThoughtClusterer<P: Partitioner = TfidfKMeans> {
    partitioner: P,
}

impl ThoughtClusterer<TfidfKMeans> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_seed(seed: u64) -> Self {
        Self {
            partitioner: TfidfKMeans {
                seed,
                ..TfidfKMeans::default()
            },
        }
    }
}

impl<P: Partitioner> ThoughtClusterer<P> {
    pub fn with_partitioner(partitioner: P) -> Self {
        Self { partitioner }
    }

    /// Group the non-empty thoughts of `memory` into at most `k` clusters.
    ///
    /// Returns an empty map on empty input or on any internal failure.
    pub fn cluster(&self, memory: &[ReflectionEntry], k: usize) -> ClusterMap {
        let thoughts: Vec<String> = memory
            .iter()
            .map(|e| e.thought.trim())
            .filter(|t| !t.is_empty())
            .map(str::to_string)
            .collect();
        self.cluster_texts(&thoughts, k)
    }

    /// Same as [`cluster`](Self::cluster) over raw texts
    pub fn cluster_texts(&self, thoughts: &[String], k: usize) -> ClusterMap {
        if thoughts.is_empty() {
            return ClusterMap::new();
        }

        let distinct = thoughts.iter().collect::<HashSet<_>>().len();
        let k = effective_k(k, distinct);

        match self.partitioner.partition(thoughts, k) {
            Ok(assignments) if assignments.len() == thoughts.len() => {
                let mut clustered = ClusterMap::new();
                for (thought, id) in thoughts.iter().zip(assignments) {
                    clustered.entry(id).or_default().push(thought.clone());
                }
                tracing::info!(
                    "Clustered {} thoughts into {} groups.",
                    thoughts.len(),
                    clustered.len()
                );
                clustered
            }
            Ok(assignments) => {
                tracing::error!(
                    "Partitioner returned {} assignments for {} thoughts",
                    assignments.len(),
                    thoughts.len()
                );
                ClusterMap::new()
            }
            Err(e) => {
                tracing::error!("Error during thought clustering: {}", e);
                ClusterMap::new()
            }
        }
    }
}

/// Build the label prompt for the first [`MAX_LABEL_THOUGHTS`] thoughts
pub fn label_prompt(thoughts: &[String]) -> String {
    let listed = thoughts
        .iter()
        .take(MAX_LABEL_THOUGHTS)
        .map(|t| format!("- {t}"))
        .join("\n");
    format!(
        "The following reflections belong to the same cognitive/emotional theme:\n\n{listed}\n\n\
         Return a short symbolic label (1–3 words) that captures the theme."
    )
}

/// Ask `generator` for a 1–3 word label with default settings
pub fn label(thoughts: &[String], generator: Option<&dyn TextGenerator>) -> String {
    label_with(thoughts, generator, &LabelSettings::default())
}

/// Ask `generator` for a 1–3 word label
pub fn label_with(
    thoughts: &[String],
    generator: Option<&dyn TextGenerator>,
    settings: &LabelSettings,
) -> String {
    let Some(generator) = generator else {
        return UNNAMED_CLUSTER.to_string();
    };
    if thoughts.is_empty() {
        return UNNAMED_CLUSTER.to_string();
    }

    let mut request = GenerationRequest::single(LABEL_SYSTEM_PROMPT, label_prompt(thoughts))
        .with_temperature(settings.temperature)
        .with_max_tokens(settings.max_tokens);
    if let Some(model) = &settings.model {
        request = request.with_model(model.clone());
    }

    match generator.generate(&request) {
        Ok(text) => clean_label(&text).unwrap_or_else(|| UNLABELED_CLUSTER.to_string()),
        Err(e) => {
            tracing::error!("Failed to generate cluster label: {}", e);
            UNLABELED_CLUSTER.to_string()
        }
    }
}

/// Strip quotes and trailing punctuation the model tends to add
fn clean_label(raw: &str) -> Option<String> {
    let cleaned = raw
        .lines()
        .next()
        .unwrap_or_default()
        .trim()
        .trim_matches(|c: char| c == '"' || c == '\'' || c == '*' || c == '`')
        .trim_end_matches(['.', '!'])
        .trim();
    if cleaned.is_empty() {
        None
    } else {
        Some(cleaned.to_string())
    }
}

/// Label every cluster. A failed label never drops its cluster.
pub fn label_clusters(
    clusters: ClusterMap,
    generator: Option<&dyn TextGenerator>,
    settings: &LabelSettings,
) -> Vec<Cluster> {
    clusters
        .into_iter()
        .map(|(id, members)| Cluster {
            id,
            label: label_with(&members, generator, settings),
            members,
        })
        .collect()
}
