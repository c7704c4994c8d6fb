//! TF-IDF vectorizer
//!
//! Tokens are runs of two or more word characters, lowercased, with English
//! stop words removed. IDF is smoothed (`ln((1 + n) / (1 + df)) + 1`) and
//! every row is L2-normalized, so cosine and euclidean geometry agree.

use itertools::Itertools;
use lazy_static::lazy_static;
use regex::Regex;
use std::collections::{HashMap, HashSet};

use crate::error::ClusteringError;

lazy_static! {
    static ref TOKEN_PATTERN: Regex = Regex::new(r"(?u)\b\w\w+\b").expect("valid token regex");
    static ref ENGLISH_STOP_WORDS: HashSet<&'static str> = STOP_WORDS.iter().copied().collect();
}

const STOP_WORDS: &[&str] = &[
    "a", "about", "above", "across", "after", "afterwards", "again", "against", "all", "almost",
    "alone", "along", "already", "also", "although", "always", "am", "among", "amongst", "an",
    "and", "another", "any", "anyhow", "anyone", "anything", "anyway", "anywhere", "are",
    "around", "as", "at", "back", "be", "became", "because", "become", "becomes", "becoming",
    "been", "before", "beforehand", "behind", "being", "below", "beside", "besides", "between",
    "beyond", "both", "but", "by", "can", "cannot", "could", "did", "do", "does", "doing",
    "done", "down", "due", "during", "each", "either", "else", "elsewhere", "enough", "etc",
    "even", "ever", "every", "everyone", "everything", "everywhere", "except", "few", "for",
    "former", "formerly", "from", "further", "had", "has", "have", "having", "he", "hence",
    "her", "here", "hereafter", "hereby", "herein", "hers", "herself", "him", "himself", "his",
    "how", "however", "i", "ie", "if", "in", "indeed", "into", "is", "it", "its", "itself",
    "just", "keep", "last", "latter", "latterly", "least", "less", "ll", "many", "may", "me",
    "meanwhile", "might", "mine", "more", "moreover", "most", "mostly", "much", "must", "my",
    "myself", "namely", "neither", "never", "nevertheless", "next", "no", "nobody", "none",
    "noone", "nor", "not", "nothing", "now", "nowhere", "of", "off", "often", "on", "once",
    "one", "only", "onto", "or", "other", "others", "otherwise", "our", "ours", "ourselves",
    "out", "over", "own", "per", "perhaps", "please", "rather", "re", "same", "seem", "seemed",
    "seeming", "seems", "several", "she", "should", "since", "so", "some", "somehow",
    "someone", "something", "sometime", "sometimes", "somewhere", "still", "such", "than",
    "that", "the", "their", "theirs", "them", "themselves", "then", "thence", "there",
    "thereafter", "thereby", "therefore", "therein", "thereupon", "these", "they", "this",
    "those", "though", "through", "throughout", "thru", "thus", "to", "together", "too",
    "toward", "towards", "under", "until", "up", "upon", "us", "ve", "very", "via", "was", "we",
    "well", "were", "what", "whatever", "when", "whence", "whenever", "where", "whereafter",
    "whereas", "whereby", "wherein", "whereupon", "wherever", "whether", "which", "while",
    "whither", "who", "whoever", "whole", "whom", "whose", "why", "will", "with", "within",
    "without", "would", "yet", "you", "your", "yours", "yourself", "yourselves",
];

/// Whether `word` (already lowercased) is an English stop word
pub fn is_stop_word(word: &str) -> bool {
    ENGLISH_STOP_WORDS.contains(word)
}

/// Lowercased, stop-word-free tokens of `text`
pub fn tokenize(text: &str) -> Vec<String> {
    let lowered = text.to_lowercase();
    TOKEN_PATTERN
        .find_iter(&lowered)
        .map(|m| m.as_str())
        .filter(|t| !is_stop_word(t))
        .map(str::to_string)
        .collect()
}

/// Dense document-term matrix
#[derive(Debug, Clone, PartialEq)]
pub struct TfidfMatrix {
    /// Sorted vocabulary; column `j` is `vocabulary[j]`
    pub vocabulary: Vec<String>,
    /// One L2-normalized row per document
    pub rows: Vec<Vec<f64>>,
}

impl TfidfMatrix {
    pub fn n_docs(&self) -> usize {
        self.rows.len()
    }

    pub fn n_terms(&self) -> usize {
        self.vocabulary.len()
    }

    /// Highest-weighted terms of one row
    pub fn top_terms(&self, row: usize, n: usize) -> Vec<&str> {
        let Some(weights) = self.rows.get(row) else {
            return Vec::new();
        };
        weights
            .iter()
            .enumerate()
            .filter(|(_, w)| **w > 0.0)
            .sorted_by(|a, b| b.1.total_cmp(a.1).then(a.0.cmp(&b.0)))
            .take(n)
            .map(|(j, _)| self.vocabulary[j].as_str())
            .collect()
    }
}

/// Fits vocabulary and IDF weights on the documents it transforms
#[derive(Debug, Clone, Copy, Default)]
pub struct TfidfVectorizer;

impl TfidfVectorizer {
    pub fn new() -> Self {
        Self
    }

    pub fn fit_transform<S: AsRef<str>>(&self, docs: &[S]) -> Result<TfidfMatrix, ClusteringError> {
        let tokenized: Vec<Vec<String>> = docs.iter().map(|d| tokenize(d.as_ref())).collect();

        let vocabulary: Vec<String> = tokenized
            .iter()
            .flatten()
            .cloned()
            .sorted()
            .dedup()
            .collect();
        if vocabulary.is_empty() {
            return Err(ClusteringError::EmptyVocabulary);
        }
        let index: HashMap<&str, usize> = vocabulary
            .iter()
            .enumerate()
            .map(|(i, t)| (t.as_str(), i))
            .collect();

        let mut doc_freq = vec![0usize; vocabulary.len()];
        for tokens in &tokenized {
            for term in tokens.iter().map(String::as_str).unique() {
                doc_freq[index[term]] += 1;
            }
        }

        let n = docs.len() as f64;
        let idf: Vec<f64> = doc_freq
            .iter()
            .map(|&df| ((1.0 + n) / (1.0 + df as f64)).ln() + 1.0)
            .collect();

        let rows = tokenized
            .iter()
            .map(|tokens| {
                let mut row = vec![0.0; vocabulary.len()];
                for term in tokens {
                    row[index[term.as_str()]] += 1.0;
                }
                for (w, idf) in row.iter_mut().zip(&idf) {
                    *w *= idf;
                }
                let norm = row.iter().map(|w| w * w).sum::<f64>().sqrt();
                if norm > 0.0 {
                    row.iter_mut().for_each(|w| *w /= norm);
                }
                row
            })
            .collect();

        Ok(TfidfMatrix { vocabulary, rows })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tokenize_drops_stop_words_and_short_tokens() {
        assert_eq!(
            tokenize("I am SO tired of work, a new job?"),
            vec!["tired", "work", "new", "job"]
        );
    }

    #[test]
    fn test_all_stop_words_is_empty_vocabulary() {
        let docs = ["I am here", "it is what it is"];
        assert_eq!(
            TfidfVectorizer::new().fit_transform(&docs),
            Err(ClusteringError::EmptyVocabulary)
        );
    }

    #[test]
    fn test_rows_are_unit_length() {
        let docs = ["money stress money", "sleep health", "empty"];
        let matrix = TfidfVectorizer::new().fit_transform(&docs).unwrap();
        assert_eq!(matrix.n_docs(), 3);
        for row in &matrix.rows {
            let norm: f64 = row.iter().map(|w| w * w).sum::<f64>().sqrt();
            assert!((norm - 1.0).abs() < 1e-9);
        }
    }

    #[test]
    fn test_vocabulary_sorted() {
        let docs = ["zebra apple", "mango"];
        let matrix = TfidfVectorizer::new().fit_transform(&docs).unwrap();
        assert_eq!(matrix.vocabulary, vec!["apple", "mango", "zebra"]);
    }

    #[test]
    fn test_rare_terms_weigh_more() {
        let docs = ["work deadline", "work family", "work sleep"];
        let matrix = TfidfVectorizer::new().fit_transform(&docs).unwrap();
        assert_eq!(matrix.top_terms(0, 1), vec!["deadline"]);
    }
}
