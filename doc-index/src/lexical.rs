//! Tokenizer and lexical index (term statistics per chunk plus corpus document frequency).

use std::collections::{HashMap, HashSet};

use tracing::trace;

use crate::record::ChunkStats;

/// Tokens shorter than this are dropped.
pub const MIN_TOKEN_CHARS: usize = 3;

/// English function words with no retrieval value.
const STOP_WORDS: &[&str] = &[
    "about", "above", "after", "again", "against", "all", "also", "and", "any", "are", "because",
    "been", "before", "being", "below", "between", "both", "but", "can", "could", "did", "does",
    "doing", "down", "during", "each", "few", "for", "from", "further", "had", "has", "have",
    "having", "her", "here", "hers", "herself", "him", "himself", "his", "how", "into", "its",
    "itself", "just", "more", "most", "not", "now", "off", "once", "only", "other", "our", "ours",
    "ourselves", "out", "over", "own", "same", "she", "should", "some", "such", "than", "that",
    "the", "their", "theirs", "them", "themselves", "then", "there", "these", "they", "this",
    "those", "through", "too", "under", "until", "very", "was", "were", "what", "when", "where",
    "which", "while", "who", "whom", "why", "will", "with", "would", "you", "your", "yours",
    "yourself", "yourselves",
];

fn is_stop_word(token: &str) -> bool {
    STOP_WORDS.binary_search(&token).is_ok()
}

/// Lowercased alphanumeric runs of at least [`MIN_TOKEN_CHARS`] characters, stop words removed.
pub fn tokenize(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|run| run.chars().count() >= MIN_TOKEN_CHARS)
        .map(str::to_lowercase)
        .filter(|t| !is_stop_word(t))
        .collect()
}

/// Tokenized query with duplicates removed, first occurrence order kept.
pub fn query_terms(text: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    tokenize(text)
        .into_iter()
        .filter(|t| seen.insert(t.clone()))
        .collect()
}

/// Term statistics for a whole chunk sequence.
#[derive(Clone, Debug, Default)]
pub struct LexicalIndex {
    pub stats: Vec<ChunkStats>,
    /// Number of chunks containing each term at least once.
    pub doc_freq: HashMap<String, usize>,
    /// Mean token count per chunk.
    pub avg_len: f64,
}

impl LexicalIndex {
    /// Pure function of `chunks`.
    pub fn build(chunks: &[String]) -> Self {
        let mut stats = Vec::with_capacity(chunks.len());
        let mut doc_freq: HashMap<String, usize> = HashMap::new();
        let mut total_tokens = 0usize;

        for (index, chunk) in chunks.iter().enumerate() {
            let tokens = tokenize(chunk);
            let mut term_freq: HashMap<String, u32> = HashMap::new();
            for t in &tokens {
                *term_freq.entry(t.clone()).or_default() += 1;
            }
            let unique_terms: HashSet<String> = term_freq.keys().cloned().collect();
            for term in &unique_terms {
                *doc_freq.entry(term.clone()).or_default() += 1;
            }
            total_tokens += tokens.len();
            stats.push(ChunkStats {
                index,
                token_count: tokens.len(),
                term_freq,
                unique_terms,
            });
        }

        let avg_len = if chunks.is_empty() {
            0.0
        } else {
            total_tokens as f64 / chunks.len() as f64
        };
        trace!(
            "lexical::build chunks={} terms={} avg_len={avg_len:.1}",
            chunks.len(),
            doc_freq.len()
        );
        Self {
            stats,
            doc_freq,
            avg_len,
        }
    }

    pub fn len(&self) -> usize {
        self.stats.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stats.is_empty()
    }
}
