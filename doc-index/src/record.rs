//! Core data models used by the library.

use std::collections::{HashMap, HashSet};

use serde::Serialize;

/// Per-chunk term statistics, derived once at index build time.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ChunkStats {
    pub index: usize,
    pub token_count: usize,
    pub term_freq: HashMap<String, u32>,
    pub unique_terms: HashSet<String>,
}

/// A chunk with its fused relevance score.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct ScoredChunk {
    pub index: usize,
    pub fused_score: f32,
}

/// Lifecycle of a document's chunk embeddings.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingState {
    /// Never requested.
    Unset,
    /// A computation is in flight; callers await it.
    Pending,
    /// Vectors are present for every chunk.
    Ready,
    /// Computation failed; not retried for this document.
    Failed,
}
