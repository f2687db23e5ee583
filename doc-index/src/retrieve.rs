//! Retrieval signals over one [`DocumentIndex`].

use tracing::trace;

use crate::{bm25::bm25_scores, document::DocumentIndex, lexical::query_terms};

impl DocumentIndex {
    /// BM25 score of every chunk against `query`, in chunk order.
    pub fn lexical_scores(&self, query: &str) -> Vec<f32> {
        let terms = query_terms(query);
        trace!(
            "retrieve::lexical_scores id={} terms={} chunks={}",
            self.id(),
            terms.len(),
            self.len()
        );
        bm25_scores(self.lexical(), &terms)
    }
}

/// Min-max normalization into `[0, 1]`.
///
/// A constant vector maps to all zeros when its value is zero and all ones
/// otherwise. Non-finite entries count as zero.
pub fn min_max_normalize(scores: &[f32]) -> Vec<f32> {
    let clean: Vec<f32> = scores
        .iter()
        .map(|s| if s.is_finite() { *s } else { 0.0 })
        .collect();
    let Some(min) = clean.iter().copied().reduce(f32::min) else {
        return Vec::new();
    };
    let max = clean.iter().copied().fold(min, f32::max);
    let range = max - min;
    if range <= f32::EPSILON {
        let fill = if max > 0.0 { 1.0 } else { 0.0 };
        return vec![fill; clean.len()];
    }
    clean.iter().map(|s| (s - min) / range).collect()
}
