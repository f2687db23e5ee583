//! Embedding cache: batched chunk embedding with single-flight semantics.
//!
//! Concurrent callers for the same document share one in-flight computation
//! (the document's `OnceCell`). A failure is remembered for the document's
//! lifetime and never retried.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use futures::stream::{self, StreamExt, TryStreamExt};
use tracing::{debug, info, warn};

use crate::{
    document::{ChunkVectors, DocumentIndex},
    embed::EmbeddingsProvider,
    errors::IndexError,
};

/// Clears the pending flag even if the computing future is dropped.
struct PendingGuard<'a>(&'a AtomicBool);

impl<'a> PendingGuard<'a> {
    fn set(flag: &'a AtomicBool) -> Self {
        flag.store(true, Ordering::Release);
        Self(flag)
    }
}

impl Drop for PendingGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl DocumentIndex {
    /// Makes sure every chunk has a vector. `true` iff usable embeddings are present.
    ///
    /// Never fails: provider errors are logged and turn the document's state
    /// into `Failed`.
    pub async fn ensure_embeddings(&self, provider: &dyn EmbeddingsProvider) -> bool {
        let slot = self
            .embeddings
            .get_or_init(|| async {
                let _pending = PendingGuard::set(&self.pending);
                match embed_chunks(self.chunks(), self.embed_batch, provider).await {
                    Ok(vectors) => {
                        info!(
                            "embed_pool::ensure_embeddings id={} chunks={}",
                            self.id(),
                            vectors.len()
                        );
                        Some(Arc::new(vectors))
                    }
                    Err(e) => {
                        warn!(
                            "embed_pool::ensure_embeddings id={} failed, lexical only from now on: {e}",
                            self.id()
                        );
                        None
                    }
                }
            })
            .await;
        slot.is_some()
    }

    /// Cosine similarity of every chunk to `query`, or `None` when embeddings
    /// are unavailable for this document or the query cannot be embedded.
    pub async fn semantic_scores(
        &self,
        provider: &dyn EmbeddingsProvider,
        query: &str,
    ) -> Option<Vec<f32>> {
        if !self.ensure_embeddings(provider).await {
            return None;
        }
        let vectors: ChunkVectors = self.embeddings()?;

        let query_vec = match provider.embed_batch(&[query.to_string()]).await {
            Ok(mut v) if v.len() == 1 => v.pop()?,
            Ok(v) => {
                warn!("embed_pool::semantic_scores query returned {} vectors", v.len());
                return None;
            }
            Err(e) => {
                warn!("embed_pool::semantic_scores query embedding failed: {e}");
                return None;
            }
        };

        Some(vectors.iter().map(|v| cosine_similarity(v, &query_vec)).collect())
    }
}

/// Embeds `chunks` in order, `batch` at a time.
async fn embed_chunks(
    chunks: &[String],
    batch: usize,
    provider: &dyn EmbeddingsProvider,
) -> Result<Vec<Vec<f32>>, IndexError> {
    if chunks.is_empty() {
        return Ok(Vec::new());
    }
    debug!(
        "embed_pool::embed_chunks chunks={} batch={batch}",
        chunks.len()
    );

    let batches: Vec<Vec<Vec<f32>>> = stream::iter(chunks.chunks(batch.max(1)))
        .then(|group| async move {
            let vectors = provider.embed_batch(group).await?;
            if vectors.len() != group.len() {
                return Err(IndexError::VectorCountMismatch {
                    got: vectors.len(),
                    want: group.len(),
                });
            }
            Ok(vectors)
        })
        .try_collect()
        .await?;

    Ok(batches.into_iter().flatten().collect())
}

/// Cosine similarity; `0.0` for empty, mismatched or zero-norm vectors.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.is_empty() || a.len() != b.len() {
        return 0.0;
    }
    let (mut dot, mut na, mut nb) = (0.0f64, 0.0f64, 0.0f64);
    for (x, y) in a.iter().zip(b) {
        let (x, y) = (f64::from(*x), f64::from(*y));
        dot += x * y;
        na += x * x;
        nb += y * y;
    }
    if na == 0.0 || nb == 0.0 {
        return 0.0;
    }
    let sim = dot / (na.sqrt() * nb.sqrt());
    if sim.is_finite() { sim as f32 } else { 0.0 }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{config::IndexConfig, embed::noop_embedder::NoopEmbedder, record::EmbeddingState};
    use std::future::Future;
    use std::pin::Pin;
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;

    /// Embeds text as `[len, vowel count]` and counts calls.
    #[derive(Default)]
    struct CountingEmbedder {
        calls: AtomicUsize,
        fail: bool,
    }

    impl EmbeddingsProvider for CountingEmbedder {
        fn embed_batch<'a>(
            &'a self,
            texts: &'a [String],
        ) -> Pin<Box<dyn Future<Output = Result<Vec<Vec<f32>>, IndexError>> + Send + 'a>> {
            Box::pin(async move {
                self.calls.fetch_add(1, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(10)).await;
                if self.fail {
                    return Err(IndexError::Provider("boom".into()));
                }
                Ok(texts
                    .iter()
                    .map(|t| {
                        let vowels = t.chars().filter(|c| "aeiou".contains(*c)).count();
                        vec![t.len() as f32, vowels as f32]
                    })
                    .collect())
            })
        }
    }

    fn doc(n: usize) -> DocumentIndex {
        let text: Vec<String> = (0..n).map(|i| format!("paragraph number {i}")).collect();
        let cfg = IndexConfig {
            chunk_size: 20,
            chunk_overlap: 0,
            embed_batch: 16,
        };
        DocumentIndex::build("doc", "T", &text.join("\n\n"), cfg)
    }

    #[tokio::test]
    async fn concurrent_callers_share_one_computation() {
        let d = doc(40);
        assert_eq!(d.len(), 40);
        let provider = CountingEmbedder::default();

        let (a, b, c) = tokio::join!(
            d.ensure_embeddings(&provider),
            d.ensure_embeddings(&provider),
            d.ensure_embeddings(&provider)
        );
        assert!(a && b && c);
        // 40 chunks in batches of 16
        assert_eq!(provider.calls.load(Ordering::SeqCst), 3);
        assert_eq!(d.embedding_state(), EmbeddingState::Ready);
        assert_eq!(d.embeddings().map(|v| v.len()), Some(40));

        assert!(d.ensure_embeddings(&provider).await);
        assert_eq!(provider.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn failure_is_permanent() {
        let d = doc(3);
        let provider = CountingEmbedder {
            fail: true,
            ..Default::default()
        };
        assert!(!d.ensure_embeddings(&provider).await);
        assert!(!d.ensure_embeddings(&provider).await);
        assert_eq!(provider.calls.load(Ordering::SeqCst), 1);
        assert_eq!(d.embedding_state(), EmbeddingState::Failed);
        assert!(d.semantic_scores(&provider, "query").await.is_none());
    }

    #[tokio::test]
    async fn semantic_scores_cover_every_chunk() {
        let d = doc(5);
        let scores = d
            .semantic_scores(&CountingEmbedder::default(), "paragraph number 3")
            .await
            .unwrap();
        assert_eq!(scores.len(), 5);
        assert!(scores.iter().all(|s| (-1.0..=1.0001).contains(s)));
        // chunk vectors are cached, but the query itself cannot be embedded
        assert!(d.semantic_scores(&NoopEmbedder, "x").await.is_none());
        assert_eq!(d.embedding_state(), EmbeddingState::Ready);

        let fresh = doc(2);
        assert!(fresh.semantic_scores(&NoopEmbedder, "x").await.is_none());
        assert_eq!(fresh.embedding_state(), EmbeddingState::Failed);
    }

    #[test]
    fn cosine_edge_cases() {
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 0.0]), 0.0);
        assert_eq!(cosine_similarity(&[], &[]), 0.0);
        assert_eq!(cosine_similarity(&[1.0], &[1.0, 2.0]), 0.0);
        assert!((cosine_similarity(&[1.0, 1.0], &[2.0, 2.0]) - 1.0).abs() < 1e-6);
    }
}
