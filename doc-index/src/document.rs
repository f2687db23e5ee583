//! Per-document index: chunks, lexical statistics and the embedding slot.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::OnceCell;
use tracing::debug;

use crate::{
    chunker::chunk_text,
    config::IndexConfig,
    lexical::LexicalIndex,
    record::{ChunkStats, EmbeddingState},
};

/// Chunk vectors, one per chunk in chunk order.
pub type ChunkVectors = Arc<Vec<Vec<f32>>>;

/// Index of one source document, alive for that document's session.
///
/// Everything except the embedding slot is fixed at build time. The slot is
/// filled at most once: `Some` on success, `None` after a failure.
#[derive(Debug)]
pub struct DocumentIndex {
    id: String,
    title: String,
    chunks: Vec<String>,
    lexical: LexicalIndex,
    full_length: usize,
    pub(crate) embed_batch: usize,
    pub(crate) embeddings: OnceCell<Option<ChunkVectors>>,
    pub(crate) pending: AtomicBool,
}

impl DocumentIndex {
    /// Chunks `text` and builds lexical statistics.
    pub fn build(
        id: impl Into<String>,
        title: impl Into<String>,
        text: &str,
        cfg: IndexConfig,
    ) -> Self {
        let cfg = cfg.sanitized();
        let chunks = chunk_text(text, cfg.chunk_size, cfg.chunk_overlap);
        let lexical = LexicalIndex::build(&chunks);
        let id = id.into();
        debug!(
            "DocumentIndex::build id={id} chars={} chunks={}",
            text.chars().count(),
            chunks.len()
        );
        Self {
            id,
            title: title.into(),
            full_length: text.chars().count(),
            chunks,
            lexical,
            embed_batch: cfg.embed_batch,
            embeddings: OnceCell::new(),
            pending: AtomicBool::new(false),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn chunks(&self) -> &[String] {
        &self.chunks
    }

    pub fn stats(&self) -> &[ChunkStats] {
        &self.lexical.stats
    }

    pub fn lexical(&self) -> &LexicalIndex {
        &self.lexical
    }

    /// Character length of the source text.
    pub fn full_length(&self) -> usize {
        self.full_length
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    /// Chunk vectors, if they were computed successfully.
    pub fn embeddings(&self) -> Option<ChunkVectors> {
        self.embeddings.get().cloned().flatten()
    }

    pub fn embedding_state(&self) -> EmbeddingState {
        match self.embeddings.get() {
            Some(Some(_)) => EmbeddingState::Ready,
            Some(None) => EmbeddingState::Failed,
            None if self.pending.load(Ordering::Acquire) => EmbeddingState::Pending,
            None => EmbeddingState::Unset,
        }
    }
}
