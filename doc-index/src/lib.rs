//! In-memory, per-document retrieval index.
//!
//! This crate provides:
//! - Paragraph-aware chunking with overlapping windows for long paragraphs
//! - A lexical index and BM25 scoring
//! - A lazily filled, single-flight embedding cache with cosine scoring
//! - [`DocumentRegistry`], the session store of built indexes
//!
//! One document is indexed at a time and nothing is persisted.

mod bm25;
mod chunker;
mod config;
mod document;
mod embed;
mod embed_pool;
mod errors;
mod lexical;
mod normalize;
mod record;
mod retrieve;

pub use bm25::{B, K1, bm25_scores, idf};
pub use chunker::chunk_text;
pub use config::{DEFAULT_CHUNK_OVERLAP, DEFAULT_CHUNK_SIZE, DEFAULT_EMBED_BATCH, IndexConfig};
pub use document::{ChunkVectors, DocumentIndex};
pub use embed::{EmbeddingsProvider, noop_embedder::NoopEmbedder};
pub use embed_pool::cosine_similarity;
pub use errors::IndexError;
pub use lexical::{LexicalIndex, query_terms, tokenize};
pub use record::{ChunkStats, EmbeddingState, ScoredChunk};
pub use retrieve::min_max_normalize;

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use tracing::{debug, trace};

/// Session-scoped store of document indexes, keyed by document id.
///
/// Indexes are built on first access and shared as `Arc`s, so the embedding
/// state of a document survives across questions about it.
#[derive(Debug, Default)]
pub struct DocumentRegistry {
    cfg: IndexConfig,
    docs: RwLock<HashMap<String, Arc<DocumentIndex>>>,
}

impl DocumentRegistry {
    pub fn new(cfg: IndexConfig) -> Self {
        Self {
            cfg,
            docs: RwLock::new(HashMap::new()),
        }
    }

    pub fn config(&self) -> IndexConfig {
        self.cfg
    }

    /// Returns the index for `id`, building it from `text` if absent.
    ///
    /// An existing index is reused as is; `text` is ignored in that case.
    pub fn get_or_build(&self, id: &str, title: &str, text: &str) -> Arc<DocumentIndex> {
        if let Some(doc) = self.get(id) {
            trace!("DocumentRegistry::get_or_build hit id={id}");
            return doc;
        }

        // Built outside the lock; a racing builder loses and its index is dropped.
        let built = Arc::new(DocumentIndex::build(id, title, text, self.cfg));
        let mut docs = self.docs.write().unwrap_or_else(PoisonError::into_inner);
        let doc = docs.entry(id.to_string()).or_insert(built).clone();
        debug!(
            "DocumentRegistry::get_or_build id={id} chunks={} docs={}",
            doc.len(),
            docs.len()
        );
        doc
    }

    pub fn get(&self, id: &str) -> Option<Arc<DocumentIndex>> {
        self.docs
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(id)
            .cloned()
    }

    /// Drops the index for `id`; in-flight users keep their `Arc`.
    pub fn remove(&self, id: &str) -> Option<Arc<DocumentIndex>> {
        self.docs
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(id)
    }

    pub fn clear(&self) {
        self.docs
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    pub fn len(&self) -> usize {
        self.docs.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
