use crate::errors::IndexError;
use std::{future::Future, pin::Pin};

/// Provider interface for embedding generation.
///
/// Async because real providers perform HTTP requests. Implement this trait
/// to plug in a backend (OpenAI-compatible endpoint, Ollama, local model).
pub trait EmbeddingsProvider: Send + Sync {
    /// Embeds `texts`, returning one vector per input in input order.
    fn embed_batch<'a>(
        &'a self,
        texts: &'a [String],
    ) -> Pin<Box<dyn Future<Output = Result<Vec<Vec<f32>>, IndexError>> + Send + 'a>>;
}

pub mod noop_embedder;
