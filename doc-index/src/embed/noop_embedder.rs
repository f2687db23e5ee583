use crate::{EmbeddingsProvider, IndexError};
use std::{future::Future, pin::Pin};

/// Provider used when no embedding endpoint is configured; retrieval stays lexical.
#[derive(Clone, Debug, Default)]
pub struct NoopEmbedder;

impl EmbeddingsProvider for NoopEmbedder {
    fn embed_batch<'a>(
        &'a self,
        _texts: &'a [String],
    ) -> Pin<Box<dyn Future<Output = Result<Vec<Vec<f32>>, IndexError>> + Send + 'a>> {
        Box::pin(async { Err(IndexError::Unavailable) })
    }
}
