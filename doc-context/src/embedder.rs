//! Bridges the gateway's embeddings client into the index's provider trait.

use std::{future::Future, pin::Pin, sync::Arc};

use doc_index::{EmbeddingsProvider, IndexError};
use llm_gateway::EmbeddingsClient;

/// [`EmbeddingsProvider`] backed by an [`EmbeddingsClient`].
#[derive(Clone)]
pub struct GatewayEmbedder {
    client: Arc<EmbeddingsClient>,
}

impl GatewayEmbedder {
    pub fn new(client: Arc<EmbeddingsClient>) -> Self {
        Self { client }
    }
}

impl EmbeddingsProvider for GatewayEmbedder {
    fn embed_batch<'a>(
        &'a self,
        texts: &'a [String],
    ) -> Pin<Box<dyn Future<Output = Result<Vec<Vec<f32>>, IndexError>> + Send + 'a>> {
        Box::pin(async move {
            self.client
                .embed_batch(texts)
                .await
                .map_err(|e| IndexError::Provider(e.user_message()))
        })
    }
}
