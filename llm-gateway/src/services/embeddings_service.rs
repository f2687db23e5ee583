//! Embeddings client for OpenAI-compatible `/embeddings` endpoints.
//!
//! Accepts both the OpenAI shape (`data[].embedding` with `index`) and
//! Ollama's `embeddings: [[...]]`.

use std::sync::Arc;
use std::time::Instant;

use serde::{Deserialize, Serialize};
use tracing::{debug, error, info};

use crate::{
    error_handler::{LlmError, Result, make_snippet, validate_http_endpoint},
    transport::{HttpRequest, HttpTransport, ReqwestTransport},
};

/// Embedding endpoint settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmbeddingConfig {
    /// Full embeddings URL (e.g. `https://api.openai.com/v1/embeddings`).
    pub endpoint: String,
    pub model: String,
    pub api_key: Option<String>,
}

/// Batch embeddings client.
pub struct EmbeddingsClient {
    transport: Arc<dyn HttpTransport>,
    cfg: EmbeddingConfig,
}

impl EmbeddingsClient {
    /// # Errors
    /// [`crate::ConfigError::InvalidFormat`] when the endpoint is not http(s).
    pub fn new(transport: Arc<dyn HttpTransport>, cfg: EmbeddingConfig) -> Result<Self> {
        validate_http_endpoint("EMBEDDING_URL", cfg.endpoint.trim())?;
        info!(model = %cfg.model, endpoint = %cfg.endpoint, "EmbeddingsClient initialized");
        Ok(Self { transport, cfg })
    }

    /// Client over a fresh `reqwest` transport.
    pub fn with_reqwest(cfg: EmbeddingConfig) -> Result<Self> {
        Self::new(Arc::new(ReqwestTransport::new()?), cfg)
    }

    pub fn config(&self) -> &EmbeddingConfig {
        &self.cfg
    }

    /// Embeds `inputs` in one request; vectors come back in input order.
    ///
    /// # Errors
    /// - [`LlmError::HttpStatus`] for non-2xx responses
    /// - [`LlmError::Transport`] for network failures
    /// - [`LlmError::Decode`] for an unreadable body or a vector count mismatch
    pub async fn embed_batch(&self, inputs: &[String]) -> Result<Vec<Vec<f32>>> {
        if inputs.is_empty() {
            return Ok(Vec::new());
        }
        let started = Instant::now();
        let body = serde_json::to_value(EmbeddingsRequest {
            model: &self.cfg.model,
            input: inputs,
        })
        .map_err(|e| LlmError::Decode(format!("cannot encode embeddings request: {e}")))?;

        debug!(model = %self.cfg.model, inputs = inputs.len(), "POST {}", self.cfg.endpoint);

        let reply = self
            .transport
            .post(HttpRequest {
                url: self.cfg.endpoint.clone(),
                api_key: self.cfg.api_key.clone(),
                body,
            })
            .await?;
        let status = reply.status;
        let text = reply.text().await?;

        if !status.is_success() {
            error!(
                %status,
                url = %self.cfg.endpoint,
                snippet = %make_snippet(&text),
                latency_ms = started.elapsed().as_millis() as u64,
                "embeddings endpoint returned non-success status"
            );
            return Err(LlmError::HttpStatus {
                status,
                url: self.cfg.endpoint.clone(),
                body: text,
            });
        }

        let out: EmbeddingsResponse = serde_json::from_str(&text).map_err(|e| {
            LlmError::Decode(format!(
                "serde error: {e}; expected `data[].embedding`: {}",
                make_snippet(&text)
            ))
        })?;
        let vectors = out.into_vectors();
        if vectors.len() != inputs.len() {
            return Err(LlmError::Decode(format!(
                "expected {} embeddings, got {}",
                inputs.len(),
                vectors.len()
            )));
        }

        info!(
            model = %self.cfg.model,
            inputs = inputs.len(),
            latency_ms = started.elapsed().as_millis() as u64,
            "embeddings completed"
        );
        Ok(vectors)
    }
}

#[derive(Debug, Serialize)]
struct EmbeddingsRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Debug, Deserialize)]
struct EmbeddingsResponse {
    #[serde(default)]
    data: Vec<EmbeddingItem>,
    #[serde(default)]
    embeddings: Vec<Vec<f32>>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingItem {
    #[serde(default)]
    index: usize,
    embedding: Vec<f32>,
}

impl EmbeddingsResponse {
    fn into_vectors(self) -> Vec<Vec<f32>> {
        if self.data.is_empty() {
            return self.embeddings;
        }
        let mut data = self.data;
        data.sort_by_key(|item| item.index);
        data.into_iter().map(|item| item.embedding).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{MockTransport, Scripted};
    use serde_json::json;

    fn cfg() -> EmbeddingConfig {
        EmbeddingConfig {
            endpoint: "https://api.openai.com/v1/embeddings".into(),
            model: "text-embedding-3-small".into(),
            api_key: Some("sk".into()),
        }
    }

    #[tokio::test]
    async fn orders_vectors_by_index() {
        let transport = Arc::new(MockTransport::new(|_| {
            Scripted::ok(vec![
                json!({"data":[
                    {"index":1,"embedding":[0.0,1.0]},
                    {"index":0,"embedding":[1.0,0.0]}
                ]})
                .to_string(),
            ])
        }));
        let client = EmbeddingsClient::new(transport.clone(), cfg()).unwrap();

        let out = client
            .embed_batch(&["a".to_string(), "b".to_string()])
            .await
            .unwrap();
        assert_eq!(out, vec![vec![1.0, 0.0], vec![0.0, 1.0]]);
        assert_eq!(
            transport.bodies()[0],
            json!({"model":"text-embedding-3-small","input":["a","b"]})
        );
    }

    #[tokio::test]
    async fn accepts_ollama_shape_and_rejects_count_mismatch() {
        let transport = Arc::new(MockTransport::new(|_| {
            Scripted::ok(vec![json!({"embeddings":[[0.5]]}).to_string()])
        }));
        let client = EmbeddingsClient::new(transport, cfg()).unwrap();
        assert_eq!(client.embed_batch(&["x".to_string()]).await.unwrap(), vec![vec![0.5]]);
        assert!(matches!(
            client.embed_batch(&["x".to_string(), "y".to_string()]).await,
            Err(LlmError::Decode(_))
        ));
    }

    #[tokio::test]
    async fn http_errors_carry_status() {
        let transport = Arc::new(MockTransport::new(|_| Scripted::status(404, "no such model")));
        let client = EmbeddingsClient::new(transport, cfg()).unwrap();
        let err = client.embed_batch(&["x".to_string()]).await.unwrap_err();
        assert_eq!(err.status().map(|s| s.as_u16()), Some(404));
        assert!(client.embed_batch(&[]).await.unwrap().is_empty());
    }
}
