//! HTTP transport seam.
//!
//! The chat and embeddings clients only ever see [`HttpTransport`]; production
//! uses [`ReqwestTransport`], tests plug in a scripted in-memory double.

use std::fmt;
use std::time::Duration;

use futures::{StreamExt, future::BoxFuture, stream::BoxStream};
use reqwest::{StatusCode, header};
use serde_json::Value;
use tracing::debug;

use crate::error_handler::{LlmError, Result};

/// Incrementally delivered response body.
pub type ByteStream = BoxStream<'static, Result<Vec<u8>>>;

/// Connect timeout only; overall request duration is bounded by the caller's
/// cancellation token.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(15);

/// One JSON POST.
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub url: String,
    /// Sent as `Authorization: Bearer ...` when non-blank.
    pub api_key: Option<String>,
    pub body: Value,
}

/// Status plus an unread body stream.
pub struct HttpReply {
    pub status: StatusCode,
    pub body: ByteStream,
}

impl fmt::Debug for HttpReply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpReply")
            .field("status", &self.status)
            .finish_non_exhaustive()
    }
}

impl HttpReply {
    /// Drains the body into a string (lossy UTF-8).
    pub async fn text(mut self) -> Result<String> {
        let mut buf = Vec::new();
        while let Some(chunk) = self.body.next().await {
            buf.extend_from_slice(&chunk?);
        }
        Ok(String::from_utf8_lossy(&buf).into_owned())
    }
}

/// Posts JSON and hands back the raw reply.
pub trait HttpTransport: Send + Sync {
    fn post<'a>(&'a self, req: HttpRequest) -> BoxFuture<'a, Result<HttpReply>>;
}

/// `reqwest`-backed transport.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    /// Builds a client with JSON default headers.
    ///
    /// # Errors
    /// [`LlmError::Transport`] if the TLS backend cannot be initialised.
    pub fn new() -> Result<Self> {
        let mut headers = header::HeaderMap::new();
        headers.insert(
            header::CONTENT_TYPE,
            header::HeaderValue::from_static("application/json"),
        );
        let client = reqwest::Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .default_headers(headers)
            .build()?;
        Ok(Self { client })
    }

    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

impl HttpTransport for ReqwestTransport {
    fn post<'a>(&'a self, req: HttpRequest) -> BoxFuture<'a, Result<HttpReply>> {
        Box::pin(async move {
            let mut builder = self.client.post(&req.url).json(&req.body);
            if let Some(key) = req.api_key.as_deref().map(str::trim).filter(|k| !k.is_empty()) {
                builder = builder.bearer_auth(key);
            }

            debug!(url = %req.url, "POST");
            let resp = builder.send().await?;
            let status = resp.status();
            let body = resp
                .bytes_stream()
                .map(|chunk| chunk.map(|b| b.to_vec()).map_err(LlmError::from))
                .boxed();
            Ok(HttpReply { status, body })
        })
    }
}
