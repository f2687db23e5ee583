//! Streaming LLM gateway.
//!
//! - [`config`]: endpoint profiles, provider detection, wire-format detection.
//! - [`reasoning`]: per-provider reasoning profile table.
//! - [`payload`]: chat-completions / responses request bodies.
//! - [`fallback`]: learned temperature and reasoning fallbacks.
//! - [`stream`]: incremental SSE parsing with in-band `<thought>` splitting.
//! - [`services`]: [`ChatClient`] and [`EmbeddingsClient`] on top of an
//!   injectable [`HttpTransport`].

pub mod config;
pub mod error_handler;
pub mod fallback;
pub mod messages;
pub mod payload;
pub mod reasoning;
pub mod services;
pub mod stream;
pub mod telemetry;
pub mod transport;

#[cfg(test)]
pub(crate) mod test_support;

pub use config::endpoint_profile::EndpointProfile;
pub use config::llm_provider::LlmProvider;
pub use config::wire::WireFormat;
pub use error_handler::{ConfigError, LlmError, Result};
pub use fallback::store::{
    FallbackMode, FallbackPolicy, InMemoryPolicyStore, PolicyKey, PolicyStore,
};
pub use messages::{ChatTurn, ContentPart, Role, TurnContent};
pub use reasoning::{ReasoningLevel, ReasoningSelection};
pub use services::chat_service::{ChatClient, Completion, CompletionRequest};
pub use services::embeddings_service::{EmbeddingConfig, EmbeddingsClient};
pub use stream::{CollectingSink, FnSink, NoopSink, ReasoningEvent, StreamSink};
pub use transport::{HttpReply, HttpRequest, HttpTransport, ReqwestTransport};

pub use tokio_util::sync::CancellationToken;
