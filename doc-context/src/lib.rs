//! Document question answering on top of `doc-index` and `llm-gateway`.
//!
//! Public API: [`ask`]. It indexes the document (or reuses the session's
//! index), builds a bounded context (whole document when it fits, otherwise
//! fused BM25 + embedding excerpts), composes the chat messages and streams
//! the model's answer into the caller's sink.

mod api_types;
mod cfg;
mod embedder;
mod error;
mod prompt;
mod retrieve;
mod select;

#[cfg(test)]
mod test_support;

pub use api_types::{AskOutcome, AskRequest, BuiltContext, ContextMode, RetrievalQuery};
pub use cfg::{
    DEFAULT_CHAR_BUDGET, DEFAULT_FULL_CONTEXT_MAX_CHARS, DEFAULT_HISTORY_TURNS,
    DEFAULT_IMAGE_CHAR_BUDGET, DEFAULT_MAX_EXCERPTS, RetrievalConfig,
};
pub use embedder::GatewayEmbedder;
pub use error::ContextError;
pub use prompt::{DEFAULT_SYSTEM, compose_messages, render_excerpts, render_full};
pub use retrieve::build_context;
pub use select::{fuse_scores, pad_neighbors, select_ranked};

use std::time::Instant;

use doc_index::{DocumentRegistry, EmbeddingsProvider};
use llm_gateway::{
    CancellationToken, ChatClient, Completion, CompletionRequest, ReasoningEvent, StreamSink,
};
use tracing::{debug, info, instrument};

fn cancelled_outcome() -> AskOutcome {
    AskOutcome {
        cancelled: true,
        ..AskOutcome::default()
    }
}

/// Answers `req.question` about `req.doc_id`, streaming into `sink`.
///
/// A fired `cancel` token resolves to `Ok` with `cancelled = true`, whether
/// it fires during retrieval, before the request or mid-stream.
///
/// # Errors
/// [`ContextError::EmptyQuestion`] for a blank question; otherwise whatever
/// the gateway surfaces after its fallbacks (config, HTTP status, transport).
#[instrument(skip_all, fields(doc = %req.doc_id, model = %req.profile.model))]
pub async fn ask(
    req: &AskRequest,
    chat: &ChatClient,
    registry: &DocumentRegistry,
    embedder: &dyn EmbeddingsProvider,
    sink: &mut dyn StreamSink,
    cancel: &CancellationToken,
) -> Result<AskOutcome, ContextError> {
    let question = req.question.trim();
    if question.is_empty() {
        return Err(ContextError::EmptyQuestion);
    }
    if cancel.is_cancelled() {
        return Ok(cancelled_outcome());
    }
    let started = Instant::now();

    // 1) Index (built once per document id)
    let doc = registry.get_or_build(&req.doc_id, &req.title, &req.text);

    // 2) Context
    let query = RetrievalQuery::new(question, req.image_url.is_some());
    let context = tokio::select! {
        biased;
        _ = cancel.cancelled() => return Ok(cancelled_outcome()),
        ctx = build_context(&doc, &query, &req.retrieval, embedder) => ctx,
    };
    debug!(
        "ask context mode={:?} excerpts={:?} chars={}",
        context.mode,
        context.excerpts,
        context.text.chars().count()
    );

    // 3) Messages
    let messages = compose_messages(
        req.system_prompt.as_deref(),
        &context.text,
        &req.history,
        req.retrieval.history_turns,
        question,
        req.image_url.as_deref(),
    );
    let creq = CompletionRequest::new(req.profile.clone(), messages).with_reasoning(req.reasoning);

    // 4) Completion
    let completion = if req.stream {
        chat.stream(&creq, sink, cancel).await?
    } else {
        let completion = chat.complete(&creq, cancel).await?;
        replay(&completion, sink);
        completion
    };

    info!(
        latency_ms = started.elapsed().as_millis() as u64,
        mode = ?context.mode,
        excerpts = context.excerpts.len(),
        cancelled = completion.cancelled,
        "ask finished"
    );
    Ok(AskOutcome {
        answer: completion.text,
        reasoning: completion.reasoning,
        context_mode: Some(context.mode),
        excerpts: context.excerpts,
        cancelled: completion.cancelled,
    })
}

/// Reports a non-streamed completion through the sink as single events.
fn replay(completion: &Completion, sink: &mut dyn StreamSink) {
    if completion.cancelled {
        return;
    }
    if !completion.reasoning.is_empty() {
        sink.on_reasoning(&ReasoningEvent::details(completion.reasoning.clone()));
    }
    if !completion.text.is_empty() {
        sink.on_answer_delta(&completion.text);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{ScriptedTransport, all_message_text, chat_sse};
    use doc_index::{IndexConfig, NoopEmbedder};
    use llm_gateway::{
        CollectingSink, EmbeddingConfig, EmbeddingsClient, EndpointProfile, InMemoryPolicyStore,
    };
    use serde_json::json;
    use std::sync::Arc;

    const ENDPOINT: &str = "http://llm.test/v1/chat/completions";

    fn paper() -> String {
        (0..8)
            .map(|i| format!("Paragraph {i}: measurements of sample {i} at low temperature."))
            .collect::<Vec<_>>()
            .join("\n\n")
    }

    fn client(transport: Arc<ScriptedTransport>) -> ChatClient {
        ChatClient::new(transport, Arc::new(InMemoryPolicyStore::new()))
    }

    fn request(question: &str) -> AskRequest {
        AskRequest::new(
            "paper",
            "Cryogenics",
            paper(),
            question,
            EndpointProfile::new(ENDPOINT, "test-model"),
        )
    }

    #[tokio::test]
    async fn full_document_reaches_the_model() {
        let transport = Arc::new(ScriptedTransport::new(|_| (200, chat_sse(&["Low ", "temps."]))));
        let chat = client(transport.clone());
        let registry = DocumentRegistry::new(IndexConfig::default());
        let mut sink = CollectingSink::default();

        let out = ask(
            &request("What was measured?"),
            &chat,
            &registry,
            &NoopEmbedder,
            &mut sink,
            &CancellationToken::new(),
        )
        .await
        .unwrap();

        assert_eq!(out.answer, "Low temps.");
        assert_eq!(sink.answer(), "Low temps.");
        assert_eq!(out.context_mode, Some(ContextMode::Full));
        assert!(!out.cancelled);

        let body = &transport.requests()[0].body;
        let text = all_message_text(body);
        let mut pos = 0;
        for i in 0..8 {
            let needle = format!("Paragraph {i}:");
            let found = text[pos..].find(&needle).expect("paragraph missing");
            pos += found;
        }
        assert_eq!(body["messages"][0]["content"], json!(DEFAULT_SYSTEM));
        assert_eq!(body["messages"].as_array().map(Vec::len), Some(3));
        assert_eq!(registry.len(), 1);
    }

    #[tokio::test]
    async fn image_question_uses_capped_excerpts() {
        let transport = Arc::new(ScriptedTransport::new(|_| (200, chat_sse(&["ok"]))));
        let chat = client(transport.clone());
        let registry = DocumentRegistry::default();
        let mut sink = CollectingSink::default();
        let req = request("Which sample is in the figure?").with_image("https://img.test/fig.png");

        let out = ask(
            &req,
            &chat,
            &registry,
            &NoopEmbedder,
            &mut sink,
            &CancellationToken::new(),
        )
        .await
        .unwrap();

        assert_eq!(out.context_mode, Some(ContextMode::Retrieved));
        assert!(!out.excerpts.is_empty());
        assert!(out.excerpts.len() <= DEFAULT_MAX_EXCERPTS);

        let body = &transport.requests()[0].body;
        let last = body["messages"].as_array().and_then(|m| m.last()).cloned().unwrap();
        assert_eq!(last["content"][1]["image_url"]["url"], json!("https://img.test/fig.png"));
        assert!(all_message_text(body).contains("[Excerpt "));
    }

    #[tokio::test]
    async fn cancelled_before_start_sends_nothing() {
        let transport = Arc::new(ScriptedTransport::new(|_| (200, chat_sse(&["never"]))));
        let chat = client(transport.clone());
        let cancel = CancellationToken::new();
        cancel.cancel();

        let out = ask(
            &request("q"),
            &chat,
            &DocumentRegistry::default(),
            &NoopEmbedder,
            &mut CollectingSink::default(),
            &cancel,
        )
        .await
        .unwrap();
        assert!(out.cancelled);
        assert!(transport.requests().is_empty());
    }

    #[tokio::test]
    async fn blank_question_is_rejected() {
        let transport = Arc::new(ScriptedTransport::new(|_| (200, chat_sse(&["x"]))));
        let err = ask(
            &request("   "),
            &client(transport),
            &DocumentRegistry::default(),
            &NoopEmbedder,
            &mut CollectingSink::default(),
            &CancellationToken::new(),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ContextError::EmptyQuestion));
    }

    #[tokio::test]
    async fn http_errors_surface_with_status() {
        let transport = Arc::new(ScriptedTransport::new(|_| (500, vec!["upstream down".into()])));
        let err = ask(
            &request("q?"),
            &client(transport),
            &DocumentRegistry::default(),
            &NoopEmbedder,
            &mut CollectingSink::default(),
            &CancellationToken::new(),
        )
        .await
        .unwrap_err();
        assert!(!err.is_cancelled());
        assert!(err.user_message().contains("500"));
        assert!(err.user_message().contains("upstream down"));
    }

    #[tokio::test]
    async fn non_streaming_replays_into_sink() {
        let transport = Arc::new(ScriptedTransport::new(|_| {
            let body = json!({"choices":[{"message":{"content":"<thought>hmm</thought>Answer."}}]});
            (200, vec![body.to_string()])
        }));
        let mut sink = CollectingSink::default();
        let out = ask(
            &request("q?").with_stream(false),
            &client(transport.clone()),
            &DocumentRegistry::default(),
            &NoopEmbedder,
            &mut sink,
            &CancellationToken::new(),
        )
        .await
        .unwrap();

        assert_eq!(out.answer, "Answer.");
        assert_eq!(out.reasoning, "hmm");
        assert_eq!(sink.deltas, vec!["Answer.".to_string()]);
        assert_eq!(sink.reasoning.len(), 1);
        assert_eq!(transport.requests()[0].body["stream"], json!(false));
    }

    #[tokio::test]
    async fn gateway_embedder_maps_vectors_and_errors() {
        let ok = Arc::new(ScriptedTransport::new(|_| {
            let body = json!({"data":[
                {"index":1,"embedding":[0.0,1.0]},
                {"index":0,"embedding":[1.0,0.0]}
            ]});
            (200, vec![body.to_string()])
        }));
        let cfg = EmbeddingConfig {
            endpoint: "http://llm.test/v1/embeddings".into(),
            model: "embed".into(),
            api_key: None,
        };
        let client = EmbeddingsClient::new(ok, cfg.clone()).unwrap();
        let embedder = GatewayEmbedder::new(Arc::new(client));
        let vectors = embedder
            .embed_batch(&["a".to_string(), "b".to_string()])
            .await
            .unwrap();
        assert_eq!(vectors, vec![vec![1.0, 0.0], vec![0.0, 1.0]]);

        let failing = Arc::new(ScriptedTransport::new(|_| (401, vec!["bad key".into()])));
        let client = EmbeddingsClient::new(failing, cfg).unwrap();
        let embedder = GatewayEmbedder::new(Arc::new(client));
        let err = embedder.embed_batch(&["a".to_string()]).await.unwrap_err();
        assert!(matches!(err, doc_index::IndexError::Provider(m) if m.contains("401")));
    }
}
