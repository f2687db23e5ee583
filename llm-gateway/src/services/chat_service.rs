//! Streaming chat client with adaptive parameter fallbacks.
//!
//! One request goes through three layers, outermost first:
//! - reasoning fallback: on a 400/422 naming a reasoning parameter, retry with
//!   the model's default level, then without any reasoning parameter, never
//!   repeating a level already sent and at most `max_reasoning_retries` times;
//! - temperature fallback: on a 400/422 rejecting `temperature`, retry once
//!   without it (or with the value the error demands) and remember the fix
//!   for the `(endpoint, model)` pair;
//! - the cancellable POST itself.

use std::sync::Arc;
use std::time::Instant;

use serde_json::json;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

use crate::{
    config::endpoint_profile::EndpointProfile,
    error_handler::{LlmError, Result, make_snippet},
    fallback::{
        FallbackMode, FallbackPolicy, InMemoryPolicyStore, PolicyKey, PolicyStore,
        TemperatureRecovery, classify_reasoning, classify_temperature,
    },
    messages::ChatTurn,
    payload::{PayloadRequest, TemperatureMode, build_payload},
    reasoning::{self, ReasoningLevel, ReasoningSelection},
    stream::{StreamSink, parse_full, parse_stream},
    transport::{HttpReply, HttpRequest, HttpTransport, ReqwestTransport},
};

/// Default cap on reasoning-fallback retries per call.
pub const DEFAULT_MAX_REASONING_RETRIES: usize = 2;

/// One completion call.
#[derive(Debug, Clone)]
pub struct CompletionRequest {
    /// Active endpoint profile, supplied by the caller per request.
    pub profile: EndpointProfile,
    pub messages: Vec<ChatTurn>,
    pub reasoning: ReasoningLevel,
}

impl CompletionRequest {
    pub fn new(profile: EndpointProfile, messages: Vec<ChatTurn>) -> Self {
        Self {
            profile,
            messages,
            reasoning: ReasoningLevel::Default,
        }
    }

    pub fn with_reasoning(mut self, level: ReasoningLevel) -> Self {
        self.reasoning = level;
        self
    }
}

/// Final value of a completion call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Completion {
    pub text: String,
    pub reasoning: String,
    /// The caller's token fired; `text` holds whatever arrived before that.
    pub cancelled: bool,
}

impl Completion {
    fn cancelled() -> Self {
        Self {
            cancelled: true,
            ..Self::default()
        }
    }
}

/// Chat/responses client.
///
/// Cheap to share behind an `Arc`; the only state is the injected policy store.
pub struct ChatClient {
    transport: Arc<dyn HttpTransport>,
    policies: Arc<dyn PolicyStore>,
    max_reasoning_retries: usize,
}

impl ChatClient {
    pub fn new(transport: Arc<dyn HttpTransport>, policies: Arc<dyn PolicyStore>) -> Self {
        Self {
            transport,
            policies,
            max_reasoning_retries: DEFAULT_MAX_REASONING_RETRIES,
        }
    }

    /// Production client: `reqwest` transport and a fresh in-memory policy store.
    ///
    /// # Errors
    /// [`LlmError::Transport`] if the HTTP client cannot be built.
    pub fn with_reqwest() -> Result<Self> {
        Ok(Self::new(
            Arc::new(ReqwestTransport::new()?),
            Arc::new(InMemoryPolicyStore::new()),
        ))
    }

    pub fn with_max_reasoning_retries(mut self, retries: usize) -> Self {
        self.max_reasoning_retries = retries;
        self
    }

    pub fn transport(&self) -> &Arc<dyn HttpTransport> {
        &self.transport
    }

    pub fn policies(&self) -> &Arc<dyn PolicyStore> {
        &self.policies
    }

    /// Streams a completion into `sink`.
    ///
    /// Cancellation (before or during the stream) resolves to
    /// `Ok(Completion { cancelled: true, .. })`.
    ///
    /// # Errors
    /// - [`LlmError::Config`] for an unusable profile (e.g. missing endpoint)
    /// - [`LlmError::HttpStatus`] when the endpoint rejects the request after fallbacks
    /// - [`LlmError::Transport`] on network failure
    #[instrument(skip_all, fields(model = %req.profile.model, profile = %req.profile.name))]
    pub async fn stream(
        &self,
        req: &CompletionRequest,
        sink: &mut dyn StreamSink,
        cancel: &CancellationToken,
    ) -> Result<Completion> {
        let started = Instant::now();
        let reply = match self.open(req, true, cancel).await {
            Ok(reply) => reply,
            Err(LlmError::Cancelled) => return Ok(Completion::cancelled()),
            Err(e) => return Err(e),
        };

        let out = parse_stream(req.profile.wire_format(), reply.body, sink, cancel).await?;
        info!(
            latency_ms = started.elapsed().as_millis() as u64,
            answer_chars = out.text.chars().count(),
            reasoning_chars = out.reasoning.chars().count(),
            cancelled = out.cancelled,
            "completion stream finished"
        );
        Ok(Completion {
            text: out.text,
            reasoning: out.reasoning,
            cancelled: out.cancelled,
        })
    }

    /// Non-streaming completion (`stream: false`), same fallbacks.
    ///
    /// # Errors
    /// As [`ChatClient::stream`], plus [`LlmError::Decode`] for an unreadable body.
    #[instrument(skip_all, fields(model = %req.profile.model, profile = %req.profile.name))]
    pub async fn complete(
        &self,
        req: &CompletionRequest,
        cancel: &CancellationToken,
    ) -> Result<Completion> {
        let started = Instant::now();
        let reply = match self.open(req, false, cancel).await {
            Ok(reply) => reply,
            Err(LlmError::Cancelled) => return Ok(Completion::cancelled()),
            Err(e) => return Err(e),
        };
        let body = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Ok(Completion::cancelled()),
            body = reply.text() => body?,
        };

        let out = parse_full(req.profile.wire_format(), &body)?;
        info!(
            latency_ms = started.elapsed().as_millis() as u64,
            answer_chars = out.text.chars().count(),
            "completion finished"
        );
        Ok(Completion {
            text: out.text,
            reasoning: out.reasoning,
            cancelled: false,
        })
    }

    /// Sends the request through both fallback layers; returns a 2xx reply.
    async fn open(
        &self,
        req: &CompletionRequest,
        stream: bool,
        cancel: &CancellationToken,
    ) -> Result<HttpReply> {
        req.profile.validate()?;

        let url = req.profile.request_url();
        let wire = req.profile.wire_format();
        let key = PolicyKey::new(url.clone(), req.profile.model.clone());
        let profile = reasoning::resolve(req.profile.provider, &req.profile.model);

        let mut level = req.reasoning;
        let mut attempted: Vec<ReasoningLevel> = Vec::new();
        let mut retries = 0usize;

        loop {
            let payload = PayloadRequest {
                model: &req.profile.model,
                messages: &req.messages,
                reasoning: ReasoningSelection::new(req.profile.provider, level),
                temperature: req.profile.temperature,
                max_tokens: req.profile.max_tokens,
                wire,
                stream,
            };
            let sent = profile.effective_level(level);
            attempted.push(sent);

            debug!(
                model = %req.profile.model,
                endpoint = %url,
                %wire,
                attempt = attempted.len(),
                reasoning = %sent,
                "sending completion request"
            );

            let err = match self
                .send_with_temperature_policy(&payload, &url, req.profile.bearer(), &key, cancel)
                .await
            {
                Ok(reply) => return Ok(reply),
                Err(e) => e,
            };

            let LlmError::HttpStatus { status, body, .. } = &err else {
                return Err(err);
            };
            if sent == ReasoningLevel::Default
                || retries >= self.max_reasoning_retries
                || !classify_reasoning(*status, body)
            {
                return Err(err);
            }

            let next = [profile.default_level, ReasoningLevel::Default]
                .into_iter()
                .find(|candidate| !attempted.contains(&profile.effective_level(*candidate)));
            let Some(next) = next else {
                return Err(err);
            };

            warn!(
                model = %req.profile.model,
                %status,
                rejected = %sent,
                retry_with = %profile.effective_level(next),
                body = %make_snippet(body),
                "reasoning parameter rejected, retrying"
            );
            level = next;
            retries += 1;
        }
    }

    /// Applies a learned temperature policy, or learns one from a rejection.
    async fn send_with_temperature_policy(
        &self,
        payload: &PayloadRequest<'_>,
        url: &str,
        api_key: Option<&str>,
        key: &PolicyKey,
        cancel: &CancellationToken,
    ) -> Result<HttpReply> {
        let learned = self.policies.get(key);
        let mode = match &learned {
            Some(FallbackMode::OmitParameter) => TemperatureMode::Omit,
            Some(FallbackMode::FixedValue(v)) => {
                v.as_f64().map(TemperatureMode::Fixed).unwrap_or_default()
            }
            Some(FallbackMode::Default) | None => TemperatureMode::AsConfigured,
        };

        let built = build_payload(payload, mode);
        let sent_temperature = built.body.get("temperature").and_then(|t| t.as_f64());
        let first = self.post(url, api_key, built.body, cancel).await;
        if learned.is_some() {
            return first;
        }

        let err = match first {
            Ok(reply) => return Ok(reply),
            Err(e) => e,
        };
        let LlmError::HttpStatus { status, body, .. } = &err else {
            return Err(err);
        };
        let Some(sent_temperature) = sent_temperature else {
            return Err(err);
        };
        let Some(recovery) = classify_temperature(*status, body) else {
            return Err(err);
        };
        let (retry_mode, policy_mode) = match recovery {
            TemperatureRecovery::Omit => (TemperatureMode::Omit, FallbackMode::OmitParameter),
            TemperatureRecovery::Fixed(v) if v == sent_temperature => return Err(err),
            TemperatureRecovery::Fixed(v) => {
                (TemperatureMode::Fixed(v), FallbackMode::FixedValue(json!(v)))
            }
        };

        warn!(
            endpoint = %url,
            model = payload.model,
            %status,
            recovery = ?recovery,
            body = %make_snippet(body),
            "temperature rejected, retrying"
        );

        let retried = build_payload(payload, retry_mode);
        let reply = self.post(url, api_key, retried.body, cancel).await?;
        info!(endpoint = %url, model = payload.model, policy = ?policy_mode, "learned temperature policy");
        self.policies.put(FallbackPolicy {
            key: key.clone(),
            mode: policy_mode,
        });
        Ok(reply)
    }

    /// Cancellable POST; non-2xx statuses become [`LlmError::HttpStatus`].
    async fn post(
        &self,
        url: &str,
        api_key: Option<&str>,
        body: serde_json::Value,
        cancel: &CancellationToken,
    ) -> Result<HttpReply> {
        if cancel.is_cancelled() {
            return Err(LlmError::Cancelled);
        }
        let request = HttpRequest {
            url: url.to_string(),
            api_key: api_key.map(str::to_string),
            body,
        };
        let reply = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(LlmError::Cancelled),
            reply = self.transport.post(request) => reply?,
        };
        if reply.status.is_success() {
            return Ok(reply);
        }

        let status = reply.status;
        let text = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(LlmError::Cancelled),
            text = reply.text() => text.unwrap_or_default(),
        };
        error!(%status, %url, body = %make_snippet(&text), "completion endpoint returned non-success status");
        Err(LlmError::HttpStatus {
            status,
            url: url.to_string(),
            body: text,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config::llm_provider::LlmProvider,
        stream::{CollectingSink, FnSink, NoopSink, ReasoningEvent},
        test_support::{MockTransport, Scripted, chat_sse},
    };
    use reqwest::StatusCode;
    use serde_json::Value;

    fn client(transport: Arc<MockTransport>) -> (ChatClient, Arc<InMemoryPolicyStore>) {
        let store = Arc::new(InMemoryPolicyStore::new());
        (ChatClient::new(transport, store.clone()), store)
    }

    fn request(model: &str, temperature: Option<f32>) -> CompletionRequest {
        let mut profile = EndpointProfile::new("https://llm.example.com/v1", model)
            .with_provider(LlmProvider::OpenAI)
            .with_api_key("sk-test");
        profile.temperature = temperature;
        CompletionRequest::new(profile, vec![ChatTurn::user("hi")])
    }

    #[tokio::test]
    async fn streams_answer_with_bearer() {
        let transport = Arc::new(MockTransport::new(|_| Scripted::ok(chat_sse(&["Hel", "lo"]))));
        let (client, _) = client(transport.clone());
        let mut sink = CollectingSink::default();

        let out = client
            .stream(&request("gpt-4o", Some(0.2)), &mut sink, &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(out.text, "Hello");
        assert_eq!(sink.answer(), "Hello");
        let reqs = transport.requests();
        assert_eq!(reqs.len(), 1);
        assert_eq!(reqs[0].url, "https://llm.example.com/v1/chat/completions");
        assert_eq!(reqs[0].api_key.as_deref(), Some("sk-test"));
        assert_eq!(reqs[0].body["stream"], Value::Bool(true));
    }

    #[tokio::test]
    async fn missing_endpoint_is_a_config_error() {
        let transport = Arc::new(MockTransport::new(|_| Scripted::ok(vec![])));
        let (client, _) = client(transport.clone());
        let mut req = request("gpt-4o", None);
        req.profile.endpoint = String::new();

        let err = client
            .stream(&req, &mut NoopSink, &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, LlmError::Config(_)));
        assert!(transport.requests().is_empty());
    }

    #[tokio::test]
    async fn temperature_rejection_is_learned_and_omitted() {
        let transport = Arc::new(MockTransport::new(|body| {
            if body.get("temperature").is_some() {
                Scripted::status(400, "temperature not supported")
            } else {
                Scripted::ok(chat_sse(&["ok"]))
            }
        }));
        let (client, store) = client(transport.clone());
        let req = request("gpt-4o", Some(0.7));

        let first = client
            .stream(&req, &mut NoopSink, &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(first.text, "ok");
        let second = client
            .stream(&req, &mut NoopSink, &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(second.text, "ok");

        let bodies = transport.bodies();
        assert_eq!(bodies.len(), 3);
        assert!(bodies[0].get("temperature").is_some());
        assert!(bodies[1].get("temperature").is_none());
        assert!(bodies[2].get("temperature").is_none());
        assert_eq!(
            store.get(&PolicyKey::new("https://llm.example.com/v1/chat/completions", "gpt-4o")),
            Some(FallbackMode::OmitParameter)
        );
    }

    #[tokio::test]
    async fn fixed_temperature_is_substituted() {
        let transport = Arc::new(MockTransport::new(|body| {
            match body.get("temperature").and_then(Value::as_f64) {
                Some(t) if (t - 1.0).abs() > f64::EPSILON => Scripted::status(
                    400,
                    r#"{"error":{"message":"Unsupported value: 'temperature' does not support 0.3 with this model. Only the default (1) value is supported."}}"#,
                ),
                _ => Scripted::ok(chat_sse(&["fine"])),
            }
        }));
        let (client, store) = client(transport.clone());

        let out = client
            .stream(&request("gpt-4o", Some(0.3)), &mut NoopSink, &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(out.text, "fine");
        assert_eq!(transport.bodies()[1]["temperature"], json!(1.0));
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn failed_temperature_retry_surfaces_second_error() {
        let transport = Arc::new(MockTransport::new(|body| {
            if body.get("temperature").is_some() {
                Scripted::status(400, "temperature not supported")
            } else {
                Scripted::status(500, "boom")
            }
        }));
        let (client, store) = client(transport.clone());

        let err = client
            .stream(&request("gpt-4o", Some(0.7)), &mut NoopSink, &CancellationToken::new())
            .await
            .unwrap_err();
        assert_eq!(err.status(), Some(StatusCode::INTERNAL_SERVER_ERROR));
        assert_eq!(transport.requests().len(), 2);
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn reasoning_rejection_falls_back_to_model_default() {
        let transport = Arc::new(MockTransport::new(|body| {
            if body["reasoning_effort"] == json!("xhigh") {
                Scripted::status(422, "invalid reasoning effort")
            } else {
                Scripted::ok(chat_sse(&["answer"]))
            }
        }));
        let (client, _) = client(transport.clone());
        let req = request("gpt-5.2", None).with_reasoning(ReasoningLevel::Xhigh);

        let out = client
            .stream(&req, &mut NoopSink, &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(out.text, "answer");

        let efforts: Vec<Value> = transport
            .bodies()
            .iter()
            .map(|b| b["reasoning_effort"].clone())
            .collect();
        assert_eq!(efforts, vec![json!("xhigh"), json!("medium")]);
    }

    #[tokio::test]
    async fn reasoning_retries_are_bounded() {
        let transport = Arc::new(MockTransport::new(|_| {
            Scripted::status(422, "invalid reasoning effort")
        }));
        let (client, _) = client(transport.clone());
        let req = request("gpt-5.2", None).with_reasoning(ReasoningLevel::Xhigh);

        let err = client
            .stream(&req, &mut NoopSink, &CancellationToken::new())
            .await
            .unwrap_err();
        assert_eq!(err.status(), Some(StatusCode::UNPROCESSABLE_ENTITY));

        let bodies = transport.bodies();
        assert_eq!(bodies.len(), 3);
        assert_eq!(bodies[0]["reasoning_effort"], json!("xhigh"));
        assert_eq!(bodies[1]["reasoning_effort"], json!("medium"));
        assert!(bodies[2].get("reasoning_effort").is_none());
    }

    #[tokio::test]
    async fn rejected_default_level_falls_back_to_omitting() {
        let transport = Arc::new(MockTransport::new(|_| {
            Scripted::status(400, "invalid reasoning effort")
        }));
        let (client, _) = client(transport.clone());
        let req = request("gpt-5", None).with_reasoning(ReasoningLevel::Medium);

        let err = client
            .stream(&req, &mut NoopSink, &CancellationToken::new())
            .await
            .unwrap_err();
        assert_eq!(err.status(), Some(StatusCode::BAD_REQUEST));
        // medium is also the default level, so only the omit candidate remains
        assert_eq!(transport.requests().len(), 2);
    }

    #[tokio::test]
    async fn cancellation_mid_stream_is_not_an_error() {
        let transport = Arc::new(MockTransport::new(|_| {
            Scripted::ok(vec![chat_sse(&["one", "two", "three"]).concat()])
        }));
        let (client, _) = client(transport);
        let cancel = CancellationToken::new();
        let trip = cancel.clone();
        let mut seen = Vec::new();
        let mut sink = FnSink::new(
            |d: &str| {
                seen.push(d.to_string());
                trip.cancel();
            },
            |_: &ReasoningEvent| {},
        );

        let out = client
            .stream(&request("gpt-4o", None), &mut sink, &cancel)
            .await
            .unwrap();
        drop(sink);
        assert!(out.cancelled);
        assert_eq!(seen, vec!["one"]);
    }

    #[tokio::test]
    async fn cancelled_before_send_makes_no_request() {
        let transport = Arc::new(MockTransport::new(|_| Scripted::ok(chat_sse(&["x"]))));
        let (client, _) = client(transport.clone());
        let cancel = CancellationToken::new();
        cancel.cancel();

        let out = client
            .stream(&request("gpt-4o", None), &mut NoopSink, &cancel)
            .await
            .unwrap();
        assert!(out.cancelled);
        assert!(transport.requests().is_empty());
    }

    #[tokio::test]
    async fn streams_responses_events() {
        let frames = [
            r#"{"type":"response.created","response":{}}"#,
            r#"{"type":"response.reasoning_summary_text.delta","delta":"Plan"}"#,
            r#"{"type":"response.output_text.delta","delta":"Hi "}"#,
            r#"{"type":"response.output_text.delta","delta":"there"}"#,
            r#"{"type":"response.output_text.done","text":"Hi there"}"#,
            r#"{"type":"response.completed","response":{"output":[{"type":"message","content":[{"type":"output_text","text":"Hi there"}]}]}}"#,
        ];
        let chunks: Vec<String> = frames
            .iter()
            .flat_map(|f| {
                let kind = serde_json::from_str::<Value>(f).unwrap()["type"].clone();
                // event line and data line arrive in separate chunks
                vec![
                    format!("event: {}\n", kind.as_str().unwrap()),
                    format!("data: {f}\n\n"),
                ]
            })
            .collect();
        let transport = Arc::new(MockTransport::new(move |_| Scripted::ok(chunks.clone())));
        let (client, _) = client(transport.clone());
        let mut req = request("gpt-5", None).with_reasoning(ReasoningLevel::Low);
        req.profile.endpoint = "https://api.openai.com/v1/responses".into();
        let mut sink = CollectingSink::default();

        let out = client
            .stream(&req, &mut sink, &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(out.text, "Hi there");
        assert_eq!(sink.answer(), "Hi there");
        assert_eq!(sink.reasoning.len(), 1);
        assert_eq!(sink.reasoning[0].summary.as_deref(), Some("Plan"));
        let body = &transport.bodies()[0];
        assert_eq!(body["stream"], Value::Bool(true));
        assert_eq!(body["reasoning"]["effort"], json!("low"));
        assert!(body.get("input").is_some());
    }

    #[tokio::test]
    async fn non_streaming_responses_body() {
        let transport = Arc::new(MockTransport::new(|_| {
            Scripted::ok(vec![
                r#"{"output":[{"type":"message","content":[{"type":"output_text","text":"done"}]}]}"#
                    .to_string(),
            ])
        }));
        let (client, _) = client(transport.clone());
        let mut req = request("gpt-4o", None);
        req.profile.endpoint = "https://api.openai.com/v1/responses".into();

        let out = client.complete(&req, &CancellationToken::new()).await.unwrap();
        assert_eq!(out.text, "done");
        let body = &transport.bodies()[0];
        assert_eq!(body["stream"], Value::Bool(false));
        assert!(body.get("input").is_some());
    }
}
