//! Scripted transport for pipeline tests.

use std::sync::Mutex;

use futures::{StreamExt, future::BoxFuture, stream};
use llm_gateway::{HttpReply, HttpRequest, HttpTransport, Result};
use reqwest::StatusCode;
use serde_json::{Value, json};

type Responder = Box<dyn Fn(&HttpRequest) -> (u16, Vec<String>) + Send + Sync>;

/// Answers each POST from a closure and records the requests.
pub struct ScriptedTransport {
    responder: Responder,
    requests: Mutex<Vec<HttpRequest>>,
}

impl ScriptedTransport {
    pub fn new(
        responder: impl Fn(&HttpRequest) -> (u16, Vec<String>) + Send + Sync + 'static,
    ) -> Self {
        Self {
            responder: Box::new(responder),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn requests(&self) -> Vec<HttpRequest> {
        self.requests.lock().unwrap().clone()
    }
}

impl HttpTransport for ScriptedTransport {
    fn post<'a>(&'a self, req: HttpRequest) -> BoxFuture<'a, Result<HttpReply>> {
        let (status, chunks) = (self.responder)(&req);
        self.requests.lock().unwrap().push(req);
        Box::pin(async move {
            let chunks: Vec<Result<Vec<u8>>> =
                chunks.into_iter().map(|c| Ok(c.into_bytes())).collect();
            Ok(HttpReply {
                status: StatusCode::from_u16(status).unwrap(),
                body: stream::iter(chunks).boxed(),
            })
        })
    }
}

/// Chat-completions SSE frames for `deltas`, then `[DONE]`.
pub fn chat_sse(deltas: &[&str]) -> Vec<String> {
    let mut out: Vec<String> = deltas
        .iter()
        .map(|d| format!("data: {}\n\n", json!({"choices":[{"delta":{"content":d}}]})))
        .collect();
    out.push("data: [DONE]\n\n".to_string());
    out
}

/// Concatenated text of every message in a chat-completions body.
pub fn all_message_text(body: &Value) -> String {
    body["messages"]
        .as_array()
        .map(|msgs| {
            msgs.iter()
                .map(|m| match &m["content"] {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                })
                .collect::<Vec<_>>()
                .join("\n")
        })
        .unwrap_or_default()
}
