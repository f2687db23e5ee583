//! In-memory transport double for client tests.

use std::sync::Mutex;

use futures::{StreamExt, future::BoxFuture, stream};
use reqwest::StatusCode;
use serde_json::{Value, json};

use crate::{
    error_handler::Result,
    transport::{HttpReply, HttpRequest, HttpTransport},
};

/// One scripted reply: status plus body chunks delivered in order.
pub struct Scripted {
    pub status: StatusCode,
    pub chunks: Vec<String>,
}

impl Scripted {
    pub fn ok(chunks: Vec<String>) -> Self {
        Self {
            status: StatusCode::OK,
            chunks,
        }
    }

    pub fn status(status: u16, body: &str) -> Self {
        Self {
            status: StatusCode::from_u16(status).unwrap(),
            chunks: vec![body.to_string()],
        }
    }
}

type Responder = Box<dyn Fn(&Value) -> Scripted + Send + Sync>;

/// Answers each POST from a closure over the request body and records requests.
pub struct MockTransport {
    responder: Responder,
    requests: Mutex<Vec<HttpRequest>>,
}

impl MockTransport {
    pub fn new(responder: impl Fn(&Value) -> Scripted + Send + Sync + 'static) -> Self {
        Self {
            responder: Box::new(responder),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn requests(&self) -> Vec<HttpRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn bodies(&self) -> Vec<Value> {
        self.requests().into_iter().map(|r| r.body).collect()
    }
}

impl HttpTransport for MockTransport {
    fn post<'a>(&'a self, req: HttpRequest) -> BoxFuture<'a, Result<HttpReply>> {
        let scripted = (self.responder)(&req.body);
        self.requests.lock().unwrap().push(req);
        Box::pin(async move {
            let chunks: Vec<Result<Vec<u8>>> = scripted
                .chunks
                .into_iter()
                .map(|c| Ok(c.into_bytes()))
                .collect();
            Ok(HttpReply {
                status: scripted.status,
                body: stream::iter(chunks).boxed(),
            })
        })
    }
}

/// Chat-completions SSE body streaming `deltas`, then `[DONE]`.
pub fn chat_sse(deltas: &[&str]) -> Vec<String> {
    let mut out: Vec<String> = deltas
        .iter()
        .map(|d| format!("data: {}\n\n", json!({"choices":[{"delta":{"content":d}}]})))
        .collect();
    out.push("data: [DONE]\n\n".to_string());
    out
}
