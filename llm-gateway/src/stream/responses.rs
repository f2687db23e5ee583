//! Responses-style typed event decoder.
//!
//! Incremental `.delta` events are authoritative. `.done`, `output_item.done`
//! and `completed` only fill in a channel that produced no deltas, so text is
//! never emitted twice.

use serde_json::Value;
use tracing::warn;

use super::{Emitter, ReasoningEvent};
use crate::error_handler::make_snippet;

#[derive(Debug, Default)]
pub struct ResponsesDecoder {
    text_seen: bool,
    summary_seen: bool,
    details_seen: bool,
}

impl ResponsesDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_frame(&mut self, frame: &Value, out: &mut Emitter<'_>) {
        let Some(kind) = frame.get("type").and_then(Value::as_str) else {
            return;
        };
        let kind = kind.strip_prefix("response.").unwrap_or(kind);

        match kind {
            "output_text.delta" => {
                if let Some(delta) = str_field(frame, "delta") {
                    self.text_seen = true;
                    out.answer(delta);
                }
            }
            "output_text.done" => {
                if !self.text_seen {
                    if let Some(text) = str_field(frame, "text") {
                        self.text_seen = true;
                        out.answer(text);
                    }
                }
            }
            "reasoning_summary_text.delta" | "reasoning_summary.delta" => {
                if let Some(delta) = str_field(frame, "delta") {
                    self.summary_seen = true;
                    out.reasoning(ReasoningEvent::summary(delta));
                }
            }
            "reasoning_summary_text.done"
            | "reasoning_summary.done"
            | "reasoning_summary_part.done" => {
                if !self.summary_seen {
                    let text = str_field(frame, "text")
                        .or_else(|| frame.get("part").and_then(|p| str_field(p, "text")));
                    if let Some(text) = text {
                        self.summary_seen = true;
                        out.reasoning(ReasoningEvent::summary(text));
                    }
                }
            }
            "reasoning_text.delta" | "reasoning.delta" => {
                if let Some(delta) = str_field(frame, "delta") {
                    self.details_seen = true;
                    out.reasoning(ReasoningEvent::details(delta));
                }
            }
            "reasoning_text.done" | "reasoning.done" => {
                if !self.details_seen {
                    if let Some(text) = str_field(frame, "text") {
                        self.details_seen = true;
                        out.reasoning(ReasoningEvent::details(text));
                    }
                }
            }
            "output_item.done" => {
                if let Some(item) = frame.get("item") {
                    self.on_item(item, out);
                }
            }
            "completed" => {
                if let Some(response) = frame.get("response") {
                    self.on_response(response, out);
                }
            }
            "error" | "failed" | "incomplete" => {
                warn!(event = kind, body = %make_snippet(&frame.to_string()), "responses stream reported a problem");
            }
            // created, in_progress, output_item.added, content_part.*: nothing to emit
            _ => {}
        }
    }

    pub fn on_full(&mut self, body: &Value, out: &mut Emitter<'_>) -> bool {
        let response = body.get("response").unwrap_or(body);
        let known = response.get("output").and_then(Value::as_array).is_some()
            || response.get("output_text").and_then(Value::as_str).is_some();
        if known {
            self.on_response(response, out);
        }
        known
    }

    fn on_response(&mut self, response: &Value, out: &mut Emitter<'_>) {
        if let Some(items) = response.get("output").and_then(Value::as_array) {
            for item in items {
                self.on_item(item, out);
            }
        }
        if !self.text_seen {
            if let Some(text) = str_field(response, "output_text") {
                self.text_seen = true;
                out.answer(text);
            }
        }
    }

    fn on_item(&mut self, item: &Value, out: &mut Emitter<'_>) {
        match item.get("type").and_then(Value::as_str) {
            Some("message") if !self.text_seen => {
                let text = joined_text(item.get("content"), &["output_text", "text"]);
                if !text.is_empty() {
                    self.text_seen = true;
                    out.answer(&text);
                }
            }
            Some("reasoning") => {
                if !self.summary_seen {
                    let summary = joined_text(item.get("summary"), &["summary_text"]);
                    if !summary.is_empty() {
                        self.summary_seen = true;
                        out.reasoning(ReasoningEvent::summary(summary));
                    }
                }
                if !self.details_seen {
                    let details = joined_text(item.get("content"), &["reasoning_text"]);
                    if !details.is_empty() {
                        self.details_seen = true;
                        out.reasoning(ReasoningEvent::details(details));
                    }
                }
            }
            _ => {}
        }
    }
}

fn str_field<'v>(v: &'v Value, key: &str) -> Option<&'v str> {
    v.get(key).and_then(Value::as_str)
}

/// Concatenates `text` of array parts whose `type` is one of `kinds`.
fn joined_text(parts: Option<&Value>, kinds: &[&str]) -> String {
    parts
        .and_then(Value::as_array)
        .map(|parts| {
            parts
                .iter()
                .filter(|p| {
                    p.get("type")
                        .and_then(Value::as_str)
                        .is_some_and(|t| kinds.contains(&t))
                })
                .filter_map(|p| str_field(p, "text"))
                .collect()
        })
        .unwrap_or_default()
}
