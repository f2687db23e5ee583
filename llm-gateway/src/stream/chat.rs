//! Chat-completions frame decoder.
//!
//! Handles `choices[].delta` (streaming), `choices[].message` (non-streaming)
//! and Ollama's native `{"message": {...}}` lines.

use serde_json::Value;
use tracing::warn;

use super::{
    Emitter, ReasoningEvent,
    thought_splitter::ThoughtSplitter,
};
use crate::error_handler::make_snippet;

/// Side-channel reasoning fields, first non-empty one wins per frame.
const REASONING_FIELDS: &[&str] = &["reasoning_content", "reasoning", "thinking", "thought"];

#[derive(Debug, Default)]
pub struct ChatDecoder {
    splitter: ThoughtSplitter,
}

impl ChatDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_frame(&mut self, frame: &Value, out: &mut Emitter<'_>) {
        if let Some(err) = frame.get("error") {
            warn!(error = %make_snippet(&err.to_string()), "error frame in chat stream");
            return;
        }
        if let Some(choices) = frame.get("choices").and_then(Value::as_array) {
            for choice in choices {
                if let Some(part) = choice.get("delta").or_else(|| choice.get("message")) {
                    self.on_part(part, out);
                }
            }
        } else if let Some(message) = frame.get("message") {
            self.on_part(message, out);
        }
    }

    pub fn on_full(&mut self, body: &Value, out: &mut Emitter<'_>) -> bool {
        let known = body.get("choices").and_then(Value::as_array).is_some()
            || body.get("message").is_some_and(Value::is_object);
        if known {
            self.on_frame(body, out);
        }
        known
    }

    pub fn finish(&mut self, out: &mut Emitter<'_>) {
        if let Some(segment) = self.splitter.finish() {
            out.segment(segment);
        }
    }

    fn on_part(&mut self, part: &Value, out: &mut Emitter<'_>) {
        if let Some(text) = REASONING_FIELDS
            .iter()
            .filter_map(|k| part.get(*k).and_then(text_of))
            .find(|t| !t.is_empty())
        {
            out.reasoning(ReasoningEvent::details(text));
        }

        if let Some(content) = part.get("content").and_then(text_of) {
            for segment in self.splitter.push(&content) {
                out.segment(segment);
            }
        }
    }
}

/// String content, or the concatenated `text` of a parts array / object.
fn text_of(v: &Value) -> Option<String> {
    match v {
        Value::String(s) => Some(s.clone()),
        Value::Array(items) => {
            let joined: String = items
                .iter()
                .filter_map(|i| i.get("text").and_then(Value::as_str))
                .collect();
            Some(joined)
        }
        Value::Object(_) => v.get("text").and_then(Value::as_str).map(str::to_string),
        _ => None,
    }
}
