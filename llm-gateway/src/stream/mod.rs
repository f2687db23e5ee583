//! Streaming response parsing.
//!
//! One read loop ([`parse_stream`]) frames the byte stream and hands each JSON
//! frame to a [`StreamParser`] chosen once per call from the wire format. The
//! parsers report through an [`Emitter`] that forwards deltas to the caller's
//! [`StreamSink`] and accumulates the full answer.

pub mod chat;
pub mod frames;
pub mod responses;
pub mod thought_splitter;

use futures::StreamExt;
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::{
    config::wire::WireFormat,
    error_handler::{LlmError, Result, make_snippet},
    transport::ByteStream,
};

use self::{
    chat::ChatDecoder,
    frames::{Frame, FrameReader},
    responses::ResponsesDecoder,
    thought_splitter::Segment,
};

/* ------------------------------------------------------------------------- */
/* Caller-facing callbacks                                                   */
/* ------------------------------------------------------------------------- */

/// Reasoning side-channel fragment.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReasoningEvent {
    pub summary: Option<String>,
    pub details: Option<String>,
}

impl ReasoningEvent {
    pub fn summary(text: impl Into<String>) -> Self {
        Self {
            summary: Some(text.into()),
            details: None,
        }
    }

    pub fn details(text: impl Into<String>) -> Self {
        Self {
            summary: None,
            details: Some(text.into()),
        }
    }
}

/// Receives incremental output of one streaming call.
pub trait StreamSink: Send {
    fn on_answer_delta(&mut self, _delta: &str) {}
    fn on_reasoning(&mut self, _event: &ReasoningEvent) {}
}

/// Sink that drops everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopSink;

impl StreamSink for NoopSink {}

/// Sink built from two closures.
pub struct FnSink<A, R> {
    on_answer: A,
    on_reasoning: R,
}

impl<A, R> FnSink<A, R>
where
    A: FnMut(&str) + Send,
    R: FnMut(&ReasoningEvent) + Send,
{
    pub fn new(on_answer: A, on_reasoning: R) -> Self {
        Self {
            on_answer,
            on_reasoning,
        }
    }
}

impl<A, R> StreamSink for FnSink<A, R>
where
    A: FnMut(&str) + Send,
    R: FnMut(&ReasoningEvent) + Send,
{
    fn on_answer_delta(&mut self, delta: &str) {
        (self.on_answer)(delta)
    }

    fn on_reasoning(&mut self, event: &ReasoningEvent) {
        (self.on_reasoning)(event)
    }
}

/// Sink that records every callback.
#[derive(Debug, Default, Clone)]
pub struct CollectingSink {
    pub deltas: Vec<String>,
    pub reasoning: Vec<ReasoningEvent>,
}

impl CollectingSink {
    pub fn answer(&self) -> String {
        self.deltas.concat()
    }
}

impl StreamSink for CollectingSink {
    fn on_answer_delta(&mut self, delta: &str) {
        self.deltas.push(delta.to_string());
    }

    fn on_reasoning(&mut self, event: &ReasoningEvent) {
        self.reasoning.push(event.clone());
    }
}

/* ------------------------------------------------------------------------- */
/* Emitter                                                                   */
/* ------------------------------------------------------------------------- */

/// Forwards decoder output to the sink and keeps the running totals.
pub struct Emitter<'s> {
    sink: &'s mut dyn StreamSink,
    text: String,
    reasoning: String,
}

impl<'s> Emitter<'s> {
    pub fn new(sink: &'s mut dyn StreamSink) -> Self {
        Self {
            sink,
            text: String::new(),
            reasoning: String::new(),
        }
    }

    pub fn answer(&mut self, delta: &str) {
        if delta.is_empty() {
            return;
        }
        self.text.push_str(delta);
        self.sink.on_answer_delta(delta);
    }

    pub fn reasoning(&mut self, event: ReasoningEvent) {
        let summary = event.summary.as_deref().unwrap_or_default();
        let details = event.details.as_deref().unwrap_or_default();
        if summary.is_empty() && details.is_empty() {
            return;
        }
        self.reasoning.push_str(summary);
        self.reasoning.push_str(details);
        self.sink.on_reasoning(&event);
    }

    pub fn segment(&mut self, segment: Segment) {
        match segment {
            Segment::Answer(text) => self.answer(&text),
            Segment::Thought(text) => self.reasoning(ReasoningEvent::details(text)),
        }
    }

    fn into_output(self, cancelled: bool) -> StreamOutput {
        StreamOutput {
            text: self.text,
            reasoning: self.reasoning,
            cancelled,
        }
    }
}

/* ------------------------------------------------------------------------- */
/* Parser variants                                                           */
/* ------------------------------------------------------------------------- */

/// Result of one parse.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StreamOutput {
    /// Full accumulated answer text.
    pub text: String,
    /// Full accumulated reasoning text (summaries then details, in arrival order).
    pub reasoning: String,
    /// The caller's token fired before the stream ended.
    pub cancelled: bool,
}

/// Closed set of decoders, one per wire format.
#[derive(Debug)]
pub enum StreamParser {
    Chat(ChatDecoder),
    Responses(ResponsesDecoder),
}

impl StreamParser {
    pub fn for_wire(wire: WireFormat) -> Self {
        match wire {
            WireFormat::ChatCompletions => StreamParser::Chat(ChatDecoder::new()),
            WireFormat::Responses => StreamParser::Responses(ResponsesDecoder::new()),
        }
    }

    /// Parses one frame; malformed JSON is logged and skipped.
    pub fn on_raw(&mut self, raw: &str, out: &mut Emitter<'_>) {
        match serde_json::from_str::<Value>(raw) {
            Ok(frame) => self.on_frame(&frame, out),
            Err(e) => {
                warn!(error = %e, frame = %make_snippet(raw), "skipping malformed stream frame")
            }
        }
    }

    pub fn on_frame(&mut self, frame: &Value, out: &mut Emitter<'_>) {
        match self {
            StreamParser::Chat(d) => d.on_frame(frame, out),
            StreamParser::Responses(d) => d.on_frame(frame, out),
        }
    }

    /// Decodes a complete non-streaming body. `false` when it has neither shape.
    pub fn on_full(&mut self, body: &Value, out: &mut Emitter<'_>) -> bool {
        match self {
            StreamParser::Chat(d) => d.on_full(body, out),
            StreamParser::Responses(d) => d.on_full(body, out),
        }
    }

    pub fn finish(&mut self, out: &mut Emitter<'_>) {
        match self {
            StreamParser::Chat(d) => d.finish(out),
            StreamParser::Responses(_) => {}
        }
    }
}

/* ------------------------------------------------------------------------- */
/* Entry points                                                              */
/* ------------------------------------------------------------------------- */

/// Reads `body` to the end (or until `cancel` fires), emitting into `sink`.
///
/// Cancellation is not an error: the body is dropped, no further callbacks
/// are made and the output carries `cancelled = true`.
///
/// # Errors
/// [`LlmError::Transport`] when reading the body fails mid-stream.
pub async fn parse_stream(
    wire: WireFormat,
    mut body: ByteStream,
    sink: &mut dyn StreamSink,
    cancel: &CancellationToken,
) -> Result<StreamOutput> {
    let mut reader = FrameReader::new();
    let mut parser = StreamParser::for_wire(wire);
    let mut out = Emitter::new(sink);
    let mut cancelled = false;
    let mut done = false;

    while !cancelled && !done {
        let next = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                cancelled = true;
                break;
            }
            next = body.next() => next,
        };
        let Some(chunk) = next else { break };
        let chunk = chunk?;

        for frame in reader.push(&chunk) {
            if cancel.is_cancelled() {
                cancelled = true;
                break;
            }
            match frame {
                Frame::Done => {
                    done = true;
                    break;
                }
                Frame::Data(raw) => parser.on_raw(&raw, &mut out),
            }
        }
    }
    drop(body);

    if cancelled {
        debug!(answer_chars = out.text.len(), "stream cancelled");
        return Ok(out.into_output(true));
    }
    if !done {
        if let Some(Frame::Data(raw)) = reader.finish() {
            parser.on_raw(&raw, &mut out);
        }
    }
    parser.finish(&mut out);
    Ok(out.into_output(false))
}

/// Decodes a non-streaming JSON response of either wire shape.
///
/// # Errors
/// [`LlmError::Decode`] when the body is not JSON or has neither shape.
pub fn parse_full(wire: WireFormat, body: &str) -> Result<StreamOutput> {
    let value: Value = serde_json::from_str(body)
        .map_err(|e| LlmError::Decode(format!("{e}: {}", make_snippet(body))))?;
    let mut sink = NoopSink;
    let mut out = Emitter::new(&mut sink);
    let mut parser = StreamParser::for_wire(wire);
    if !parser.on_full(&value, &mut out) {
        return Err(LlmError::Decode(format!(
            "no {wire} output in response: {}",
            make_snippet(body)
        )));
    }
    parser.finish(&mut out);
    Ok(out.into_output(false))
}
