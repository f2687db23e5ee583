//! Public API types re-used by callers (CLI, future HTTP layer).

use llm_gateway::{ChatTurn, EndpointProfile, ReasoningLevel};
use serde::Serialize;

use crate::cfg::RetrievalConfig;

/// One user turn as seen by retrieval.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RetrievalQuery {
    pub raw_text: String,
    pub has_attached_image: bool,
}

impl RetrievalQuery {
    pub fn new(raw_text: impl Into<String>, has_attached_image: bool) -> Self {
        Self {
            raw_text: raw_text.into(),
            has_attached_image,
        }
    }
}

/// How the context string was produced.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ContextMode {
    /// Entire document sent verbatim.
    Full,
    /// Ranked excerpts.
    Retrieved,
}

/// Output of [`crate::build_context`].
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct BuiltContext {
    pub text: String,
    pub mode: ContextMode,
    /// Chunk indices rendered as excerpts, in document order. Empty in full mode.
    pub excerpts: Vec<usize>,
}

/// Everything needed to answer one question about one document.
///
/// # Example
/// ```
/// use doc_context::AskRequest;
/// use llm_gateway::EndpointProfile;
/// let profile = EndpointProfile::new("https://api.openai.com/v1", "gpt-4o-mini");
/// let req = AskRequest::new("paper-1", "Paper", "Body text.", "What is it about?", profile)
///     .with_image("https://example.com/fig1.png");
/// assert!(req.image_url.is_some());
/// ```
#[derive(Clone, Debug)]
pub struct AskRequest {
    pub doc_id: String,
    pub title: String,
    /// Extracted document text; only read when the document is not indexed yet.
    pub text: String,
    pub question: String,
    /// Caller-owned transcript; only the most recent turns are forwarded.
    pub history: Vec<ChatTurn>,
    pub image_url: Option<String>,
    pub profile: EndpointProfile,
    pub reasoning: ReasoningLevel,
    pub system_prompt: Option<String>,
    pub retrieval: RetrievalConfig,
    /// `false` uses a single non-streaming request and reports the answer in one delta.
    pub stream: bool,
}

impl AskRequest {
    pub fn new(
        doc_id: impl Into<String>,
        title: impl Into<String>,
        text: impl Into<String>,
        question: impl Into<String>,
        profile: EndpointProfile,
    ) -> Self {
        Self {
            doc_id: doc_id.into(),
            title: title.into(),
            text: text.into(),
            question: question.into(),
            history: Vec::new(),
            image_url: None,
            profile,
            reasoning: ReasoningLevel::Default,
            system_prompt: None,
            retrieval: RetrievalConfig::default(),
            stream: true,
        }
    }

    pub fn with_history(mut self, history: Vec<ChatTurn>) -> Self {
        self.history = history;
        self
    }

    pub fn with_image(mut self, url: impl Into<String>) -> Self {
        self.image_url = Some(url.into());
        self
    }

    pub fn with_reasoning(mut self, level: ReasoningLevel) -> Self {
        self.reasoning = level;
        self
    }

    pub fn with_system_prompt(mut self, prompt: Option<String>) -> Self {
        self.system_prompt = prompt;
        self
    }

    pub fn with_retrieval(mut self, retrieval: RetrievalConfig) -> Self {
        self.retrieval = retrieval;
        self
    }

    pub fn with_stream(mut self, stream: bool) -> Self {
        self.stream = stream;
        self
    }
}

/// Result of [`crate::ask`].
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct AskOutcome {
    pub answer: String,
    pub reasoning: String,
    pub context_mode: Option<ContextMode>,
    pub excerpts: Vec<usize>,
    pub cancelled: bool,
}
