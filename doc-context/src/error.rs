//! Typed error for the doc-context crate.

use llm_gateway::LlmError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ContextError {
    /// Errors from the chat gateway (config, HTTP status, transport, decode).
    #[error(transparent)]
    Llm(#[from] LlmError),

    /// The question is empty after trimming.
    #[error("[Doc Context] question is empty")]
    EmptyQuestion,
}

impl ContextError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, ContextError::Llm(e) if e.is_cancelled())
    }

    /// Short human-readable message for end users.
    pub fn user_message(&self) -> String {
        match self {
            ContextError::Llm(e) => e.user_message(),
            ContextError::EmptyQuestion => "question is empty".to_string(),
        }
    }
}
