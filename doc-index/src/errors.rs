//! Unified error types for the crate.

use thiserror::Error;

/// Errors raised while computing embeddings.
///
/// Retrieval never surfaces these: the embedding cache logs them and marks
/// the document as failed.
#[derive(Debug, Error)]
pub enum IndexError {
    /// The embedding backend failed (network, HTTP status, decode).
    #[error("embedding provider error: {0}")]
    Provider(String),

    /// Backend returned a different number of vectors than inputs.
    #[error("embedding count mismatch: got {got}, want {want}")]
    VectorCountMismatch { got: usize, want: usize },

    /// No embedding backend is configured.
    #[error("embeddings unavailable")]
    Unavailable,
}
