//! Unified error handling for `llm-gateway`.
//!
//! This module exposes a single top-level error type [`LlmError`] for the whole
//! library and groups configuration problems in [`ConfigError`]. Small helpers
//! for reading/validating environment variables are provided and return the
//! unified [`Result<T>`] alias.
//!
//! All messages include the prefix `[LLM Gateway]` to simplify attribution in logs.

use reqwest::StatusCode;
use thiserror::Error;

/* ------------------------------------------------------------------------- */
/* Public result alias                                                       */
/* ------------------------------------------------------------------------- */

/// Unified result alias for the entire crate.
pub type Result<T> = std::result::Result<T, LlmError>;

/// Maximum number of characters kept by [`make_snippet`].
pub const SNIPPET_MAX_CHARS: usize = 300;

/* ------------------------------------------------------------------------- */
/* Top-level error                                                           */
/* ------------------------------------------------------------------------- */

/// Top-level error for the `llm-gateway` crate.
///
/// Parse problems inside a stream never show up here: malformed frames are
/// logged and skipped by the stream parser.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum LlmError {
    /// Configuration/validation errors. Fatal, never retried.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Upstream returned a non-successful HTTP status.
    ///
    /// The full body is kept because the fallback policies sniff it.
    #[error("[LLM Gateway] HTTP {status} from {url}: {}", make_snippet(.body))]
    HttpStatus {
        /// HTTP status code.
        status: StatusCode,
        /// Request URL.
        url: String,
        /// Raw response body text.
        body: String,
    },

    /// Underlying HTTP transport error (connect, reset, TLS...).
    #[error("[LLM Gateway] transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// A non-streaming response could not be decoded.
    #[error("[LLM Gateway] decode error: {0}")]
    Decode(String),

    /// The caller cancelled the request before a response arrived.
    #[error("[LLM Gateway] request cancelled")]
    Cancelled,
}

impl LlmError {
    /// `true` for the cancellation outcome, which callers must not treat as a failure.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, LlmError::Cancelled)
    }

    /// HTTP status for [`LlmError::HttpStatus`], `None` otherwise.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            LlmError::HttpStatus { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Short human-readable message suitable for a chat panel.
    ///
    /// `HTTP <status>: <truncated body>` for upstream failures,
    /// `request cancelled` for cancellation.
    pub fn user_message(&self) -> String {
        match self {
            LlmError::HttpStatus { status, body, .. } => {
                format!("HTTP {}: {}", status.as_u16(), make_snippet(body))
            }
            LlmError::Cancelled => "request cancelled".to_string(),
            LlmError::Config(e) => e.to_string(),
            LlmError::Transport(e) => format!("network error: {e}"),
            LlmError::Decode(msg) => format!("unexpected response: {msg}"),
        }
    }
}

/* ------------------------------------------------------------------------- */
/* Config errors                                                             */
/* ------------------------------------------------------------------------- */

/// Error enum for environment/config-driven setup.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Required environment variable is missing or empty.
    #[error("[LLM Gateway] missing required environment variable: {0}")]
    MissingVar(String),

    /// The endpoint URL of a profile is empty.
    #[error("[LLM Gateway] endpoint URL is not configured")]
    MissingEndpoint,

    /// A number failed to parse (limits, temperatures, slots).
    #[error("[LLM Gateway] invalid number in {var}: {reason}")]
    InvalidNumber {
        /// Variable name (e.g., `LLM_PROFILE_1_MAX_TOKENS`).
        var: String,
        /// Human-readable reason (e.g., `expected u32`).
        reason: &'static str,
    },

    /// Value had the wrong format (e.g., invalid URL).
    #[error("[LLM Gateway] invalid format in {var}: {reason}")]
    InvalidFormat {
        /// Variable or field name.
        var: String,
        /// Explanation (e.g., `must start with http:// or https://`).
        reason: &'static str,
    },

    /// A numeric field was outside of the allowed range.
    #[error("[LLM Gateway] {field} is out of range: {detail}")]
    OutOfRange {
        /// Field name (e.g., `temperature`).
        field: &'static str,
        /// Description of the expected range.
        detail: &'static str,
    },

    /// Model name was empty.
    #[error("[LLM Gateway] model name must not be empty")]
    EmptyModel,

    /// Unknown provider name.
    #[error("[LLM Gateway] unsupported provider: {0}")]
    UnsupportedProvider(String),

    /// Unknown reasoning level name.
    #[error("[LLM Gateway] unknown reasoning level: {0}")]
    UnknownReasoningLevel(String),

    /// Requested profile slot is not configured.
    #[error("[LLM Gateway] profile slot {0} is not configured")]
    UnknownProfile(usize),
}

/* ------------------------------------------------------------------------- */
/* Snippets                                                                  */
/* ------------------------------------------------------------------------- */

/// Trims and truncates a response body for logs and user-facing messages.
pub fn make_snippet(text: &str) -> String {
    let trimmed = text.trim();
    if trimmed.chars().count() <= SNIPPET_MAX_CHARS {
        return trimmed.to_string();
    }
    let mut out: String = trimmed.chars().take(SNIPPET_MAX_CHARS).collect();
    out.push('…');
    out
}

/* ------------------------------------------------------------------------- */
/* Env helpers (return unified `Result<T>`)                                  */
/* ------------------------------------------------------------------------- */

/// Reads an optional, non-empty environment variable.
pub fn env_opt(name: &str) -> Option<String> {
    match std::env::var(name) {
        Ok(v) if !v.trim().is_empty() => Some(v.trim().to_string()),
        _ => None,
    }
}

/// Fetches a required, non-empty environment variable.
///
/// # Errors
/// Returns [`ConfigError::MissingVar`] if the variable is absent or empty.
pub fn must_env(name: &str) -> Result<String> {
    env_opt(name).ok_or_else(|| ConfigError::MissingVar(name.to_string()).into())
}

/// Parses an optional `u32` from env (`Ok(None)` if unset/empty).
///
/// # Errors
/// Returns [`ConfigError::InvalidNumber`] if the variable is set but not a valid `u32`.
pub fn env_opt_u32(name: &str) -> Result<Option<u32>> {
    match env_opt(name) {
        Some(v) => v.parse::<u32>().map(Some).map_err(|_| {
            LlmError::from(ConfigError::InvalidNumber {
                var: name.to_string(),
                reason: "expected u32",
            })
        }),
        None => Ok(None),
    }
}

/// Parses an optional `f32` from env (`Ok(None)` if unset/empty).
///
/// # Errors
/// Returns [`ConfigError::InvalidNumber`] if the variable is set but not a valid `f32`.
pub fn env_opt_f32(name: &str) -> Result<Option<f32>> {
    match env_opt(name) {
        Some(v) => v.parse::<f32>().map(Some).map_err(|_| {
            LlmError::from(ConfigError::InvalidNumber {
                var: name.to_string(),
                reason: "expected floating point number",
            })
        }),
        None => Ok(None),
    }
}

/* ------------------------------------------------------------------------- */
/* Validation helpers                                                        */
/* ------------------------------------------------------------------------- */

/// Validates that an HTTP endpoint starts with `http://` or `https://`.
///
/// # Errors
/// Returns [`ConfigError::InvalidFormat`] when the scheme is missing.
pub fn validate_http_endpoint(var: &str, value: &str) -> Result<()> {
    if value.starts_with("http://") || value.starts_with("https://") {
        Ok(())
    } else {
        Err(ConfigError::InvalidFormat {
            var: var.to_string(),
            reason: "must start with http:// or https://",
        }
        .into())
    }
}

/// Validates that a floating-point value lies within an inclusive range.
///
/// # Errors
/// Returns [`ConfigError::OutOfRange`] if `value` is outside `[min, max]`.
pub fn validate_range_f32(field: &'static str, value: f32, min: f32, max: f32) -> Result<()> {
    if value.is_finite() && value >= min && value <= max {
        Ok(())
    } else {
        Err(ConfigError::OutOfRange {
            field,
            detail: "expected value in inclusive range",
        }
        .into())
    }
}
