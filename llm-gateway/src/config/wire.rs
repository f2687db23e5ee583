//! Wire-format detection and URL resolution from a configured endpoint.

use std::fmt;

const CHAT_SUFFIX: &str = "/chat/completions";
const RESPONSES_SUFFIX: &str = "/responses";
const EMBEDDINGS_SUFFIX: &str = "/embeddings";

/// Request/stream protocol spoken by an endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum WireFormat {
    /// `POST .../chat/completions` with a `messages` array, `delta` stream frames.
    #[default]
    ChatCompletions,
    /// `POST .../responses` with structured `input`, typed stream events.
    Responses,
}

impl WireFormat {
    /// Detects the wire format from the URL suffix.
    pub fn detect(url: &str) -> Self {
        let (base, _) = split_query(url);
        if base.trim_end_matches('/').ends_with(RESPONSES_SUFFIX) {
            WireFormat::Responses
        } else {
            WireFormat::ChatCompletions
        }
    }
}

impl fmt::Display for WireFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WireFormat::ChatCompletions => f.write_str("chat"),
            WireFormat::Responses => f.write_str("responses"),
        }
    }
}

/// Resolves the URL a completion request is posted to.
///
/// URLs already ending in `/chat/completions` or `/responses` are kept; a bare
/// base gets `/chat/completions` appended, preceded by `/v1` unless the path
/// already carries a version segment (`/v1`, `/v1beta/openai`, ...).
pub fn resolve_request_url(url: &str) -> String {
    let (base, query) = split_query(url.trim());
    let base = base.trim_end_matches('/');
    let resolved = if base.ends_with(CHAT_SUFFIX) || base.ends_with(RESPONSES_SUFFIX) {
        base.to_string()
    } else if has_version_segment(base) {
        format!("{base}{CHAT_SUFFIX}")
    } else {
        format!("{base}/v1{CHAT_SUFFIX}")
    };
    join_query(resolved, query)
}

/// Derives the embeddings URL from a chat/responses endpoint.
pub fn embeddings_url(url: &str) -> String {
    let (base, query) = split_query(url.trim());
    let base = base.trim_end_matches('/');
    let resolved = if base.ends_with(EMBEDDINGS_SUFFIX) {
        base.to_string()
    } else if let Some(stripped) = base
        .strip_suffix(CHAT_SUFFIX)
        .or_else(|| base.strip_suffix(RESPONSES_SUFFIX))
    {
        format!("{stripped}{EMBEDDINGS_SUFFIX}")
    } else if has_version_segment(base) {
        format!("{base}{EMBEDDINGS_SUFFIX}")
    } else {
        format!("{base}/v1{EMBEDDINGS_SUFFIX}")
    };
    join_query(resolved, query)
}

fn split_query(url: &str) -> (&str, Option<&str>) {
    match url.split_once('?') {
        Some((base, query)) => (base, Some(query)),
        None => (url, None),
    }
}

fn join_query(base: String, query: Option<&str>) -> String {
    match query {
        Some(q) if !q.is_empty() => format!("{base}?{q}"),
        _ => base,
    }
}

fn has_version_segment(base: &str) -> bool {
    let path = base
        .split_once("://")
        .map(|(_, rest)| rest)
        .unwrap_or(base);
    path.split('/').skip(1).any(|seg| {
        let mut chars = seg.chars();
        chars.next() == Some('v') && chars.next().is_some_and(|c| c.is_ascii_digit())
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_responses_suffix() {
        assert_eq!(
            WireFormat::detect("https://api.openai.com/v1/responses"),
            WireFormat::Responses
        );
        assert_eq!(
            WireFormat::detect("https://api.openai.com/v1/responses/?x=1"),
            WireFormat::Responses
        );
        assert_eq!(
            WireFormat::detect("https://api.openai.com/v1/chat/completions"),
            WireFormat::ChatCompletions
        );
        assert_eq!(WireFormat::detect("http://localhost:11434"), WireFormat::ChatCompletions);
    }

    #[test]
    fn resolves_bare_bases() {
        assert_eq!(
            resolve_request_url("http://localhost:11434/"),
            "http://localhost:11434/v1/chat/completions"
        );
        assert_eq!(
            resolve_request_url("https://openrouter.ai/api/v1"),
            "https://openrouter.ai/api/v1/chat/completions"
        );
        assert_eq!(
            resolve_request_url("https://generativelanguage.googleapis.com/v1beta/openai"),
            "https://generativelanguage.googleapis.com/v1beta/openai/chat/completions"
        );
        assert_eq!(
            resolve_request_url("https://api.openai.com/v1/responses"),
            "https://api.openai.com/v1/responses"
        );
        assert_eq!(
            resolve_request_url(
                "https://x.openai.azure.com/openai/deployments/d/chat/completions?api-version=2024-10-21"
            ),
            "https://x.openai.azure.com/openai/deployments/d/chat/completions?api-version=2024-10-21"
        );
    }

    #[test]
    fn derives_embeddings_url() {
        assert_eq!(
            embeddings_url("https://api.openai.com/v1/chat/completions"),
            "https://api.openai.com/v1/embeddings"
        );
        assert_eq!(
            embeddings_url("https://api.openai.com/v1/responses"),
            "https://api.openai.com/v1/embeddings"
        );
        assert_eq!(
            embeddings_url("http://localhost:11434"),
            "http://localhost:11434/v1/embeddings"
        );
    }
}
