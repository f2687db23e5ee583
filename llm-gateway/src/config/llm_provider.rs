use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error_handler::ConfigError;

/// Provider (backend family) behind an endpoint.
///
/// The provider selects the reasoning profile rows used to shape requests
/// (see [`crate::reasoning::profiles`]). Any OpenAI-compatible server that is
/// not recognised is [`LlmProvider::Custom`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LlmProvider {
    /// OpenAI (and Azure OpenAI).
    OpenAI,
    /// Anthropic's OpenAI-compatible endpoint.
    Anthropic,
    /// Google Gemini's OpenAI-compatible endpoint.
    Gemini,
    /// DeepSeek.
    DeepSeek,
    /// Alibaba DashScope / Qwen.
    Qwen,
    /// OpenRouter aggregator.
    OpenRouter,
    /// xAI Grok.
    Xai,
    /// Local Ollama runtime.
    Ollama,
    /// Anything else speaking the OpenAI wire protocol.
    Custom,
}

/// Substrings of the endpoint URL that identify a provider, checked in order.
const HOST_HINTS: &[(&str, LlmProvider)] = &[
    ("api.openai.com", LlmProvider::OpenAI),
    ("openai.azure.com", LlmProvider::OpenAI),
    ("anthropic.com", LlmProvider::Anthropic),
    ("generativelanguage.googleapis.com", LlmProvider::Gemini),
    ("deepseek.com", LlmProvider::DeepSeek),
    ("dashscope", LlmProvider::Qwen),
    ("openrouter.ai", LlmProvider::OpenRouter),
    ("api.x.ai", LlmProvider::Xai),
    (":11434", LlmProvider::Ollama),
    ("ollama", LlmProvider::Ollama),
];

impl LlmProvider {
    /// All providers, in table order.
    pub const ALL: [LlmProvider; 9] = [
        LlmProvider::OpenAI,
        LlmProvider::Anthropic,
        LlmProvider::Gemini,
        LlmProvider::DeepSeek,
        LlmProvider::Qwen,
        LlmProvider::OpenRouter,
        LlmProvider::Xai,
        LlmProvider::Ollama,
        LlmProvider::Custom,
    ];

    /// Guesses the provider from the endpoint URL host.
    pub fn detect(endpoint: &str) -> Self {
        let lower = endpoint.to_ascii_lowercase();
        HOST_HINTS
            .iter()
            .find(|(hint, _)| lower.contains(hint))
            .map(|(_, p)| *p)
            .unwrap_or(LlmProvider::Custom)
    }

    /// Stable lowercase name (matches the serde representation).
    pub fn as_str(self) -> &'static str {
        match self {
            LlmProvider::OpenAI => "openai",
            LlmProvider::Anthropic => "anthropic",
            LlmProvider::Gemini => "gemini",
            LlmProvider::DeepSeek => "deepseek",
            LlmProvider::Qwen => "qwen",
            LlmProvider::OpenRouter => "openrouter",
            LlmProvider::Xai => "xai",
            LlmProvider::Ollama => "ollama",
            LlmProvider::Custom => "custom",
        }
    }
}

impl fmt::Display for LlmProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LlmProvider {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        LlmProvider::ALL
            .into_iter()
            .find(|p| p.as_str() == wanted)
            .ok_or(ConfigError::UnsupportedProvider(s.to_string()))
    }
}
