//! Declarative provider reasoning profiles.
//!
//! Each provider has an ordered list of `(model pattern, profile)` rows and a
//! provider-level default. [`resolve`] is the only lookup: adding a model
//! family means adding a row here, never touching request-building code.

use std::sync::LazyLock;

use regex::{Regex, RegexBuilder};
use tracing::error;

use super::ReasoningLevel;
use crate::config::llm_provider::LlmProvider;

/// How one reasoning level is expressed on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WireParam {
    /// `reasoning_effort: "<effort>"` on chat bodies, `reasoning: {effort}` on responses bodies.
    Effort(&'static str),
    /// `reasoning: {effort}` on every wire format (OpenRouter).
    NestedEffort(&'static str),
    /// `thinking: {type: "enabled", budget_tokens}` (Anthropic).
    ThinkingBudget(u32),
    /// `enable_thinking: <bool>` (Qwen / DashScope).
    EnableThinking(bool),
    /// `think: <bool>` (Ollama).
    Think(bool),
}

/// Static reasoning capabilities of one model family.
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderProfile {
    /// Stable row identifier, used in logs.
    pub id: &'static str,
    pub supports_reasoning: bool,
    /// Level the provider applies when nothing is requested; also the
    /// fallback target after a reasoning rejection.
    pub default_level: ReasoningLevel,
    /// Levels offered to callers, in presentation order.
    pub enabled_levels: &'static [ReasoningLevel],
    pub level_params: &'static [(ReasoningLevel, WireParam)],
    /// Drop `temperature` whenever a reasoning parameter is sent.
    pub omit_temperature: bool,
    /// Chat completions take `max_completion_tokens` instead of `max_tokens`.
    pub completion_tokens_field: bool,
}

/// One entry of the option list presented to a caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReasoningOption {
    pub level: ReasoningLevel,
    pub label: &'static str,
    pub enabled: bool,
}

impl ProviderProfile {
    /// Wire parameter for `level`, applying the `minimal→low` / `xhigh→high`
    /// aliases when the exact level is missing.
    pub fn wire_param(&self, level: ReasoningLevel) -> Option<WireParam> {
        let applied = self.effective_level(level);
        if applied == ReasoningLevel::Default {
            return None;
        }
        self.lookup(applied)
    }

    /// Level that is actually sent for a request of `level`.
    ///
    /// `Default` when the profile cannot express it.
    pub fn effective_level(&self, level: ReasoningLevel) -> ReasoningLevel {
        if !self.supports_reasoning || level == ReasoningLevel::Default {
            return ReasoningLevel::Default;
        }
        if self.lookup(level).is_some() {
            return level;
        }
        match level.alias() {
            Some(alias) if self.lookup(alias).is_some() => alias,
            _ => ReasoningLevel::Default,
        }
    }

    pub fn is_enabled(&self, level: ReasoningLevel) -> bool {
        self.enabled_levels.contains(&level)
    }

    /// All levels in canonical order with their enabled flag.
    pub fn options(&self) -> Vec<ReasoningOption> {
        ReasoningLevel::ALL
            .into_iter()
            .map(|level| ReasoningOption {
                level,
                label: level.label(),
                enabled: self.is_enabled(level),
            })
            .collect()
    }

    fn lookup(&self, level: ReasoningLevel) -> Option<WireParam> {
        self.level_params
            .iter()
            .find(|(l, _)| *l == level)
            .map(|(_, p)| *p)
    }
}

/* ------------------------------------------------------------------------- */
/* Profiles                                                                  */
/* ------------------------------------------------------------------------- */

use ReasoningLevel::{Default as Dflt, High, Low, Medium, Minimal, Xhigh};

const NO_REASONING: ProviderProfile = ProviderProfile {
    id: "no-reasoning",
    supports_reasoning: false,
    default_level: Dflt,
    enabled_levels: &[Dflt],
    level_params: &[],
    omit_temperature: false,
    completion_tokens_field: false,
};

const OPENAI_FIXED_SAMPLING: ProviderProfile = ProviderProfile {
    id: "openai-o1-legacy",
    supports_reasoning: false,
    default_level: Dflt,
    enabled_levels: &[Dflt],
    level_params: &[],
    omit_temperature: true,
    completion_tokens_field: true,
};

const OPENAI_O_SERIES: ProviderProfile = ProviderProfile {
    id: "openai-o-series",
    supports_reasoning: true,
    default_level: Medium,
    enabled_levels: &[Dflt, Low, Medium, High],
    level_params: &[
        (Low, WireParam::Effort("low")),
        (Medium, WireParam::Effort("medium")),
        (High, WireParam::Effort("high")),
    ],
    omit_temperature: true,
    completion_tokens_field: true,
};

const OPENAI_GPT5: ProviderProfile = ProviderProfile {
    id: "openai-gpt-5",
    supports_reasoning: true,
    default_level: Medium,
    enabled_levels: &[Dflt, Minimal, Low, Medium, High],
    level_params: &[
        (Minimal, WireParam::Effort("minimal")),
        (Low, WireParam::Effort("low")),
        (Medium, WireParam::Effort("medium")),
        (High, WireParam::Effort("high")),
    ],
    omit_temperature: true,
    completion_tokens_field: true,
};

const OPENAI_GPT5_XHIGH: ProviderProfile = ProviderProfile {
    id: "openai-gpt-5-xhigh",
    supports_reasoning: true,
    default_level: Medium,
    enabled_levels: &[Dflt, Low, Medium, High, Xhigh],
    level_params: &[
        (Low, WireParam::Effort("low")),
        (Medium, WireParam::Effort("medium")),
        (High, WireParam::Effort("high")),
        (Xhigh, WireParam::Effort("xhigh")),
    ],
    omit_temperature: true,
    completion_tokens_field: true,
};

const ANTHROPIC_THINKING: ProviderProfile = ProviderProfile {
    id: "anthropic-thinking",
    supports_reasoning: true,
    default_level: Dflt,
    enabled_levels: &[Dflt, Low, Medium, High],
    level_params: &[
        (Low, WireParam::ThinkingBudget(1024)),
        (Medium, WireParam::ThinkingBudget(4096)),
        (High, WireParam::ThinkingBudget(16384)),
    ],
    omit_temperature: true,
    completion_tokens_field: false,
};

const GEMINI_THINKING: ProviderProfile = ProviderProfile {
    id: "gemini-thinking",
    supports_reasoning: true,
    default_level: Dflt,
    enabled_levels: &[Dflt, Low, Medium, High],
    level_params: &[
        (Low, WireParam::Effort("low")),
        (Medium, WireParam::Effort("medium")),
        (High, WireParam::Effort("high")),
    ],
    omit_temperature: false,
    completion_tokens_field: false,
};

const QWEN_THINKING: ProviderProfile = ProviderProfile {
    id: "qwen-thinking",
    supports_reasoning: true,
    default_level: Dflt,
    enabled_levels: &[Dflt, Minimal, High],
    level_params: &[
        (Minimal, WireParam::EnableThinking(false)),
        (Low, WireParam::EnableThinking(true)),
        (Medium, WireParam::EnableThinking(true)),
        (High, WireParam::EnableThinking(true)),
    ],
    omit_temperature: false,
    completion_tokens_field: false,
};

const OPENROUTER_EFFORT: ProviderProfile = ProviderProfile {
    id: "openrouter-effort",
    supports_reasoning: true,
    default_level: Dflt,
    enabled_levels: &[Dflt, Low, Medium, High],
    level_params: &[
        (Low, WireParam::NestedEffort("low")),
        (Medium, WireParam::NestedEffort("medium")),
        (High, WireParam::NestedEffort("high")),
    ],
    omit_temperature: false,
    completion_tokens_field: false,
};

const XAI_MINI: ProviderProfile = ProviderProfile {
    id: "xai-grok-mini",
    supports_reasoning: true,
    default_level: Low,
    enabled_levels: &[Dflt, Low, High],
    level_params: &[
        (Low, WireParam::Effort("low")),
        (High, WireParam::Effort("high")),
    ],
    omit_temperature: false,
    completion_tokens_field: false,
};

const OLLAMA_THINK: ProviderProfile = ProviderProfile {
    id: "ollama-think",
    supports_reasoning: true,
    default_level: Dflt,
    enabled_levels: &[Dflt, Minimal, High],
    level_params: &[
        (Minimal, WireParam::Think(false)),
        (Low, WireParam::Think(true)),
        (Medium, WireParam::Think(true)),
        (High, WireParam::Think(true)),
    ],
    omit_temperature: false,
    completion_tokens_field: false,
};

const CUSTOM_EFFORT: ProviderProfile = ProviderProfile {
    id: "custom-effort",
    supports_reasoning: true,
    default_level: Dflt,
    enabled_levels: &[Dflt, Low, Medium, High],
    level_params: &[
        (Low, WireParam::Effort("low")),
        (Medium, WireParam::Effort("medium")),
        (High, WireParam::Effort("high")),
    ],
    omit_temperature: false,
    completion_tokens_field: false,
};

/* ------------------------------------------------------------------------- */
/* Rule table                                                                */
/* ------------------------------------------------------------------------- */

struct Rule {
    provider: LlmProvider,
    pattern: &'static str,
    profile: &'static ProviderProfile,
}

/// Ordered rows; the first match for a provider wins.
const RULES: &[Rule] = &[
    Rule {
        provider: LlmProvider::OpenAI,
        pattern: r"^o1-(mini|preview)",
        profile: &OPENAI_FIXED_SAMPLING,
    },
    Rule {
        provider: LlmProvider::OpenAI,
        pattern: r"^o[134](-|$)",
        profile: &OPENAI_O_SERIES,
    },
    Rule {
        provider: LlmProvider::OpenAI,
        pattern: r"^gpt-5(\.\d+)?-chat",
        profile: &NO_REASONING,
    },
    Rule {
        provider: LlmProvider::OpenAI,
        pattern: r"^gpt-5\.1-codex-max|^gpt-5\.[2-9]",
        profile: &OPENAI_GPT5_XHIGH,
    },
    Rule {
        provider: LlmProvider::OpenAI,
        pattern: r"^gpt-5",
        profile: &OPENAI_GPT5,
    },
    Rule {
        provider: LlmProvider::Anthropic,
        pattern: r"claude-(3-7|sonnet-4|opus-4|haiku-4|4)",
        profile: &ANTHROPIC_THINKING,
    },
    Rule {
        provider: LlmProvider::Gemini,
        pattern: r"gemini-(2\.5|3)",
        profile: &GEMINI_THINKING,
    },
    Rule {
        provider: LlmProvider::Qwen,
        pattern: r"^(qwen3|qwq|qwen-plus|qwen-turbo|qwen-flash)",
        profile: &QWEN_THINKING,
    },
    Rule {
        provider: LlmProvider::Xai,
        pattern: r"grok-3-mini",
        profile: &XAI_MINI,
    },
    Rule {
        provider: LlmProvider::Ollama,
        pattern: r"(qwen3|deepseek-r1|gpt-oss|magistral|qwq)",
        profile: &OLLAMA_THINK,
    },
];

fn provider_default(provider: LlmProvider) -> &'static ProviderProfile {
    match provider {
        LlmProvider::OpenRouter => &OPENROUTER_EFFORT,
        LlmProvider::Custom => &CUSTOM_EFFORT,
        _ => &NO_REASONING,
    }
}

static COMPILED: LazyLock<Vec<(LlmProvider, Regex, &'static ProviderProfile)>> =
    LazyLock::new(|| {
        RULES
            .iter()
            .filter_map(|rule| {
                match RegexBuilder::new(rule.pattern).case_insensitive(true).build() {
                    Ok(re) => Some((rule.provider, re, rule.profile)),
                    Err(e) => {
                        error!(pattern = rule.pattern, error = %e, "invalid reasoning profile pattern");
                        None
                    }
                }
            })
            .collect()
    });

/// Resolves the reasoning profile for `model` served by `provider`.
///
/// Model names match case-insensitively; when no row matches the provider's
/// default profile is returned.
pub fn resolve(provider: LlmProvider, model: &str) -> &'static ProviderProfile {
    let model = model.trim();
    COMPILED
        .iter()
        .filter(|(p, _, _)| *p == provider)
        .find(|(_, re, _)| re.is_match(model))
        .map(|(_, _, profile)| *profile)
        .unwrap_or_else(|| provider_default(provider))
}
