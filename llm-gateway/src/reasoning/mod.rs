//! Reasoning ("thinking effort") levels and the provider profile table.

pub mod profiles;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::config::llm_provider::LlmProvider;
use crate::error_handler::ConfigError;

pub use profiles::{ProviderProfile, ReasoningOption, WireParam, resolve};

/// Requested reasoning effort.
///
/// `Default` means "send no reasoning parameter at all"; the provider's own
/// default applies.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum ReasoningLevel {
    #[default]
    Default,
    Minimal,
    Low,
    Medium,
    High,
    Xhigh,
}

impl ReasoningLevel {
    /// Canonical presentation order.
    pub const ALL: [ReasoningLevel; 6] = [
        ReasoningLevel::Default,
        ReasoningLevel::Minimal,
        ReasoningLevel::Low,
        ReasoningLevel::Medium,
        ReasoningLevel::High,
        ReasoningLevel::Xhigh,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ReasoningLevel::Default => "default",
            ReasoningLevel::Minimal => "minimal",
            ReasoningLevel::Low => "low",
            ReasoningLevel::Medium => "medium",
            ReasoningLevel::High => "high",
            ReasoningLevel::Xhigh => "xhigh",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            ReasoningLevel::Default => "Default",
            ReasoningLevel::Minimal => "Minimal",
            ReasoningLevel::Low => "Low",
            ReasoningLevel::Medium => "Medium",
            ReasoningLevel::High => "High",
            ReasoningLevel::Xhigh => "Extra high",
        }
    }

    /// Nearest neighbour used when a provider lacks the exact level.
    pub(crate) fn alias(self) -> Option<ReasoningLevel> {
        match self {
            ReasoningLevel::Minimal => Some(ReasoningLevel::Low),
            ReasoningLevel::Xhigh => Some(ReasoningLevel::High),
            _ => None,
        }
    }
}

impl fmt::Display for ReasoningLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReasoningLevel {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase().replace(['-', '_', ' '], "");
        match wanted.as_str() {
            "" | "default" | "auto" => Ok(ReasoningLevel::Default),
            "extrahigh" => Ok(ReasoningLevel::Xhigh),
            other => ReasoningLevel::ALL
                .into_iter()
                .find(|l| l.as_str() == other)
                .ok_or_else(|| ConfigError::UnknownReasoningLevel(s.to_string())),
        }
    }
}

/// Caller's reasoning choice for one request. Never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ReasoningSelection {
    pub provider: LlmProvider,
    pub level: ReasoningLevel,
}

impl ReasoningSelection {
    pub fn new(provider: LlmProvider, level: ReasoningLevel) -> Self {
        Self { provider, level }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_level_spellings() {
        assert_eq!("X-High".parse::<ReasoningLevel>().ok(), Some(ReasoningLevel::Xhigh));
        assert_eq!("extra high".parse::<ReasoningLevel>().ok(), Some(ReasoningLevel::Xhigh));
        assert_eq!("".parse::<ReasoningLevel>().ok(), Some(ReasoningLevel::Default));
        assert_eq!("medium".parse::<ReasoningLevel>().ok(), Some(ReasoningLevel::Medium));
        assert!("turbo".parse::<ReasoningLevel>().is_err());
    }

    #[test]
    fn aliases_collapse_edges() {
        assert_eq!(ReasoningLevel::Minimal.alias(), Some(ReasoningLevel::Low));
        assert_eq!(ReasoningLevel::Xhigh.alias(), Some(ReasoningLevel::High));
        assert_eq!(ReasoningLevel::Medium.alias(), None);
    }
}
