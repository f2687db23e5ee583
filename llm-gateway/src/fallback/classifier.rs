//! Pure classifiers over provider error bodies.
//!
//! Heuristics only: free-text bodies differ between vendors and versions, so
//! every branch here is covered by a corpus of real error strings below.

use std::sync::LazyLock;

use regex::{Regex, RegexBuilder};
use reqwest::StatusCode;
use tracing::error;

/// Correction to apply to the `temperature` field.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TemperatureRecovery {
    Omit,
    Fixed(f64),
}

const REJECTION_MARKERS: &[&str] = &[
    "unsupported",
    "not supported",
    "does not support",
    "invalid",
    "not allowed",
    "not permitted",
    "unrecognized",
    "unknown",
    "extra inputs",
    "out of range",
];

const REASONING_MARKERS: &[&str] = &[
    "reasoning",
    "effort",
    "thinking",
    "enable_thinking",
    "budget_tokens",
];

/// Ollama's `think` flag only counts when named as a parameter.
const THINK_PARAM_PATTERN: &str = r#"["'`]think["'`]|\bthink\s*[:=]"#;

/// Phrases that name the only accepted value; checked before the generic markers.
const FIXED_VALUE_PATTERNS: &[&str] = &[
    r"only the default \((\d+(?:\.\d+)?)\) value is supported",
    r"only (\d+(?:\.\d+)?) is allowed",
    r"temperature (?:must|should|can only) be (?:set to |equal to |exactly )?(\d+(?:\.\d+)?)(?:\D|$)",
    r"temperature is fixed (?:at|to) (\d+(?:\.\d+)?)",
];

fn compile(pattern: &str) -> Option<Regex> {
    match RegexBuilder::new(pattern).case_insensitive(true).build() {
        Ok(re) => Some(re),
        Err(e) => {
            error!(pattern, error = %e, "invalid classifier pattern");
            None
        }
    }
}

static FIXED_VALUE_RES: LazyLock<Vec<Regex>> =
    LazyLock::new(|| FIXED_VALUE_PATTERNS.iter().filter_map(|p| compile(p)).collect());

static THINK_PARAM_RE: LazyLock<Option<Regex>> = LazyLock::new(|| compile(THINK_PARAM_PATTERN));

fn is_parameter_rejection(status: StatusCode) -> bool {
    status == StatusCode::BAD_REQUEST || status == StatusCode::UNPROCESSABLE_ENTITY
}

/// Classifies a rejection of the `temperature` field.
///
/// `None` unless the status is 400/422 and the body mentions `temperature`.
pub fn classify_temperature(status: StatusCode, body: &str) -> Option<TemperatureRecovery> {
    if !is_parameter_rejection(status) {
        return None;
    }
    let lower = body.to_ascii_lowercase();
    if !lower.contains("temperature") {
        return None;
    }

    for re in FIXED_VALUE_RES.iter() {
        if let Some(v) = re
            .captures(&lower)
            .and_then(|c| c.get(1))
            .and_then(|m| m.as_str().parse::<f64>().ok())
        {
            return Some(TemperatureRecovery::Fixed(v));
        }
    }

    REJECTION_MARKERS
        .iter()
        .any(|m| lower.contains(m))
        .then_some(TemperatureRecovery::Omit)
}

/// `true` when a 400/422 body references a reasoning-related parameter.
pub fn classify_reasoning(status: StatusCode, body: &str) -> bool {
    if !is_parameter_rejection(status) {
        return false;
    }
    let lower = body.to_ascii_lowercase();
    REASONING_MARKERS.iter().any(|m| lower.contains(m))
        || THINK_PARAM_RE.as_ref().is_some_and(|re| re.is_match(&lower))
}
