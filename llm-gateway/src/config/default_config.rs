//! Endpoint profiles loaded from environment variables.
//!
//! Convenience constructors for the binary; library calls take plain structs.
//!
//! # Environment variables
//!
//! Per profile slot `<n>` in `1..=4`:
//! - `LLM_PROFILE_<n>_URL`         = endpoint URL (mandatory for a configured slot)
//! - `LLM_PROFILE_<n>_MODEL`       = model name (mandatory for a configured slot)
//! - `LLM_PROFILE_<n>_API_KEY`     = bearer token (optional)
//! - `LLM_PROFILE_<n>_TEMPERATURE` = sampling temperature (optional)
//! - `LLM_PROFILE_<n>_MAX_TOKENS`  = output token budget (optional)
//! - `LLM_PROFILE_<n>_PROVIDER`    = provider override (optional, detected from URL otherwise)
//!
//! Global:
//! - `LLM_ACTIVE_PROFILE`   = active slot (default `1`)
//! - `LLM_SYSTEM_PROMPT`    = custom system prompt override
//! - `LLM_REASONING_LEVEL`  = requested reasoning level (default `default`)
//! - `EMBEDDING_URL`, `EMBEDDING_MODEL`, `EMBEDDING_API_KEY`

use crate::{
    config::{endpoint_profile::EndpointProfile, llm_provider::LlmProvider, wire},
    error_handler::{ConfigError, LlmError, Result, env_opt, env_opt_f32, env_opt_u32},
    reasoning::ReasoningLevel,
    services::embeddings_service::EmbeddingConfig,
};

/// Number of independently configurable profile slots.
pub const PROFILE_SLOTS: usize = 4;

/// Default embedding model when `EMBEDDING_MODEL` is unset.
pub const DEFAULT_EMBEDDING_MODEL: &str = "text-embedding-3-small";

/// Loads profile slot `slot` (1-based).
///
/// Returns `Ok(None)` when neither the URL nor the model is set.
///
/// # Errors
/// - [`ConfigError::MissingVar`] when only one of URL/model is set
/// - [`ConfigError::InvalidNumber`] for malformed temperature/max tokens
/// - [`ConfigError::UnsupportedProvider`] for an unknown provider override
pub fn profile_from_env(slot: usize) -> Result<Option<EndpointProfile>> {
    let var = |suffix: &str| format!("LLM_PROFILE_{slot}_{suffix}");

    let url = env_opt(&var("URL"));
    let model = env_opt(&var("MODEL"));
    let (endpoint, model) = match (url, model) {
        (None, None) => return Ok(None),
        (Some(u), Some(m)) => (u, m),
        (None, Some(_)) => return Err(ConfigError::MissingVar(var("URL")).into()),
        (Some(_), None) => return Err(ConfigError::MissingVar(var("MODEL")).into()),
    };

    let mut profile = EndpointProfile::new(endpoint, model).with_name(format!("profile-{slot}"));
    profile.api_key = env_opt(&var("API_KEY"));
    profile.temperature = env_opt_f32(&var("TEMPERATURE"))?;
    profile.max_tokens = env_opt_u32(&var("MAX_TOKENS"))?;
    if let Some(p) = env_opt(&var("PROVIDER")) {
        profile.provider = p.parse::<LlmProvider>()?;
    }
    profile.validate()?;
    Ok(Some(profile))
}

/// Loads every configured slot, in slot order.
pub fn profiles_from_env() -> Result<Vec<EndpointProfile>> {
    let mut out = Vec::with_capacity(PROFILE_SLOTS);
    for slot in 1..=PROFILE_SLOTS {
        if let Some(p) = profile_from_env(slot)? {
            out.push(p);
        }
    }
    Ok(out)
}

/// Active slot from `LLM_ACTIVE_PROFILE` (default `1`), or the `requested` override.
///
/// # Errors
/// [`ConfigError::UnknownProfile`] when the slot is outside `1..=4` or not configured.
pub fn active_profile_from_env(requested: Option<usize>) -> Result<EndpointProfile> {
    let slot = match requested {
        Some(s) => s,
        None => env_opt_u32("LLM_ACTIVE_PROFILE")?.map(|s| s as usize).unwrap_or(1),
    };
    if !(1..=PROFILE_SLOTS).contains(&slot) {
        return Err(ConfigError::UnknownProfile(slot).into());
    }
    profile_from_env(slot)?.ok_or_else(|| LlmError::from(ConfigError::UnknownProfile(slot)))
}

/// Custom system prompt override (`LLM_SYSTEM_PROMPT`).
pub fn system_prompt_from_env() -> Option<String> {
    env_opt("LLM_SYSTEM_PROMPT")
}

/// Requested reasoning level (`LLM_REASONING_LEVEL`, default `default`).
pub fn reasoning_level_from_env() -> Result<ReasoningLevel> {
    match env_opt("LLM_REASONING_LEVEL") {
        Some(v) => Ok(v.parse::<ReasoningLevel>()?),
        None => Ok(ReasoningLevel::Default),
    }
}

/// Embedding endpoint config; falls back to the active chat profile's host and key.
pub fn embedding_config_from_env(chat: &EndpointProfile) -> EmbeddingConfig {
    let endpoint = env_opt("EMBEDDING_URL")
        .map(|u| wire::embeddings_url(&u))
        .unwrap_or_else(|| wire::embeddings_url(&chat.endpoint));
    EmbeddingConfig {
        endpoint,
        model: env_opt("EMBEDDING_MODEL").unwrap_or_else(|| DEFAULT_EMBEDDING_MODEL.to_string()),
        api_key: env_opt("EMBEDDING_API_KEY").or_else(|| chat.api_key.clone()),
    }
}
