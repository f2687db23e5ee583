use crate::config::llm_provider::LlmProvider;
use crate::config::wire::{self, WireFormat};
use crate::error_handler::{ConfigError, Result, validate_http_endpoint, validate_range_f32};

/// One configured chat endpoint.
///
/// Up to four of these are configured side by side (see
/// [`crate::config::default_config`]); the caller passes the active one with
/// every request. The gateway never reads configuration storage itself.
///
/// # Examples
///
/// ```
/// use llm_gateway::{EndpointProfile, LlmProvider, WireFormat};
///
/// let p = EndpointProfile::new("https://api.openai.com/v1/responses", "gpt-5")
///     .with_api_key("sk-...")
///     .with_temperature(0.3);
/// assert_eq!(p.provider, LlmProvider::OpenAI);
/// assert_eq!(p.wire_format(), WireFormat::Responses);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct EndpointProfile {
    /// Display name of the profile (e.g. `profile-1`).
    pub name: String,

    /// Provider family; selects reasoning profile rows.
    pub provider: LlmProvider,

    /// Model identifier (e.g. `"gpt-5"`, `"qwen3:14b"`).
    pub model: String,

    /// Endpoint URL: a base URL or a full `/chat/completions` / `/responses` URL.
    pub endpoint: String,

    /// Optional bearer token.
    pub api_key: Option<String>,

    /// Sampling temperature.
    pub temperature: Option<f32>,

    /// Output token budget.
    pub max_tokens: Option<u32>,
}

impl EndpointProfile {
    /// Creates a profile with the provider detected from the URL.
    pub fn new(endpoint: impl Into<String>, model: impl Into<String>) -> Self {
        let endpoint = endpoint.into();
        Self {
            name: "default".to_string(),
            provider: LlmProvider::detect(&endpoint),
            model: model.into(),
            endpoint,
            api_key: None,
            temperature: None,
            max_tokens: None,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_provider(mut self, provider: LlmProvider) -> Self {
        self.provider = provider;
        self
    }

    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    /// Checks that the profile can be used for a request.
    ///
    /// # Errors
    /// - [`ConfigError::MissingEndpoint`] when the URL is blank
    /// - [`ConfigError::InvalidFormat`] when the URL has no http(s) scheme
    /// - [`ConfigError::EmptyModel`] when the model is blank
    /// - [`ConfigError::OutOfRange`] when the temperature is outside `0.0..=2.0`
    pub fn validate(&self) -> Result<()> {
        let endpoint = self.endpoint.trim();
        if endpoint.is_empty() {
            return Err(ConfigError::MissingEndpoint.into());
        }
        validate_http_endpoint(&self.name, endpoint)?;
        if self.model.trim().is_empty() {
            return Err(ConfigError::EmptyModel.into());
        }
        if let Some(t) = self.temperature {
            validate_range_f32("temperature", t, 0.0, 2.0)?;
        }
        Ok(())
    }

    /// Wire format expected by the endpoint.
    pub fn wire_format(&self) -> WireFormat {
        WireFormat::detect(&self.endpoint)
    }

    /// Fully resolved completion URL.
    pub fn request_url(&self) -> String {
        wire::resolve_request_url(&self.endpoint)
    }

    /// Bearer token, if a non-blank one is configured.
    pub fn bearer(&self) -> Option<&str> {
        self.api_key.as_deref().map(str::trim).filter(|k| !k.is_empty())
    }
}
