//! Endpoint configuration: profiles, providers and wire-format detection.

pub mod default_config;
pub mod endpoint_profile;
pub mod llm_provider;
pub mod wire;
