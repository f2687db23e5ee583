//! Adaptive fallback policies: error classification and the learned-policy cache.
//!
//! Execution lives in [`crate::services::chat_service`]; this module stays
//! free of I/O.

pub mod classifier;
pub mod store;

pub use classifier::{TemperatureRecovery, classify_reasoning, classify_temperature};
pub use store::{
    FallbackMode, FallbackPolicy, InMemoryPolicyStore, PolicyKey, PolicyStore,
};
