//! Learned fallback policies, keyed by `(endpoint, model)`.
//!
//! Read-mostly. Entries are written only after a rejected request was
//! successfully retried, and never expire on their own; callers scope a store
//! per process or per session and may [`PolicyStore::clear`] it.

use std::collections::HashMap;
use std::sync::RwLock;

use serde_json::Value;

/// Cache key: the endpoint URL plus model name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PolicyKey {
    pub endpoint: String,
    pub model: String,
}

impl PolicyKey {
    pub fn new(endpoint: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            model: model.into(),
        }
    }
}

/// Learned correction for the `temperature` parameter.
#[derive(Debug, Clone, PartialEq)]
pub enum FallbackMode {
    /// Send the parameter as built.
    Default,
    /// Drop the parameter.
    OmitParameter,
    /// Replace the parameter with this value.
    FixedValue(Value),
}

#[derive(Debug, Clone, PartialEq)]
pub struct FallbackPolicy {
    pub key: PolicyKey,
    pub mode: FallbackMode,
}

/// Injectable policy cache shared by concurrent requests.
pub trait PolicyStore: Send + Sync {
    /// Learned mode for `key`, `None` when nothing was learned yet.
    fn get(&self, key: &PolicyKey) -> Option<FallbackMode>;

    fn put(&self, policy: FallbackPolicy);

    /// Forgets every learned policy.
    fn clear(&self);
}

/// Process-local [`PolicyStore`].
#[derive(Debug, Default)]
pub struct InMemoryPolicyStore {
    inner: RwLock<HashMap<PolicyKey, FallbackMode>>,
}

impl InMemoryPolicyStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.inner.read().map(|m| m.len()).unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl PolicyStore for InMemoryPolicyStore {
    fn get(&self, key: &PolicyKey) -> Option<FallbackMode> {
        // A poisoned lock only means a writer panicked; the map is still usable.
        let guard = self.inner.read().unwrap_or_else(|e| e.into_inner());
        guard.get(key).cloned()
    }

    fn put(&self, policy: FallbackPolicy) {
        let mut guard = self.inner.write().unwrap_or_else(|e| e.into_inner());
        guard.insert(policy.key, policy.mode);
    }

    fn clear(&self) {
        let mut guard = self.inner.write().unwrap_or_else(|e| e.into_inner());
        guard.clear();
    }
}
