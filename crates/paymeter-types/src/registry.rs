//! External capability registries, consumed as narrow read-only queries.
//!
//! The host-staking registry and the token-weighted model-approval process
//! are external collaborators — their internals are out of scope here. The
//! lifecycle controller only asks capability questions, so both are modeled
//! as traits with in-memory substitutes for tests.

use crate::{Address, Amount, ModelId};

/// Read-only view of the external host-staking/capability registry.
pub trait HostRegistry: Send + Sync {
    /// Is this address a registered, staked host?
    fn is_registered(&self, host: &Address) -> bool;

    /// The minimum per-unit price the host accepts. `None` when the host
    /// is not registered.
    fn min_price(&self, host: &Address) -> Option<Amount>;

    /// Does the host advertise support for this model?
    fn supports_model(&self, host: &Address, model: &ModelId) -> bool;
}

/// Read-only view of the external model-approval governance outcome.
pub trait ModelRegistry: Send + Sync {
    /// Is this model identifier currently approved?
    fn is_approved(&self, model: &ModelId) -> bool;
}

// ---------------------------------------------------------------------------
// In-memory substitutes for tests
// ---------------------------------------------------------------------------

/// Static host table for tests. **Never use in production.**
#[cfg(any(test, feature = "test-helpers"))]
#[derive(Debug, Default)]
pub struct StaticHostRegistry {
    hosts: std::collections::HashMap<Address, StaticHostEntry>,
}

#[cfg(any(test, feature = "test-helpers"))]
#[derive(Debug)]
struct StaticHostEntry {
    min_price: Amount,
    models: std::collections::HashSet<ModelId>,
}

#[cfg(any(test, feature = "test-helpers"))]
impl StaticHostRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a host accepting any model in `models` at `min_price`.
    #[must_use]
    pub fn with_host(
        mut self,
        host: Address,
        min_price: Amount,
        models: impl IntoIterator<Item = ModelId>,
    ) -> Self {
        self.hosts.insert(
            host,
            StaticHostEntry {
                min_price,
                models: models.into_iter().collect(),
            },
        );
        self
    }
}

#[cfg(any(test, feature = "test-helpers"))]
impl HostRegistry for StaticHostRegistry {
    fn is_registered(&self, host: &Address) -> bool {
        self.hosts.contains_key(host)
    }

    fn min_price(&self, host: &Address) -> Option<Amount> {
        self.hosts.get(host).map(|entry| entry.min_price)
    }

    fn supports_model(&self, host: &Address, model: &ModelId) -> bool {
        self.hosts
            .get(host)
            .is_some_and(|entry| entry.models.contains(model))
    }
}

/// Static approval set for tests. **Never use in production.**
#[cfg(any(test, feature = "test-helpers"))]
#[derive(Debug, Default)]
pub struct StaticModelRegistry {
    approved: std::collections::HashSet<ModelId>,
}

#[cfg(any(test, feature = "test-helpers"))]
impl StaticModelRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_model(mut self, model: ModelId) -> Self {
        self.approved.insert(model);
        self
    }
}

#[cfg(any(test, feature = "test-helpers"))]
impl ModelRegistry for StaticModelRegistry {
    fn is_approved(&self, model: &ModelId) -> bool {
        self.approved.contains(model)
    }
}
