use std::collections::HashMap;
use std::sync::Arc;

use encore_core::types::Rail;

use crate::error::RailError;
use crate::traits::RailAdapter;

/// Registry dispatching operations to the adapter serving each rail.
pub struct RailAdapterRegistry {
    adapters: HashMap<Rail, Arc<dyn RailAdapter>>,
}

impl RailAdapterRegistry {
    /// Create a new registry with no adapters registered.
    pub fn new() -> Self {
        Self {
            adapters: HashMap::new(),
        }
    }

    /// Register an adapter under the rail it reports.
    pub fn register(&mut self, adapter: Arc<dyn RailAdapter>) {
        let rail = adapter.rail();
        tracing::info!(rail = %rail, "registering rail adapter");
        self.adapters.insert(rail, adapter);
    }

    /// Unregister the adapter for a rail.
    pub fn unregister(&mut self, rail: Rail) -> Option<Arc<dyn RailAdapter>> {
        self.adapters.remove(&rail)
    }

    /// Get the adapter for a rail.
    pub fn get(&self, rail: Rail) -> Result<Arc<dyn RailAdapter>, RailError> {
        self.adapters
            .get(&rail)
            .cloned()
            .ok_or(RailError::AdapterNotFound(rail))
    }

    /// Whether a rail has an adapter.
    pub fn contains(&self, rail: Rail) -> bool {
        self.adapters.contains_key(&rail)
    }

    /// List the registered rails.
    pub fn rails(&self) -> Vec<Rail> {
        self.adapters.keys().copied().collect()
    }

    /// Number of registered adapters.
    pub fn count(&self) -> usize {
        self.adapters.len()
    }
}

impl Default for RailAdapterRegistry {
    fn default() -> Self {
        Self::new()
    }
}
