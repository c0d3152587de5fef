//! Agent registry keyed by route id

use super::AgentInvoker;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Read-only map from agent id to invoker, built once at startup
#[derive(Clone, Default)]
pub struct AgentRegistry {
    agents: BTreeMap<String, Arc<dyn AgentInvoker>>,
}

impl AgentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style registration; a repeated id replaces the earlier invoker
    pub fn with_agent(mut self, id: impl Into<String>, invoker: Arc<dyn AgentInvoker>) -> Self {
        self.agents.insert(id.into(), invoker);
        self
    }

    pub fn get(&self, id: &str) -> Option<Arc<dyn AgentInvoker>> {
        self.agents.get(id).cloned()
    }

    /// Registered ids in sorted order
    pub fn ids(&self) -> Vec<String> {
        self.agents.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.agents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }
}

impl std::fmt::Debug for AgentRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AgentRegistry")
            .field("agents", &self.ids())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::mocks::MockInvoker;

    #[test]
    fn test_ids_are_sorted() {
        let registry = AgentRegistry::new()
            .with_agent("weatherAgent", Arc::new(MockInvoker::replying("sunny")))
            .with_agent("playStoreAgent", Arc::new(MockInvoker::replying("4.5")));

        assert_eq!(registry.ids(), vec!["playStoreAgent", "weatherAgent"]);
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_get_unknown_agent() {
        let registry = AgentRegistry::new();
        assert!(registry.is_empty());
        assert!(registry.get("playStoreAgent").is_none());
    }
}
