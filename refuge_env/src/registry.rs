//! Agent registry: the single owner of agent identity.

use crate::error::EnvError;
use crate::types::{AgentId, VertexId};
use std::collections::HashMap;

/// Maps stable agent ids to dense vertex handles and back.
///
/// Handles are never reused, so a handle held by a graph always refers to
/// the agent it was issued for, even after the agent has been retired.
#[derive(Debug, Default, Clone)]
pub struct AgentRegistry {
    by_agent: HashMap<AgentId, VertexId>,
    agents: Vec<AgentId>,
}

impl AgentRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an agent, returning its handle. Registering the same agent
    /// twice returns the existing handle.
    ///
    /// Fails once `u32::MAX + 1` handles have been issued.
    pub fn register(&mut self, agent: AgentId) -> Result<VertexId, EnvError> {
        if let Some(v) = self.by_agent.get(&agent) {
            return Ok(*v);
        }
        let v = handle_at(self.agents.len())?;
        self.agents.push(agent);
        self.by_agent.insert(agent, v);
        Ok(v)
    }

    /// Resolves an agent to its vertex handle.
    pub fn vertex_of(&self, agent: AgentId) -> Result<VertexId, EnvError> {
        self.by_agent
            .get(&agent)
            .copied()
            .ok_or(EnvError::UnknownAgent(agent))
    }

    /// Resolves a vertex handle back to its agent.
    pub fn agent_of(&self, vertex: VertexId) -> Result<AgentId, EnvError> {
        self.agents
            .get(vertex.index())
            .copied()
            .ok_or(EnvError::UnknownVertex(vertex))
    }

    /// Number of handles ever issued.
    pub fn len(&self) -> usize {
        self.agents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }

    /// Iterates over `(agent, vertex)` pairs in handle order.
    pub fn iter(&self) -> impl Iterator<Item = (AgentId, VertexId)> + '_ {
        // register caps the list at u32 range, so the zip never truncates
        self.agents.iter().copied().zip((0..=u32::MAX).map(VertexId))
    }
}

fn handle_at(index: usize) -> Result<VertexId, EnvError> {
    u32::try_from(index)
        .map(VertexId)
        .map_err(|_| EnvError::HandlesExhausted(index))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_is_idempotent() {
        let mut registry = AgentRegistry::new();
        let a = registry.register(AgentId(42)).unwrap();
        let b = registry.register(AgentId(7)).unwrap();
        assert_eq!(registry.register(AgentId(42)).unwrap(), a);
        assert_ne!(a, b);
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_round_trip_lookup() {
        let mut registry = AgentRegistry::new();
        let v = registry.register(AgentId(9)).unwrap();
        assert_eq!(registry.vertex_of(AgentId(9)).unwrap(), v);
        assert_eq!(registry.agent_of(v).unwrap(), AgentId(9));
    }

    #[test]
    fn test_unknown_lookups_fail() {
        let registry = AgentRegistry::new();
        assert_eq!(
            registry.vertex_of(AgentId(1)),
            Err(EnvError::UnknownAgent(AgentId(1)))
        );
        assert_eq!(
            registry.agent_of(VertexId(0)),
            Err(EnvError::UnknownVertex(VertexId(0)))
        );
    }

    #[test]
    fn test_iter_in_handle_order() {
        let mut registry = AgentRegistry::new();
        registry.register(AgentId(5)).unwrap();
        registry.register(AgentId(3)).unwrap();
        let pairs: Vec<_> = registry.iter().collect();
        assert_eq!(pairs, vec![(AgentId(5), VertexId(0)), (AgentId(3), VertexId(1))]);
    }

    #[test]
    #[cfg(target_pointer_width = "64")]
    fn test_handles_stop_at_u32_range() {
        let last = u32::MAX as usize;
        assert_eq!(handle_at(last), Ok(VertexId(u32::MAX)));
        assert_eq!(handle_at(last + 1), Err(EnvError::HandlesExhausted(last + 1)));
    }
}
