//! Common types for the Refuge environment abstraction.

use serde::{Deserialize, Serialize};

/// Stable identifier of a simulated agent, as assigned by the environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct AgentId(pub u64);

impl AgentId {
    /// Returns the raw numeric id.
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for AgentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "agent#{}", self.0)
    }
}

/// Lightweight handle to one agent inside the graph structures.
///
/// Handles are dense indices handed out by [`crate::AgentRegistry`]. The same
/// agent is the same handle in every graph, so membership checks across the
/// topology mirror and both member subgraphs agree by construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct VertexId(pub u32);

impl VertexId {
    /// Returns the handle as a slot index.
    pub fn index(&self) -> usize {
        self.0 as usize
    }
}

impl std::fmt::Display for VertexId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "v{}", self.0)
    }
}

/// A change notification emitted by the environment collaborators.
///
/// Topology variants come from the neighbor-selection logic, the
/// `AgentStateChanged` variant from the agent model whenever an attribute
/// that may affect classification was written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Notification {
    VertexAdded(VertexId),
    VertexRemoved(VertexId),
    EdgeAdded(VertexId, VertexId),
    EdgeRemoved(VertexId, VertexId),
    AgentStateChanged(VertexId),
}

impl Notification {
    /// Returns true for the four topology variants.
    pub fn is_topology(&self) -> bool {
        !matches!(self, Notification::AgentStateChanged(_))
    }
}

impl std::fmt::Display for Notification {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Notification::VertexAdded(v) => write!(f, "vertex-added({})", v),
            Notification::VertexRemoved(v) => write!(f, "vertex-removed({})", v),
            Notification::EdgeAdded(u, v) => write!(f, "edge-added({}, {})", u, v),
            Notification::EdgeRemoved(u, v) => write!(f, "edge-removed({}, {})", u, v),
            Notification::AgentStateChanged(v) => write!(f, "state-changed({})", v),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vertex_ordering_follows_index() {
        assert!(VertexId(1) < VertexId(2));
        assert_eq!(VertexId(7).index(), 7);
    }

    #[test]
    fn test_notification_display() {
        let n = Notification::EdgeAdded(VertexId(1), VertexId(4));
        assert_eq!(n.to_string(), "edge-added(v1, v4)");
        assert!(n.is_topology());
        assert!(!Notification::AgentStateChanged(VertexId(0)).is_topology());
    }

    #[test]
    fn test_notification_serde() {
        let n = Notification::VertexRemoved(VertexId(3));
        let json = serde_json::to_string(&n).unwrap();
        let back: Notification = serde_json::from_str(&json).unwrap();
        assert_eq!(n, back);
    }
}
