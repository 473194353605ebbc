//! Error types for the Refuge environment abstraction.

use crate::types::{AgentId, VertexId};
use thiserror::Error;

/// Errors raised by the environment collaborators (registry and attribute
/// lookups).
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EnvError {
    /// The vertex handle was never issued by the registry
    #[error("Unknown vertex: {0}")]
    UnknownVertex(VertexId),

    /// No vertex is registered for this agent
    #[error("Unknown agent: {0}")]
    UnknownAgent(AgentId),

    /// Attribute exists but holds a value of another type
    #[error("Attribute '{name}' on {vertex} is {found}, expected {expected}")]
    TypeMismatch {
        vertex: VertexId,
        name: String,
        expected: &'static str,
        found: &'static str,
    },

    /// Every `u32` vertex handle has been issued
    #[error("Vertex handles exhausted after {0} registrations")]
    HandlesExhausted(usize),

    /// Lookup failed inside the collaborator
    #[error("Attribute lookup failed: {0}")]
    LookupFailed(String),
}

impl EnvError {
    /// Creates a lookup failure.
    pub fn lookup(msg: impl Into<String>) -> Self {
        Self::LookupFailed(msg.into())
    }
}
