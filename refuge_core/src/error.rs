//! Error types for the Refuge engine.

use refuge_env::{EnvError, VertexId};
use thiserror::Error;

/// Errors produced while applying notifications or answering queries.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EngineError {
    /// An event referenced a vertex or edge that is not where it must be
    #[error("Precondition violated: {0}")]
    PreconditionViolation(String),

    /// The partition predicate or an attribute lookup failed
    #[error("Predicate evaluation failed for {vertex}: {source}")]
    PredicateEvaluation {
        vertex: VertexId,
        #[source]
        source: EnvError,
    },

    /// The member-subgraph partition is broken. Not recoverable.
    #[error("Invariant violated: {0}")]
    InvariantViolation(String),
}

impl EngineError {
    /// Creates a precondition violation.
    pub fn precondition(msg: impl Into<String>) -> Self {
        Self::PreconditionViolation(msg.into())
    }

    /// Creates an invariant violation.
    pub fn invariant(msg: impl Into<String>) -> Self {
        Self::InvariantViolation(msg.into())
    }

    /// Wraps a failed lookup for `vertex`.
    pub fn predicate(vertex: VertexId, source: EnvError) -> Self {
        Self::PredicateEvaluation { vertex, source }
    }

    /// True for errors the notification boundary may log and drop.
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, EngineError::InvariantViolation(_))
    }
}

/// Result alias used across the engine.
pub type EngineResult<T> = Result<T, EngineError>;
