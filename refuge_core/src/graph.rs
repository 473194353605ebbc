//! Mutable undirected graph over agent vertex handles.
//!
//! Every effective mutation returns the [`GraphEvent`]s it caused, so the
//! owner can forward them to whatever observes the graph. There is no
//! listener registry: the call path is explicit and ordered.

use crate::error::{EngineError, EngineResult};
use petgraph::graphmap::UnGraphMap;
use refuge_env::VertexId;
use serde::{Deserialize, Serialize};

/// Unordered vertex pair, stored with the smaller handle first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Edge {
    a: VertexId,
    b: VertexId,
}

impl Edge {
    /// Creates the edge `{u, v}`.
    pub fn new(u: VertexId, v: VertexId) -> Self {
        if u <= v {
            Self { a: u, b: v }
        } else {
            Self { a: v, b: u }
        }
    }

    /// Both endpoints, smaller first.
    pub fn endpoints(&self) -> (VertexId, VertexId) {
        (self.a, self.b)
    }

    pub fn is_loop(&self) -> bool {
        self.a == self.b
    }

    /// Returns the endpoint opposite to `v`, if `v` is an endpoint.
    pub fn other(&self, v: VertexId) -> Option<VertexId> {
        if v == self.a {
            Some(self.b)
        } else if v == self.b {
            Some(self.a)
        } else {
            None
        }
    }
}

impl std::fmt::Display for Edge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{{{},{}}}", self.a, self.b)
    }
}

/// A structural change that actually happened to a graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GraphEvent {
    VertexAdded(VertexId),
    VertexRemoved(VertexId),
    EdgeAdded(Edge),
    EdgeRemoved(Edge),
}

impl GraphEvent {
    /// True for removals, which may split components.
    pub fn is_removal(&self) -> bool {
        matches!(self, GraphEvent::VertexRemoved(_) | GraphEvent::EdgeRemoved(_))
    }
}

/// Simple undirected graph: no self-loops, no parallel edges.
///
/// Storage is a `petgraph` graph map keyed by handle. Iteration is sorted
/// by handle so traversal order and diagnostic dumps do not depend on
/// insertion or removal history.
#[derive(Debug, Clone, Default)]
pub struct Graph {
    name: String,
    inner: UnGraphMap<VertexId, ()>,
}

impl Graph {
    /// Creates an empty graph with a diagnostic name.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            inner: UnGraphMap::new(),
        }
    }

    /// Builds a graph from vertex and edge lists.
    ///
    /// Edges whose endpoints are missing from `vertices` are rejected.
    pub fn from_parts(
        name: impl Into<String>,
        vertices: impl IntoIterator<Item = VertexId>,
        edges: impl IntoIterator<Item = (VertexId, VertexId)>,
    ) -> EngineResult<Self> {
        let mut graph = Self::new(name);
        for v in vertices {
            graph.add_vertex(v);
        }
        for (u, v) in edges {
            graph.add_edge(u, v)?;
        }
        Ok(graph)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Inserts a vertex. Returns `None` when it was already present.
    pub fn add_vertex(&mut self, v: VertexId) -> Option<GraphEvent> {
        if self.inner.contains_node(v) {
            return None;
        }
        self.inner.add_node(v);
        Some(GraphEvent::VertexAdded(v))
    }

    /// Removes a vertex together with its incident edges.
    ///
    /// The returned events list one `EdgeRemoved` per incident edge followed
    /// by the `VertexRemoved`. Empty when the vertex was absent.
    pub fn remove_vertex(&mut self, v: VertexId) -> Vec<GraphEvent> {
        if !self.inner.contains_node(v) {
            return Vec::new();
        }
        let mut events: Vec<GraphEvent> = self
            .neighbors(v)
            .map(|w| GraphEvent::EdgeRemoved(Edge::new(v, w)))
            .collect();
        self.inner.remove_node(v);
        events.push(GraphEvent::VertexRemoved(v));
        events
    }

    /// Inserts the edge `{u, v}`.
    ///
    /// Returns `Ok(None)` if the edge already exists. Self-loops and edges
    /// with a missing endpoint are precondition violations.
    pub fn add_edge(&mut self, u: VertexId, v: VertexId) -> EngineResult<Option<GraphEvent>> {
        if u == v {
            return Err(EngineError::precondition(format!(
                "self-loop on {} rejected by {}",
                u, self.name
            )));
        }
        for endpoint in [u, v] {
            if !self.inner.contains_node(endpoint) {
                return Err(EngineError::precondition(format!(
                    "edge {} references {} which is not in {}",
                    Edge::new(u, v),
                    endpoint,
                    self.name
                )));
            }
        }

        if self.inner.contains_edge(u, v) {
            return Ok(None);
        }
        self.inner.add_edge(u, v, ());
        Ok(Some(GraphEvent::EdgeAdded(Edge::new(u, v))))
    }

    /// Removes the edge `{u, v}`. Returns `None` when it was absent.
    pub fn remove_edge(&mut self, u: VertexId, v: VertexId) -> Option<GraphEvent> {
        self.inner
            .remove_edge(u, v)
            .map(|()| GraphEvent::EdgeRemoved(Edge::new(u, v)))
    }

    pub fn contains_vertex(&self, v: VertexId) -> bool {
        self.inner.contains_node(v)
    }

    pub fn contains_edge(&self, u: VertexId, v: VertexId) -> bool {
        self.inner.contains_edge(u, v)
    }

    /// Neighbors of `v` in handle order. Empty if `v` is absent.
    pub fn neighbors(&self, v: VertexId) -> impl Iterator<Item = VertexId> + '_ {
        let mut neighbors: Vec<VertexId> = self.inner.neighbors(v).collect();
        neighbors.sort_unstable();
        neighbors.into_iter()
    }

    pub fn degree(&self, v: VertexId) -> usize {
        self.inner.neighbors(v).count()
    }

    /// All vertices in handle order.
    pub fn vertices(&self) -> impl Iterator<Item = VertexId> + '_ {
        let mut vertices: Vec<VertexId> = self.inner.nodes().collect();
        vertices.sort_unstable();
        vertices.into_iter()
    }

    /// All edges, each reported once, in order.
    pub fn edges(&self) -> impl Iterator<Item = Edge> + '_ {
        let mut edges: Vec<Edge> = self.inner.all_edges().map(|(u, v, _)| Edge::new(u, v)).collect();
        edges.sort_unstable();
        edges.into_iter()
    }

    pub fn vertex_count(&self) -> usize {
        self.inner.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.inner.edge_count()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.node_count() == 0
    }
}

impl std::fmt::Display for Graph {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: ([", self.name)?;
        for (i, v) in self.vertices().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", v)?;
        }
        write!(f, "], [")?;
        for (i, e) in self.edges().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", e)?;
        }
        write!(f, "])")
    }
}
