//! The partition synchronizer.
//!
//! Keeps a mirror of the topology graph plus two member subgraphs that split
//! its vertices by a predicate:
//! - **matching**: vertices for which the predicate holds
//! - **complement**: every other vertex
//!
//! Each member subgraph is the induced subgraph of the mirror on its vertex
//! set. Edges between the two classes are kept in the mirror only. Each
//! member subgraph carries its own [`ConnectivityTracker`](crate::ConnectivityTracker),
//! fed by the synchronizer, which is the only code that mutates them.

use crate::connectivity::{Component, TrackedGraph};
use crate::error::{EngineError, EngineResult};
use crate::graph::{Edge, Graph};
use refuge_env::{AttributeLookup, EnvError, Notification, VertexId};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, warn};

/// Decides the class of a vertex from current agent state.
pub trait PartitionPredicate {
    fn evaluate(&self, vertex: VertexId, attrs: &dyn AttributeLookup) -> Result<bool, EnvError>;
}

impl<F> PartitionPredicate for F
where
    F: Fn(VertexId, &dyn AttributeLookup) -> Result<bool, EnvError>,
{
    fn evaluate(&self, vertex: VertexId, attrs: &dyn AttributeLookup) -> Result<bool, EnvError> {
        self(vertex, attrs)
    }
}

/// Predicate that holds when a boolean attribute is set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeFlag {
    name: String,
}

impl AttributeFlag {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl PartitionPredicate for AttributeFlag {
    fn evaluate(&self, vertex: VertexId, attrs: &dyn AttributeLookup) -> Result<bool, EnvError> {
        attrs.flag(vertex, &self.name)
    }
}

/// Which member subgraph a vertex belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PartitionClass {
    /// The predicate holds
    Matching,
    /// The predicate does not hold
    Complement,
}

impl PartitionClass {
    pub fn other(self) -> Self {
        match self {
            PartitionClass::Matching => PartitionClass::Complement,
            PartitionClass::Complement => PartitionClass::Matching,
        }
    }
}

impl From<bool> for PartitionClass {
    fn from(value: bool) -> Self {
        if value {
            PartitionClass::Matching
        } else {
            PartitionClass::Complement
        }
    }
}

/// Vertex and edge listing of one graph, for diagnostics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphSnapshot {
    pub name: String,
    pub vertices: Vec<VertexId>,
    pub edges: Vec<Edge>,
}

impl GraphSnapshot {
    fn of(graph: &Graph) -> Self {
        Self {
            name: graph.name().to_string(),
            vertices: graph.vertices().collect(),
            edges: graph.edges().collect(),
        }
    }
}

/// Current membership of both member subgraphs. Not authoritative.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MembershipSnapshot {
    pub matching: GraphSnapshot,
    pub complement: GraphSnapshot,
    /// Mirror edges joining the two classes
    pub cross_edges: usize,
}

/// Maintains the two member subgraphs of a mirrored topology graph.
#[derive(Debug)]
pub struct PartitionSynchronizer<P> {
    predicate: P,
    topology: Graph,
    matching: TrackedGraph,
    complement: TrackedGraph,
}

impl<P: PartitionPredicate> PartitionSynchronizer<P> {
    /// Creates a synchronizer over an empty topology.
    pub fn new(predicate: P) -> Self {
        Self {
            predicate,
            topology: Graph::new("topology"),
            matching: TrackedGraph::new("matching"),
            complement: TrackedGraph::new("complement"),
        }
    }

    /// Creates a synchronizer mirroring an existing topology.
    ///
    /// Every vertex is classified and placed first; then each edge goes to
    /// the member subgraph holding both endpoints, if any. Both trackers are
    /// materialized before returning.
    pub fn with_topology(
        predicate: P,
        topology: &Graph,
        attrs: &dyn AttributeLookup,
    ) -> EngineResult<Self> {
        let mut sync = Self::new(predicate);

        for v in topology.vertices() {
            let class = sync.classify(v, attrs)?;
            sync.topology.add_vertex(v);
            sync.member_mut(class).add_vertex(v);
        }
        for edge in topology.edges() {
            let (u, v) = edge.endpoints();
            sync.topology.add_edge(u, v)?;
            if let Some(member) = sync.shared_member_mut(u, v) {
                member.add_edge(u, v)?;
            }
        }

        sync.warm();
        debug!(
            vertices = sync.topology.vertex_count(),
            edges = sync.topology.edge_count(),
            matching = sync.matching.graph().vertex_count(),
            complement = sync.complement.graph().vertex_count(),
            "Partition synchronizer initialized"
        );
        Ok(sync)
    }

    pub fn predicate(&self) -> &P {
        &self.predicate
    }

    /// The mirrored topology graph.
    pub fn topology(&self) -> &Graph {
        &self.topology
    }

    pub fn member(&self, class: PartitionClass) -> &TrackedGraph {
        match class {
            PartitionClass::Matching => &self.matching,
            PartitionClass::Complement => &self.complement,
        }
    }

    fn member_mut(&mut self, class: PartitionClass) -> &mut TrackedGraph {
        match class {
            PartitionClass::Matching => &mut self.matching,
            PartitionClass::Complement => &mut self.complement,
        }
    }

    /// The member subgraph holding both `u` and `v`, if they share one.
    fn shared_member_mut(&mut self, u: VertexId, v: VertexId) -> Option<&mut TrackedGraph> {
        if self.matching.contains_vertex(u) && self.matching.contains_vertex(v) {
            Some(&mut self.matching)
        } else if self.complement.contains_vertex(u) && self.complement.contains_vertex(v) {
            Some(&mut self.complement)
        } else {
            None
        }
    }

    /// Splits the synchronizer into the mirror and both member subgraphs
    /// (matching first), for queries that walk several of them at once.
    pub(crate) fn parts_mut(&mut self) -> (&Graph, &mut TrackedGraph, &mut TrackedGraph) {
        (&self.topology, &mut self.matching, &mut self.complement)
    }

    /// Component of `v` inside the `class` member subgraph.
    pub fn component_of(&mut self, class: PartitionClass, v: VertexId) -> Option<&Component> {
        self.member_mut(class).component_of(v)
    }

    pub fn all_components(&mut self, class: PartitionClass) -> Vec<&Component> {
        self.member_mut(class).all_components()
    }

    pub fn component_count(&mut self, class: PartitionClass) -> usize {
        self.member_mut(class).component_count()
    }

    pub fn is_connected(&mut self, class: PartitionClass) -> bool {
        self.member_mut(class).is_connected()
    }

    pub fn path_exists(&mut self, class: PartitionClass, u: VertexId, v: VertexId) -> bool {
        self.member_mut(class).path_exists(u, v)
    }

    /// The class a vertex currently belongs to, by membership.
    pub fn class_of(&self, v: VertexId) -> Option<PartitionClass> {
        if self.matching.contains_vertex(v) {
            Some(PartitionClass::Matching)
        } else if self.complement.contains_vertex(v) {
            Some(PartitionClass::Complement)
        } else {
            None
        }
    }

    /// `(home, other)` member subgraphs for a vertex, by current membership.
    pub fn graphs_for(&self, v: VertexId) -> Option<(&TrackedGraph, &TrackedGraph)> {
        let class = self.class_of(v)?;
        Some((self.member(class), self.member(class.other())))
    }

    /// `(home, other)` member subgraphs for a predicate value.
    pub fn graphs_for_value(&self, value: bool) -> (&TrackedGraph, &TrackedGraph) {
        let class = PartitionClass::from(value);
        (self.member(class), self.member(class.other()))
    }

    fn classify(&self, v: VertexId, attrs: &dyn AttributeLookup) -> EngineResult<PartitionClass> {
        self.predicate
            .evaluate(v, attrs)
            .map(PartitionClass::from)
            .map_err(|e| EngineError::predicate(v, e))
    }

    /// Adds `v` to the mirror and to the member subgraph its class selects.
    ///
    /// Returns false if `v` was already mirrored.
    pub fn on_vertex_added(&mut self, v: VertexId, attrs: &dyn AttributeLookup) -> EngineResult<bool> {
        if self.topology.contains_vertex(v) {
            return Ok(false);
        }
        let class = self.classify(v, attrs)?;
        self.topology.add_vertex(v);
        self.member_mut(class).add_vertex(v);
        Ok(true)
    }

    /// Removes `v` and its incident edges everywhere.
    pub fn on_vertex_removed(&mut self, v: VertexId) -> EngineResult<()> {
        if !self.topology.contains_vertex(v) {
            return Err(EngineError::precondition(format!(
                "removal of {} which is not in the topology",
                v
            )));
        }
        self.matching.remove_vertex(v);
        self.complement.remove_vertex(v);
        self.topology.remove_vertex(v);
        Ok(())
    }

    /// Adds `{u, v}` to the mirror, and to a member subgraph when both
    /// endpoints share a class. Returns false if the edge already existed.
    pub fn on_edge_added(&mut self, u: VertexId, v: VertexId) -> EngineResult<bool> {
        if self.topology.add_edge(u, v)?.is_none() {
            return Ok(false);
        }
        if let Some(member) = self.shared_member_mut(u, v) {
            member.add_edge(u, v)?;
        }
        Ok(true)
    }

    /// Removes `{u, v}` from the mirror and from whichever member holds it.
    pub fn on_edge_removed(&mut self, u: VertexId, v: VertexId) -> EngineResult<()> {
        if !self.topology.contains_edge(u, v) {
            return Err(EngineError::precondition(format!(
                "removal of edge {} which is not in the topology",
                Edge::new(u, v)
            )));
        }
        self.matching.remove_edge(u, v);
        self.complement.remove_edge(u, v);
        self.topology.remove_edge(u, v);
        Ok(())
    }

    /// Re-evaluates the class of `v` and migrates it if it changed.
    ///
    /// Migration inserts `v` into the new member subgraph, links it to every
    /// mirror neighbor already there, then removes it from the old one.
    /// Returns whether a migration happened.
    pub fn on_agent_state_changed(
        &mut self,
        v: VertexId,
        attrs: &dyn AttributeLookup,
    ) -> EngineResult<bool> {
        if !self.topology.contains_vertex(v) {
            return Err(EngineError::precondition(format!(
                "state change for {} which is not in the topology",
                v
            )));
        }
        let target = self.classify(v, attrs)?;
        let current = self.class_of(v).ok_or_else(|| {
            EngineError::invariant(format!("{} is mirrored but in no member subgraph", v))
        })?;
        if current == target {
            return Ok(false);
        }

        let (new, old) = match target {
            PartitionClass::Matching => (&mut self.matching, &mut self.complement),
            PartitionClass::Complement => (&mut self.complement, &mut self.matching),
        };
        new.add_vertex(v);
        let mut carried = 0usize;
        for w in self.topology.neighbors(v) {
            if new.contains_vertex(w) && new.add_edge(v, w)? {
                carried += 1;
            }
        }
        old.remove_vertex(v);

        if !new.contains_vertex(v) || old.contains_vertex(v) {
            return Err(EngineError::invariant(format!(
                "{} not in exactly one member subgraph after migration",
                v
            )));
        }
        debug!(vertex = %v, from = ?current, to = ?target, carried, "Migrated vertex");
        Ok(true)
    }

    /// Applies one notification, returning any error to the caller.
    pub fn apply(&mut self, notification: Notification, attrs: &dyn AttributeLookup) -> EngineResult<()> {
        match notification {
            Notification::VertexAdded(v) => self.on_vertex_added(v, attrs).map(|_| ()),
            Notification::VertexRemoved(v) => self.on_vertex_removed(v),
            Notification::EdgeAdded(u, v) => self.on_edge_added(u, v).map(|_| ()),
            Notification::EdgeRemoved(u, v) => self.on_edge_removed(u, v),
            Notification::AgentStateChanged(v) => self.on_agent_state_changed(v, attrs).map(|_| ()),
        }
    }

    /// Notification boundary.
    ///
    /// Precondition and predicate failures are logged and dropped, leaving
    /// the structures as of the last completed step. Only an invariant
    /// violation is returned.
    pub fn notify(&mut self, notification: Notification, attrs: &dyn AttributeLookup) -> EngineResult<()> {
        match self.apply(notification, attrs) {
            Ok(()) => Ok(()),
            Err(e) if e.is_recoverable() => {
                warn!(%notification, error = %e, "Notification dropped");
                Ok(())
            }
            Err(e) => {
                error!(%notification, error = %e, "Partition corrupted");
                Err(e)
            }
        }
    }

    /// Verifies the partition invariant against the mirror.
    pub fn check_invariants(&self) -> EngineResult<()> {
        for v in self.topology.vertices() {
            match (self.matching.contains_vertex(v), self.complement.contains_vertex(v)) {
                (true, false) | (false, true) => {}
                (true, true) => {
                    return Err(EngineError::invariant(format!("{} is in both member subgraphs", v)))
                }
                (false, false) => {
                    return Err(EngineError::invariant(format!("{} is in no member subgraph", v)))
                }
            }
        }

        for member in [&self.matching, &self.complement] {
            let graph = member.graph();
            if let Some(v) = graph.vertices().find(|v| !self.topology.contains_vertex(*v)) {
                return Err(EngineError::invariant(format!(
                    "{} holds {} which is not in the topology",
                    graph.name(),
                    v
                )));
            }
            if let Some(e) = graph.edges().find(|e| {
                let (u, v) = e.endpoints();
                !self.topology.contains_edge(u, v)
            }) {
                return Err(EngineError::invariant(format!(
                    "{} holds edge {} which is not in the topology",
                    graph.name(),
                    e
                )));
            }
        }

        for edge in self.topology.edges() {
            let (u, v) = edge.endpoints();
            if self.class_of(u) == self.class_of(v) {
                if let Some(class) = self.class_of(u) {
                    if !self.member(class).contains_edge(u, v) {
                        return Err(EngineError::invariant(format!(
                            "same-class edge {} missing from {}",
                            edge,
                            self.member(class).graph().name()
                        )));
                    }
                }
            }
        }
        Ok(())
    }

    /// Vertices whose membership disagrees with the predicate right now.
    ///
    /// Non-empty after a dropped state-change notification, until the next
    /// successful one for that vertex.
    pub fn stale_vertices(&self, attrs: &dyn AttributeLookup) -> EngineResult<Vec<VertexId>> {
        let mut stale = Vec::new();
        for v in self.topology.vertices() {
            if Some(self.classify(v, attrs)?) != self.class_of(v) {
                stale.push(v);
            }
        }
        Ok(stale)
    }

    /// Materializes both component caches.
    pub fn warm(&mut self) {
        self.matching.warm();
        self.complement.warm();
    }

    pub fn snapshot(&self) -> MembershipSnapshot {
        let cross_edges = self
            .topology
            .edges()
            .filter(|e| {
                let (u, v) = e.endpoints();
                self.class_of(u) != self.class_of(v)
            })
            .count();
        MembershipSnapshot {
            matching: GraphSnapshot::of(self.matching.graph()),
            complement: GraphSnapshot::of(self.complement.graph()),
            cross_edges,
        }
    }
}

impl<P> std::fmt::Display for PartitionSynchronizer<P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "{}", self.matching.graph())?;
        write!(f, "{}", self.complement.graph())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use refuge_env::AttributeTable;

    const FLAG: &str = "danger";

    fn v(i: u32) -> VertexId {
        VertexId(i)
    }

    /// A-B-C-D chain with the flag set on B and C.
    fn chain_abcd() -> (Graph, AttributeTable) {
        let topology = Graph::from_parts(
            "topology",
            [v(0), v(1), v(2), v(3)],
            [(v(0), v(1)), (v(1), v(2)), (v(2), v(3))],
        )
        .unwrap();
        let mut attrs = AttributeTable::new();
        attrs.set_flag(v(1), FLAG, true);
        attrs.set_flag(v(2), FLAG, true);
        (topology, attrs)
    }

    #[test]
    fn test_empty_members_not_connected() {
        let mut sync = PartitionSynchronizer::new(AttributeFlag::new(FLAG));
        let (_, matching, complement) = sync.parts_mut();
        assert!(!matching.is_connected());
        assert!(!complement.is_connected());
    }

    #[test]
    fn test_chain_partition() {
        let (topology, attrs) = chain_abcd();
        let mut sync =
            PartitionSynchronizer::with_topology(AttributeFlag::new(FLAG), &topology, &attrs).unwrap();
        sync.check_invariants().unwrap();

        let (_, matching, complement) = sync.parts_mut();
        assert_eq!(matching.component_count(), 1);
        assert!(matching.contains_edge(v(1), v(2)));
        assert_eq!(matching.graph().edge_count(), 1);

        assert_eq!(complement.component_count(), 2);
        assert!(!complement.path_exists(v(0), v(3)));
        assert_eq!(complement.graph().edge_count(), 0);
    }

    #[test]
    fn test_graphs_for() {
        let (topology, attrs) = chain_abcd();
        let sync =
            PartitionSynchronizer::with_topology(AttributeFlag::new(FLAG), &topology, &attrs).unwrap();

        let (home, other) = sync.graphs_for(v(1)).unwrap();
        assert!(home.contains_vertex(v(1)));
        assert!(!other.contains_vertex(v(1)));
        assert!(sync.graphs_for(v(9)).is_none());

        let (home, _) = sync.graphs_for_value(false);
        assert_eq!(home.graph().name(), "complement");
    }

    #[test]
    fn test_migration_carries_same_class_edges() {
        let (topology, mut attrs) = chain_abcd();
        let mut sync =
            PartitionSynchronizer::with_topology(AttributeFlag::new(FLAG), &topology, &attrs).unwrap();

        attrs.set_flag(v(3), FLAG, true);
        assert!(sync.on_agent_state_changed(v(3), &attrs).unwrap());

        assert_eq!(sync.class_of(v(3)), Some(PartitionClass::Matching));
        assert!(sync.member(PartitionClass::Matching).contains_edge(v(2), v(3)));
        assert!(!sync.member(PartitionClass::Complement).contains_vertex(v(3)));
        sync.check_invariants().unwrap();
    }

    #[test]
    fn test_migration_splits_old_class() {
        let (topology, mut attrs) = chain_abcd();
        let mut sync =
            PartitionSynchronizer::with_topology(AttributeFlag::new(FLAG), &topology, &attrs).unwrap();

        attrs.set_flag(v(1), FLAG, false);
        sync.on_agent_state_changed(v(1), &attrs).unwrap();

        let (_, matching, complement) = sync.parts_mut();
        assert_eq!(matching.component_of(v(2)), Some(&Component::from([v(2)])));
        assert!(complement.path_exists(v(0), v(1)));
        assert!(!complement.path_exists(v(0), v(3)));
    }

    #[test]
    fn test_state_change_without_flip_is_noop() {
        let (topology, attrs) = chain_abcd();
        let mut sync =
            PartitionSynchronizer::with_topology(AttributeFlag::new(FLAG), &topology, &attrs).unwrap();
        let generation = sync.member(PartitionClass::Matching).generation();
        assert!(!sync.on_agent_state_changed(v(1), &attrs).unwrap());
        assert_eq!(sync.member(PartitionClass::Matching).generation(), generation);
    }

    #[test]
    fn test_cross_class_edge_only_in_mirror() {
        let mut attrs = AttributeTable::new();
        attrs.set_flag(v(0), FLAG, true);
        let mut sync = PartitionSynchronizer::new(AttributeFlag::new(FLAG));
        sync.on_vertex_added(v(0), &attrs).unwrap();
        sync.on_vertex_added(v(1), &attrs).unwrap();
        assert!(sync.on_edge_added(v(0), v(1)).unwrap());

        assert!(sync.topology().contains_edge(v(0), v(1)));
        assert_eq!(sync.snapshot().cross_edges, 1);
        assert_eq!(sync.member(PartitionClass::Matching).graph().edge_count(), 0);
        assert_eq!(sync.member(PartitionClass::Complement).graph().edge_count(), 0);

        // flipping v1 turns the cross edge into a same-class edge
        attrs.set_flag(v(1), FLAG, true);
        sync.on_agent_state_changed(v(1), &attrs).unwrap();
        assert!(sync.member(PartitionClass::Matching).contains_edge(v(0), v(1)));
        assert_eq!(sync.snapshot().cross_edges, 0);
    }

    #[test]
    fn test_vertex_removal_everywhere() {
        let (topology, attrs) = chain_abcd();
        let mut sync =
            PartitionSynchronizer::with_topology(AttributeFlag::new(FLAG), &topology, &attrs).unwrap();
        sync.on_vertex_removed(v(2)).unwrap();
        assert!(!sync.topology().contains_vertex(v(2)));
        assert_eq!(sync.class_of(v(2)), None);
        assert!(!sync.topology().contains_edge(v(2), v(3)));
        sync.check_invariants().unwrap();
    }

    #[test]
    fn test_preconditions_reported() {
        let (topology, attrs) = chain_abcd();
        let mut sync =
            PartitionSynchronizer::with_topology(AttributeFlag::new(FLAG), &topology, &attrs).unwrap();

        let cases = [
            Notification::EdgeRemoved(v(0), v(3)),
            Notification::VertexRemoved(v(8)),
            Notification::AgentStateChanged(v(8)),
            Notification::EdgeAdded(v(0), v(8)),
            Notification::EdgeAdded(v(1), v(1)),
        ];
        for n in cases {
            let err = sync.apply(n, &attrs).unwrap_err();
            assert!(matches!(err, EngineError::PreconditionViolation(_)), "{}", n);
            // the boundary swallows it
            sync.notify(n, &attrs).unwrap();
        }
        sync.check_invariants().unwrap();
    }

    #[test]
    fn test_unmembered_vertex_is_fatal() {
        let (topology, attrs) = chain_abcd();
        let mut sync =
            PartitionSynchronizer::with_topology(AttributeFlag::new(FLAG), &topology, &attrs).unwrap();

        assert!(sync.complement.remove_vertex(v(0)));
        assert!(!sync.matching.remove_vertex(v(0)));
        assert!(sync.topology().contains_vertex(v(0)));

        let err = sync.notify(Notification::AgentStateChanged(v(0)), &attrs).unwrap_err();
        assert!(matches!(err, EngineError::InvariantViolation(_)));
        assert!(!err.is_recoverable());

        match sync.check_invariants() {
            Err(EngineError::InvariantViolation(msg)) => {
                assert!(msg.contains("v0 is in no member subgraph"), "{}", msg)
            }
            other => panic!("expected invariant violation, got {:?}", other),
        }
    }

    #[test]
    fn test_missing_same_class_edge_detected() {
        let (topology, attrs) = chain_abcd();
        let mut sync =
            PartitionSynchronizer::with_topology(AttributeFlag::new(FLAG), &topology, &attrs).unwrap();

        assert!(sync.matching.remove_edge(v(1), v(2)));
        match sync.check_invariants() {
            Err(EngineError::InvariantViolation(msg)) => {
                assert!(msg.contains("same-class edge {v1,v2} missing from matching"), "{}", msg)
            }
            other => panic!("expected invariant violation, got {:?}", other),
        }

        // vertices are still placed, so notifications keep flowing
        sync.notify(Notification::AgentStateChanged(v(1)), &attrs).unwrap();
    }

    #[test]
    fn test_predicate_failure_leaves_state() {
        let (topology, mut attrs) = chain_abcd();
        let mut sync =
            PartitionSynchronizer::with_topology(AttributeFlag::new(FLAG), &topology, &attrs).unwrap();

        attrs.set(v(0), FLAG, 3.0);
        let err = sync.on_agent_state_changed(v(0), &attrs).unwrap_err();
        assert!(matches!(err, EngineError::PredicateEvaluation { vertex, .. } if vertex == v(0)));
        assert_eq!(sync.class_of(v(0)), Some(PartitionClass::Complement));

        sync.notify(Notification::AgentStateChanged(v(0)), &attrs).unwrap();
        assert!(sync.stale_vertices(&attrs).is_err());

        attrs.set_flag(v(0), FLAG, true);
        assert_eq!(sync.stale_vertices(&attrs).unwrap(), vec![v(0)]);
        sync.notify(Notification::AgentStateChanged(v(0)), &attrs).unwrap();
        assert!(sync.stale_vertices(&attrs).unwrap().is_empty());
    }

    #[test]
    fn test_closure_predicate() {
        let even = |v: VertexId, _: &dyn AttributeLookup| Ok::<bool, EnvError>(v.0 % 2 == 0);
        let topology = Graph::from_parts(
            "topology",
            (0..6).map(v),
            [(v(0), v(2)), (v(2), v(4)), (v(1), v(3)), (v(0), v(1))],
        )
        .unwrap();
        let mut sync =
            PartitionSynchronizer::with_topology(even, &topology, &AttributeTable::new()).unwrap();
        let (_, matching, complement) = sync.parts_mut();
        assert!(matching.is_connected());
        assert_eq!(complement.component_count(), 2);
    }

    #[test]
    fn test_dump_lists_members() {
        let (topology, attrs) = chain_abcd();
        let sync =
            PartitionSynchronizer::with_topology(AttributeFlag::new(FLAG), &topology, &attrs).unwrap();
        assert_eq!(
            sync.to_string(),
            "matching: ([v1, v2], [{v1,v2}])\ncomplement: ([v0, v3], [])"
        );
        let snapshot = sync.snapshot();
        assert_eq!(snapshot.matching.vertices, vec![v(1), v(2)]);
        assert_eq!(snapshot.cross_edges, 2);
    }
}
