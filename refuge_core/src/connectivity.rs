//! Connected components with a lazy, partially incremental cache.
//!
//! The tracker computes the component partition of a graph on demand and
//! keeps it until a removal happens:
//! - **Vertex insertion**: a new singleton component, O(1)
//! - **Edge insertion**: the smaller component is folded into the larger,
//!   O(size of the smaller one)
//! - **Vertex/edge removal**: the whole cache is dropped and rebuilt by the
//!   next query, O(V + E)
//!
//! Removals are not split incrementally. Deciding whether a removed edge was
//! a bridge needs a traversal in the general case, so a full rebuild on the
//! next query is just as cheap and always correct.
//!
//! The tracker does not hold a reference to its graph. Queries take the graph
//! as a parameter and mutation events are fed through [`ConnectivityTracker::observe`].
//! [`TrackedGraph`] bundles the two so that every mutation reaches the tracker.

use crate::error::EngineResult;
use crate::graph::{Graph, GraphEvent};
use refuge_env::VertexId;
use std::collections::{BTreeSet, HashMap, VecDeque};
use tracing::trace;

/// One connected component.
pub type Component = BTreeSet<VertexId>;

/// Materialized partition: component slots plus a vertex -> slot index.
#[derive(Debug, Default)]
struct ComponentCache {
    slots: Vec<Option<Component>>,
    free: Vec<usize>,
    membership: HashMap<VertexId, usize>,
}

impl ComponentCache {
    /// Full BFS partition of `graph`, seeding each traversal from the
    /// smallest unassigned vertex.
    fn build(graph: &Graph) -> Self {
        let mut cache = ComponentCache::default();
        let mut queue = VecDeque::new();

        for start in graph.vertices() {
            if cache.membership.contains_key(&start) {
                continue;
            }
            let slot = cache.slots.len();
            let mut component = Component::new();

            cache.membership.insert(start, slot);
            queue.push_back(start);
            while let Some(u) = queue.pop_front() {
                component.insert(u);
                for w in graph.neighbors(u) {
                    if !cache.membership.contains_key(&w) {
                        cache.membership.insert(w, slot);
                        queue.push_back(w);
                    }
                }
            }
            cache.slots.push(Some(component));
        }

        cache
    }

    fn alloc(&mut self, component: Component) -> usize {
        match self.free.pop() {
            Some(slot) => {
                self.slots[slot] = Some(component);
                slot
            }
            None => {
                self.slots.push(Some(component));
                self.slots.len() - 1
            }
        }
    }

    fn get(&self, v: VertexId) -> Option<&Component> {
        let slot = *self.membership.get(&v)?;
        self.slots.get(slot)?.as_ref()
    }

    fn len(&self) -> usize {
        self.slots.len() - self.free.len()
    }

    fn add_vertex(&mut self, v: VertexId) {
        if self.membership.contains_key(&v) {
            return;
        }
        let slot = self.alloc(Component::from([v]));
        self.membership.insert(v, slot);
    }

    /// Merges the components of `u` and `v`. Returns false if either
    /// endpoint is unknown to the cache.
    fn union(&mut self, u: VertexId, v: VertexId) -> bool {
        let (Some(&su), Some(&sv)) = (self.membership.get(&u), self.membership.get(&v)) else {
            return false;
        };
        if su == sv {
            return true;
        }

        let len = |slot: usize| self.slots[slot].as_ref().map(|c| c.len()).unwrap_or(0);
        let (small, large) = if len(su) <= len(sv) { (su, sv) } else { (sv, su) };

        let Some(moved) = self.slots[small].take() else {
            return false;
        };
        for m in &moved {
            self.membership.insert(*m, large);
        }
        match self.slots[large].as_mut() {
            Some(target) => target.extend(moved),
            None => return false,
        }
        self.free.push(small);
        true
    }
}

/// Caching connected-components tracker for one graph.
#[derive(Debug, Default)]
pub struct ConnectivityTracker {
    cache: Option<ComponentCache>,
    generation: u64,
}

impl ConnectivityTracker {
    pub fn new() -> Self {
        Self::default()
    }

    fn ensure(&mut self, graph: &Graph) -> &ComponentCache {
        if self.cache.is_none() {
            self.generation += 1;
            trace!(
                graph = graph.name(),
                generation = self.generation,
                vertices = graph.vertex_count(),
                "Recomputing connected components"
            );
        }
        self.cache.get_or_insert_with(|| ComponentCache::build(graph))
    }

    /// The component containing `v`, or `None` if `v` is not in `graph`.
    pub fn component_of(&mut self, graph: &Graph, v: VertexId) -> Option<&Component> {
        self.ensure(graph).get(v)
    }

    /// All components. Every vertex of `graph` is in exactly one of them.
    pub fn all_components(&mut self, graph: &Graph) -> Vec<&Component> {
        self.ensure(graph).slots.iter().flatten().collect()
    }

    pub fn component_count(&mut self, graph: &Graph) -> usize {
        self.ensure(graph).len()
    }

    /// True iff the graph has exactly one component. An empty graph is not
    /// connected.
    pub fn is_connected(&mut self, graph: &Graph) -> bool {
        self.component_count(graph) == 1
    }

    /// True iff `u` and `v` lie in the same component.
    pub fn path_exists(&mut self, graph: &Graph, u: VertexId, v: VertexId) -> bool {
        self.component_of(graph, u)
            .map(|c| c.contains(&v))
            .unwrap_or(false)
    }

    /// Applies one mutation of the tracked graph to the cache.
    pub fn observe(&mut self, event: &GraphEvent) {
        if event.is_removal() {
            self.invalidate();
            return;
        }
        let Some(cache) = self.cache.as_mut() else {
            // nothing cached, the next query rebuilds anyway
            return;
        };
        match event {
            GraphEvent::VertexAdded(v) => cache.add_vertex(*v),
            GraphEvent::EdgeAdded(e) => {
                let (u, v) = e.endpoints();
                if !cache.union(u, v) {
                    self.invalidate();
                }
            }
            GraphEvent::VertexRemoved(_) | GraphEvent::EdgeRemoved(_) => {}
        }
    }

    /// Drops every cached component.
    pub fn invalidate(&mut self) {
        self.cache = None;
    }

    /// True when a partition is cached.
    pub fn is_materialized(&self) -> bool {
        self.cache.is_some()
    }

    /// Number of full rebuilds so far. Incremental updates keep it unchanged.
    pub fn generation(&self) -> u64 {
        self.generation
    }
}

/// A graph paired with the tracker that observes it.
///
/// All mutation goes through this type, so the tracker is the sole observer
/// of the graph and never misses an event.
#[derive(Debug, Default)]
pub struct TrackedGraph {
    graph: Graph,
    tracker: ConnectivityTracker,
}

impl TrackedGraph {
    /// Creates an empty tracked graph.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            graph: Graph::new(name),
            tracker: ConnectivityTracker::new(),
        }
    }

    /// Wraps an existing graph. Nothing is computed until the first query.
    pub fn from_graph(graph: Graph) -> Self {
        Self {
            graph,
            tracker: ConnectivityTracker::new(),
        }
    }

    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    pub fn tracker(&self) -> &ConnectivityTracker {
        &self.tracker
    }

    pub fn contains_vertex(&self, v: VertexId) -> bool {
        self.graph.contains_vertex(v)
    }

    pub fn contains_edge(&self, u: VertexId, v: VertexId) -> bool {
        self.graph.contains_edge(u, v)
    }

    pub fn add_vertex(&mut self, v: VertexId) -> bool {
        match self.graph.add_vertex(v) {
            Some(event) => {
                self.tracker.observe(&event);
                true
            }
            None => false,
        }
    }

    pub fn remove_vertex(&mut self, v: VertexId) -> bool {
        let events = self.graph.remove_vertex(v);
        for event in &events {
            self.tracker.observe(event);
        }
        !events.is_empty()
    }

    pub fn add_edge(&mut self, u: VertexId, v: VertexId) -> EngineResult<bool> {
        match self.graph.add_edge(u, v)? {
            Some(event) => {
                self.tracker.observe(&event);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    pub fn remove_edge(&mut self, u: VertexId, v: VertexId) -> bool {
        match self.graph.remove_edge(u, v) {
            Some(event) => {
                self.tracker.observe(&event);
                true
            }
            None => false,
        }
    }

    pub fn component_of(&mut self, v: VertexId) -> Option<&Component> {
        self.tracker.component_of(&self.graph, v)
    }

    pub fn all_components(&mut self) -> Vec<&Component> {
        self.tracker.all_components(&self.graph)
    }

    pub fn component_count(&mut self) -> usize {
        self.tracker.component_count(&self.graph)
    }

    pub fn is_connected(&mut self) -> bool {
        self.tracker.is_connected(&self.graph)
    }

    pub fn path_exists(&mut self, u: VertexId, v: VertexId) -> bool {
        self.tracker.path_exists(&self.graph, u, v)
    }

    /// Forces the component partition to be materialized.
    pub fn warm(&mut self) {
        self.tracker.component_count(&self.graph);
    }

    pub fn generation(&self) -> u64 {
        self.tracker.generation()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(i: u32) -> VertexId {
        VertexId(i)
    }

    fn chain(n: u32) -> TrackedGraph {
        let mut g = TrackedGraph::new("chain");
        for i in 0..n {
            g.add_vertex(v(i));
        }
        for i in 1..n {
            g.add_edge(v(i - 1), v(i)).unwrap();
        }
        g
    }

    #[test]
    fn test_empty_graph_not_connected() {
        let mut g = TrackedGraph::new("empty");
        assert!(!g.is_connected());
        assert!(g.all_components().is_empty());
    }

    #[test]
    fn test_single_vertex_connected() {
        let mut g = TrackedGraph::new("one");
        g.add_vertex(v(0));
        assert!(g.is_connected());
        assert_eq!(g.component_of(v(0)), Some(&Component::from([v(0)])));
    }

    #[test]
    fn test_component_of_absent_vertex() {
        let mut g = chain(3);
        assert!(g.component_of(v(9)).is_none());
        assert!(!g.path_exists(v(9), v(0)));
    }

    #[test]
    fn test_lazy_first_query() {
        let mut g = chain(4);
        assert!(!g.tracker().is_materialized());
        assert_eq!(g.generation(), 0);

        assert!(g.is_connected());
        assert!(g.tracker().is_materialized());
        assert_eq!(g.generation(), 1);

        // cached answer, no rebuild
        assert!(g.path_exists(v(0), v(3)));
        assert_eq!(g.generation(), 1);
    }

    #[test]
    fn test_vertex_insertion_is_incremental() {
        let mut g = chain(3);
        g.warm();
        g.add_vertex(v(10));
        assert_eq!(g.component_count(), 2);
        assert_eq!(g.component_of(v(10)), Some(&Component::from([v(10)])));
        assert_eq!(g.generation(), 1);
    }

    #[test]
    fn test_edge_insertion_merges_components() {
        let mut g = TrackedGraph::new("g");
        for i in 0..4 {
            g.add_vertex(v(i));
        }
        g.add_edge(v(0), v(1)).unwrap();
        g.add_edge(v(2), v(3)).unwrap();
        assert_eq!(g.component_count(), 2);
        assert!(!g.path_exists(v(0), v(3)));

        g.add_edge(v(1), v(2)).unwrap();
        assert!(g.path_exists(v(0), v(3)));
        assert!(g.path_exists(v(3), v(0)));
        assert_eq!(g.component_count(), 1);
        assert_eq!(
            g.component_of(v(2)),
            Some(&Component::from([v(0), v(1), v(2), v(3)]))
        );
        // merged without a rebuild
        assert_eq!(g.generation(), 1);
    }

    #[test]
    fn test_edge_within_component_is_noop() {
        let mut g = chain(3);
        g.warm();
        g.add_edge(v(0), v(2)).unwrap();
        assert_eq!(g.component_count(), 1);
        assert_eq!(g.generation(), 1);
    }

    #[test]
    fn test_edge_removal_invalidates_and_splits() {
        let mut g = chain(4);
        assert!(g.path_exists(v(0), v(3)));

        g.remove_edge(v(1), v(2));
        assert!(!g.tracker().is_materialized());
        assert!(!g.path_exists(v(0), v(3)));
        assert_eq!(g.component_count(), 2);
        assert_eq!(g.generation(), 2);
    }

    #[test]
    fn test_vertex_removal_invalidates() {
        let mut g = chain(3);
        assert!(g.is_connected());

        g.remove_vertex(v(1));
        assert!(!g.tracker().is_materialized());
        let components = g.all_components();
        assert_eq!(components.len(), 2);
        assert_eq!(g.generation(), 2);
    }

    #[test]
    fn test_insertions_while_invalidated_stay_lazy() {
        let mut g = chain(2);
        g.warm();
        g.remove_edge(v(0), v(1));
        g.add_vertex(v(5));
        g.add_edge(v(1), v(5)).unwrap();
        assert!(!g.tracker().is_materialized());

        assert_eq!(g.component_count(), 2);
        assert!(g.path_exists(v(5), v(1)));
        assert!(!g.path_exists(v(5), v(0)));
    }

    #[test]
    fn test_standalone_tracker_needs_events() {
        let mut graph = Graph::new("raw");
        let mut tracker = ConnectivityTracker::new();
        graph.add_vertex(v(0));
        graph.add_vertex(v(1));
        assert_eq!(tracker.component_count(&graph), 2);

        if let Some(event) = graph.add_edge(v(0), v(1)).unwrap() {
            tracker.observe(&event);
        }
        assert!(tracker.is_connected(&graph));
    }

    #[test]
    fn test_merge_reuses_free_slots() {
        let mut g = TrackedGraph::new("g");
        for i in 0..3 {
            g.add_vertex(v(i));
        }
        g.warm();
        g.add_edge(v(0), v(1)).unwrap();
        g.add_vertex(v(3));
        assert_eq!(g.component_count(), 3);
        let total: usize = g.all_components().iter().map(|c| c.len()).sum();
        assert_eq!(total, 4);
    }
}
