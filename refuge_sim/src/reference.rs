//! From-scratch safety evaluation, used to cross-check the incremental
//! monitor every tick.
//!
//! Nothing here is cached: each call walks the environment graph with a
//! plain breadth-first search restricted to one hazard class.

use refuge_core::{EngineError, EngineResult, Graph, MonitorConfig};
use refuge_env::{AttributeLookup, VertexId};
use std::collections::{BTreeSet, VecDeque};

/// Vertices reachable from `start` through vertices whose hazard flag
/// equals that of `start`.
fn same_class_component(
    graph: &Graph,
    start: VertexId,
    hazard: &str,
    attrs: &dyn AttributeLookup,
) -> EngineResult<BTreeSet<VertexId>> {
    let class = flag(attrs, start, hazard)?;
    let mut seen = BTreeSet::from([start]);
    let mut queue = VecDeque::from([start]);
    while let Some(u) = queue.pop_front() {
        for w in graph.neighbors(u) {
            if !seen.contains(&w) && flag(attrs, w, hazard)? == class {
                seen.insert(w);
                queue.push_back(w);
            }
        }
    }
    Ok(seen)
}

fn flag(attrs: &dyn AttributeLookup, v: VertexId, name: &str) -> EngineResult<bool> {
    attrs.flag(v, name).map_err(|e| EngineError::predicate(v, e))
}

fn any_refuge(component: &BTreeSet<VertexId>, refuge: &str, attrs: &dyn AttributeLookup) -> EngineResult<bool> {
    for v in component {
        if flag(attrs, *v, refuge)? {
            return Ok(true);
        }
    }
    Ok(false)
}

/// Safety verdict for `v` over `graph`, computed without any incremental
/// state. Agrees with the monitor whenever every state change has been
/// delivered.
pub fn is_safe(
    graph: &Graph,
    v: VertexId,
    config: &MonitorConfig,
    attrs: &dyn AttributeLookup,
) -> EngineResult<bool> {
    if !graph.contains_vertex(v) {
        return Ok(false);
    }
    let hazard = config.hazard_attribute.as_str();
    let refuge = config.refuge_attribute.as_str();
    let own = same_class_component(graph, v, hazard, attrs)?;

    if !flag(attrs, v, hazard)? {
        return any_refuge(&own, refuge, attrs);
    }

    for member in &own {
        for w in graph.neighbors(*member) {
            if flag(attrs, w, hazard)? {
                continue;
            }
            let exit = same_class_component(graph, w, hazard, attrs)?;
            if !any_refuge(&exit, refuge, attrs)? {
                return Ok(false);
            }
        }
    }
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use refuge_env::AttributeTable;

    fn v(i: u32) -> VertexId {
        VertexId(i)
    }

    fn path(n: u32) -> Graph {
        Graph::from_parts("path", (0..n).map(v), (1..n).map(|i| (v(i - 1), v(i)))).unwrap()
    }

    #[test]
    fn test_clear_agent_needs_refuge_in_component() {
        let graph = path(3);
        let mut attrs = AttributeTable::new();
        let config = MonitorConfig::default();
        assert!(!is_safe(&graph, v(0), &config, &attrs).unwrap());

        attrs.set_flag(v(2), "refuge", true);
        assert!(is_safe(&graph, v(0), &config, &attrs).unwrap());

        // hazard in the middle cuts the clear path
        attrs.set_flag(v(1), "hazard", true);
        assert!(!is_safe(&graph, v(0), &config, &attrs).unwrap());
        assert!(!is_safe(&graph, v(1), &config, &attrs).unwrap());
    }

    #[test]
    fn test_hazard_with_all_good_exits() {
        let graph = path(3);
        let mut attrs = AttributeTable::new();
        attrs.set_flag(v(1), "hazard", true);
        attrs.set_flag(v(0), "refuge", true);
        attrs.set_flag(v(2), "refuge", true);
        assert!(is_safe(&graph, v(1), &MonitorConfig::default(), &attrs).unwrap());
    }

    #[test]
    fn test_unknown_vertex_is_unsafe() {
        let graph = path(2);
        let attrs = AttributeTable::new();
        assert!(!is_safe(&graph, v(9), &MonitorConfig::default(), &attrs).unwrap());
    }
}
