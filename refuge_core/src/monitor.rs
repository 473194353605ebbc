//! Safety monitor: can every hazardous agent reach a refuge through
//! non-hazardous agents?
//!
//! The monitor owns a [`PartitionSynchronizer`] whose predicate is the hazard
//! flag, so the matching member subgraph holds the hazardous agents and the
//! complement holds everyone else. The query only reads membership and the
//! two component caches.

use crate::connectivity::TrackedGraph;
use crate::error::{EngineError, EngineResult};
use crate::graph::Graph;
use crate::partition::{AttributeFlag, PartitionClass, PartitionSynchronizer};
use refuge_env::{AgentId, AgentRegistry, AttributeLookup, Notification, VertexId};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Names of the attributes the monitor reads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    /// Boolean attribute marking an agent as hazardous
    pub hazard_attribute: String,

    /// Boolean attribute marking an agent as a refuge
    pub refuge_attribute: String,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            hazard_attribute: "hazard".to_string(),
            refuge_attribute: "refuge".to_string(),
        }
    }
}

/// The reachability monitor for one simulation run.
#[derive(Debug)]
pub struct SafetyMonitor {
    config: MonitorConfig,
    sync: PartitionSynchronizer<AttributeFlag>,
}

impl SafetyMonitor {
    /// Creates a monitor over an empty topology.
    pub fn new(config: MonitorConfig) -> Self {
        let predicate = AttributeFlag::new(config.hazard_attribute.clone());
        Self {
            config,
            sync: PartitionSynchronizer::new(predicate),
        }
    }

    /// Creates a monitor mirroring an existing topology.
    pub fn with_topology(
        config: MonitorConfig,
        topology: &Graph,
        attrs: &dyn AttributeLookup,
    ) -> EngineResult<Self> {
        let predicate = AttributeFlag::new(config.hazard_attribute.clone());
        Ok(Self {
            sync: PartitionSynchronizer::with_topology(predicate, topology, attrs)?,
            config,
        })
    }

    pub fn config(&self) -> &MonitorConfig {
        &self.config
    }

    pub fn synchronizer(&self) -> &PartitionSynchronizer<AttributeFlag> {
        &self.sync
    }

    pub fn synchronizer_mut(&mut self) -> &mut PartitionSynchronizer<AttributeFlag> {
        &mut self.sync
    }

    /// Forwards a notification through the synchronizer boundary.
    pub fn notify(&mut self, notification: Notification, attrs: &dyn AttributeLookup) -> EngineResult<()> {
        self.sync.notify(notification, attrs)
    }

    /// Evaluates the safety property for one agent.
    pub fn is_safe(
        &mut self,
        agent: AgentId,
        registry: &AgentRegistry,
        attrs: &dyn AttributeLookup,
    ) -> EngineResult<bool> {
        let v = registry
            .vertex_of(agent)
            .map_err(|e| EngineError::precondition(e.to_string()))?;
        self.is_vertex_safe(v, attrs)
    }

    /// Evaluates the safety property for one vertex.
    ///
    /// For a hazardous agent that has been classified as such: every
    /// non-hazardous neighbor of every member of its hazard component must
    /// sit in a non-hazard component containing a refuge. A hazard component
    /// with no way out at all passes vacuously.
    ///
    /// For any other agent: its own non-hazard component must contain a
    /// refuge.
    pub fn is_vertex_safe(&mut self, v: VertexId, attrs: &dyn AttributeLookup) -> EngineResult<bool> {
        let hazardous = attrs
            .flag(v, &self.config.hazard_attribute)
            .map_err(|e| EngineError::predicate(v, e))?;
        let refuge = self.config.refuge_attribute.as_str();
        let (topology, hazard, clear) = self.sync.parts_mut();

        if !(hazardous && hazard.contains_vertex(v)) {
            return component_has_refuge(clear, v, refuge, attrs).map(|r| r.unwrap_or(false));
        }

        // refuge answer per non-hazard component, keyed by its smallest vertex
        let mut verdicts: HashMap<VertexId, bool> = HashMap::new();
        let Some(members) = hazard.component_of(v) else {
            return Ok(false);
        };
        for member in members {
            for w in topology.neighbors(*member) {
                if !clear.contains_vertex(w) {
                    continue;
                }
                let Some(key) = clear.component_of(w).and_then(|c| c.first().copied()) else {
                    continue;
                };
                let ok = match verdicts.get(&key) {
                    Some(ok) => *ok,
                    None => {
                        let ok = component_has_refuge(clear, w, refuge, attrs)?.unwrap_or(false);
                        verdicts.insert(key, ok);
                        ok
                    }
                };
                if !ok {
                    return Ok(false);
                }
            }
        }
        Ok(true)
    }

    /// Agents among `agents` for which the property does not hold.
    pub fn unsafe_agents(
        &mut self,
        agents: impl IntoIterator<Item = AgentId>,
        registry: &AgentRegistry,
        attrs: &dyn AttributeLookup,
    ) -> EngineResult<Vec<AgentId>> {
        let mut result = Vec::new();
        for agent in agents {
            if !self.is_safe(agent, registry, attrs)? {
                result.push(agent);
            }
        }
        Ok(result)
    }

    /// Number of hazard components, for reporting.
    pub fn hazard_component_count(&mut self) -> usize {
        self.sync.component_count(PartitionClass::Matching)
    }
}

/// Whether the component of `v` in `graph` holds a refuge. `None` when `v`
/// is not in `graph`.
fn component_has_refuge(
    graph: &mut TrackedGraph,
    v: VertexId,
    refuge: &str,
    attrs: &dyn AttributeLookup,
) -> EngineResult<Option<bool>> {
    let Some(component) = graph.component_of(v) else {
        return Ok(None);
    };
    for member in component {
        if attrs
            .flag(*member, refuge)
            .map_err(|e| EngineError::predicate(*member, e))?
        {
            return Ok(Some(true));
        }
    }
    Ok(Some(false))
}
