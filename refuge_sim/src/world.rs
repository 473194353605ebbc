//! SimWorld - The simulation harness container.
//!
//! Owns the oracle, the authoritative edge set produced by the linking rule,
//! and the safety monitor that mirrors it. Every change to the environment
//! reaches the monitor as an explicit notification.

use crate::config::SimConfig;
use crate::error::SimError;
use crate::linking::{rule_from_config, topology_edges, LinkingRule};
use crate::oracle::{AgentKind, HazardZone, Oracle};

use nalgebra::Vector2;
use refuge_core::{Edge, Graph, MembershipSnapshot, PartitionClass, SafetyMonitor};
use refuge_env::{AgentId, Notification, VertexId};
use serde::Serialize;
use std::collections::BTreeSet;
use tracing::{debug, trace};

/// What one tick did.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct StepReport {
    pub tick: u64,
    pub time: f64,
    pub edges_added: usize,
    pub edges_removed: usize,
    pub state_changes: usize,
    /// State changes that moved a vertex between member subgraphs
    pub migrations: usize,
    pub notifications: usize,
    /// Component cache rebuilds across both member subgraphs
    pub cache_rebuilds: u64,
    pub hazardous: usize,
    pub unsafe_agents: Vec<AgentId>,
}

/// The SimWorld - container for the entire simulation.
pub struct SimWorld {
    config: SimConfig,

    /// Ground truth oracle
    oracle: Oracle,

    rule: Box<dyn LinkingRule>,

    /// Edge set last delivered to the monitor
    edges: BTreeSet<Edge>,

    monitor: SafetyMonitor,

    /// Hazard flag edits not yet delivered
    pending: Vec<VertexId>,

    /// Current tick count
    tick_count: u64,
}

impl SimWorld {
    /// Bootstraps a world around a populated oracle.
    ///
    /// The topology is built from the environment first; the monitor's
    /// member subgraphs are then initialized from it in one pass.
    pub fn new(config: SimConfig, oracle: Oracle) -> Result<Self, SimError> {
        config.validate()?;
        let rule = rule_from_config(&config.linking);
        let edges = topology_edges(rule.as_ref(), &oracle);
        let topology = Graph::from_parts(
            "environment",
            oracle.active_agents().map(|a| a.vertex),
            edges.iter().map(|e| e.endpoints()),
        )?;
        let monitor = SafetyMonitor::with_topology(config.monitor.clone(), &topology, oracle.attributes())?;
        debug!(
            agents = topology.vertex_count(),
            edges = topology.edge_count(),
            rule = rule.name(),
            "World bootstrapped"
        );

        Ok(Self {
            config,
            oracle,
            rule,
            edges,
            monitor,
            pending: Vec::new(),
            tick_count: 0,
        })
    }

    /// Oracle with no agents, seeded from the config.
    pub fn empty_oracle(config: &SimConfig) -> Result<Oracle, SimError> {
        // separate stream so topology code never perturbs trajectories
        let physics_seed = config.seed.wrapping_mul(0x9e3779b97f4a7c15);
        Oracle::new(physics_seed, config)
    }

    /// Creates a world with randomly placed zones, refuges, access points
    /// and mobile agents.
    pub fn random(config: SimConfig) -> Result<Self, SimError> {
        config.validate()?;
        let mut oracle = Self::empty_oracle(&config)?;
        for _ in 0..config.num_hazard_zones {
            let center = oracle.random_position();
            oracle.add_zone(HazardZone {
                center,
                radius: config.hazard_radius,
            });
        }
        for _ in 0..config.num_refuges {
            let p = oracle.random_position();
            oracle.spawn_agent(p, Vector2::zeros(), AgentKind::Refuge)?;
        }
        for _ in 0..config.num_access_points {
            let p = oracle.random_position();
            oracle.spawn_agent(p, Vector2::zeros(), AgentKind::AccessPoint)?;
        }
        for _ in 0..config.num_agents {
            oracle.spawn_random_mobile()?;
        }
        Self::new(config, oracle)
    }

    /// Advances physics by one tick, then settles the monitor.
    pub fn tick(&mut self) -> Result<StepReport, SimError> {
        let flipped = self.oracle.step(self.config.dt());
        self.tick_count += 1;
        self.settle(flipped)
    }

    /// Brings the monitor up to date with the oracle and evaluates every
    /// mobile agent.
    ///
    /// Edge removals are delivered first, then state changes for `flipped`
    /// and for pending flag edits, then edge additions.
    pub fn settle(&mut self, flipped: Vec<VertexId>) -> Result<StepReport, SimError> {
        let rebuilds_before = self.cache_generations();
        let mut report = StepReport {
            tick: self.tick_count,
            time: self.oracle.time(),
            ..Default::default()
        };

        let next = topology_edges(self.rule.as_ref(), &self.oracle);
        let removed: Vec<Edge> = self.edges.difference(&next).copied().collect();
        let added: Vec<Edge> = next.difference(&self.edges).copied().collect();

        for edge in &removed {
            let (u, v) = edge.endpoints();
            self.deliver(Notification::EdgeRemoved(u, v))?;
        }
        let mut changed = std::mem::take(&mut self.pending);
        changed.extend(flipped);
        changed.sort();
        changed.dedup();
        changed.retain(|v| self.oracle.is_active(*v));

        for v in changed {
            let before = self.monitor.synchronizer().class_of(v);
            self.deliver(Notification::AgentStateChanged(v))?;
            report.state_changes += 1;
            if self.monitor.synchronizer().class_of(v) != before {
                report.migrations += 1;
            }
        }
        for edge in &added {
            let (u, v) = edge.endpoints();
            self.deliver(Notification::EdgeAdded(u, v))?;
        }
        self.edges = next;
        report.edges_added = added.len();
        report.edges_removed = removed.len();
        report.notifications = removed.len() + added.len() + report.state_changes;

        report.unsafe_agents = self.unsafe_agents()?;
        report.hazardous = self
            .monitor
            .synchronizer()
            .member(PartitionClass::Matching)
            .graph()
            .vertex_count();

        if self.config.check_invariants {
            self.monitor.synchronizer().check_invariants()?;
        }
        report.cache_rebuilds = self.cache_generations() - rebuilds_before;
        trace!(
            tick = report.tick,
            notifications = report.notifications,
            unsafe_agents = report.unsafe_agents.len(),
            "Settled"
        );
        Ok(report)
    }

    fn deliver(&mut self, notification: Notification) -> Result<(), SimError> {
        self.monitor.notify(notification, self.oracle.attributes())?;
        Ok(())
    }

    fn cache_generations(&self) -> u64 {
        let sync = self.monitor.synchronizer();
        sync.member(PartitionClass::Matching).generation() + sync.member(PartitionClass::Complement).generation()
    }

    /// Spawns an agent and links it into the topology immediately.
    pub fn spawn_agent(
        &mut self,
        position: Vector2<f64>,
        velocity: Vector2<f64>,
        kind: AgentKind,
    ) -> Result<VertexId, SimError> {
        let v = self.oracle.spawn_agent(position, velocity, kind)?;
        self.deliver(Notification::VertexAdded(v))?;
        self.settle(Vec::new())?;
        Ok(v)
    }

    /// Removes an agent: its edges are withdrawn first, then the vertex.
    ///
    /// Returns false if the agent was not active.
    pub fn despawn_agent(&mut self, v: VertexId) -> Result<bool, SimError> {
        if !self.oracle.despawn_agent(v) {
            return Ok(false);
        }
        self.settle(Vec::new())?;
        self.deliver(Notification::VertexRemoved(v))?;
        Ok(true)
    }

    /// Writes a boolean attribute. A changed hazard flag is delivered as a
    /// state change on the next settle; until then the monitor still holds
    /// the agent in its old class.
    pub fn set_flag(&mut self, v: VertexId, name: &str, value: bool) -> bool {
        let changed = self.oracle.set_flag(v, name, value);
        if changed && name == self.config.monitor.hazard_attribute {
            self.pending.push(v);
        }
        changed
    }

    /// Safety verdict for one agent.
    pub fn is_safe(&mut self, agent: AgentId) -> Result<bool, SimError> {
        Ok(self
            .monitor
            .is_safe(agent, self.oracle.registry(), self.oracle.attributes())?)
    }

    /// Active mobile agents.
    pub fn mobile_agents(&self) -> Vec<AgentId> {
        self.oracle
            .active_agents()
            .filter(|a| a.kind == AgentKind::Mobile)
            .map(|a| a.id)
            .collect()
    }

    /// Mobile agents for which the safety property does not hold.
    pub fn unsafe_agents(&mut self) -> Result<Vec<AgentId>, SimError> {
        let agents = self.mobile_agents();
        Ok(self
            .monitor
            .unsafe_agents(agents, self.oracle.registry(), self.oracle.attributes())?)
    }

    /// The environment's current topology, built from scratch.
    pub fn topology(&self) -> Result<Graph, SimError> {
        Ok(Graph::from_parts(
            "environment",
            self.oracle.active_agents().map(|a| a.vertex),
            self.edges.iter().map(|e| e.endpoints()),
        )?)
    }

    pub fn snapshot(&self) -> MembershipSnapshot {
        self.monitor.synchronizer().snapshot()
    }

    pub fn oracle(&self) -> &Oracle {
        &self.oracle
    }

    pub fn monitor(&self) -> &SafetyMonitor {
        &self.monitor
    }

    pub fn monitor_mut(&mut self) -> &mut SafetyMonitor {
        &mut self.monitor
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    pub fn edges(&self) -> &BTreeSet<Edge> {
        &self.edges
    }

    /// Returns the current simulation time in seconds.
    pub fn time(&self) -> f64 {
        self.oracle.time()
    }

    /// Returns the current tick count.
    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }

    /// Returns the number of active agents.
    pub fn agent_count(&self) -> usize {
        self.oracle.active_agents().count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn still() -> SimConfig {
        SimConfig {
            velocity_jitter_std: 0.0,
            ..Default::default()
        }
    }

    fn line_world(xs: &[(f64, AgentKind)]) -> (SimWorld, Vec<VertexId>) {
        let config = still();
        let mut oracle = SimWorld::empty_oracle(&config).unwrap();
        let vs = xs
            .iter()
            .map(|(x, kind)| oracle.spawn_agent(Vector2::new(*x, 10.0), Vector2::zeros(), *kind).unwrap())
            .collect();
        (SimWorld::new(config, oracle).unwrap(), vs)
    }

    #[test]
    fn test_sim_world_creation() {
        let config = SimConfig {
            seed: 42,
            num_agents: 12,
            ..Default::default()
        };
        let world = SimWorld::random(config).unwrap();
        assert_eq!(world.agent_count(), 15);
        assert_eq!(world.tick_count(), 0);
        world.monitor().synchronizer().check_invariants().unwrap();
    }

    #[test]
    fn test_sim_world_tick() {
        let mut world = SimWorld::random(SimConfig::default()).unwrap();
        for _ in 0..10 {
            world.tick().unwrap();
        }
        assert_eq!(world.tick_count(), 10);
        assert!((world.time() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_hazard_flag_triggers_migration() {
        let (mut world, vs) = line_world(&[
            (0.0, AgentKind::Mobile),
            (50.0, AgentKind::Mobile),
            (100.0, AgentKind::Refuge),
        ]);
        assert!(world.unsafe_agents().unwrap().is_empty());

        assert!(world.set_flag(vs[0], "hazard", true));
        assert!(!world.set_flag(vs[0], "hazard", true));
        assert_eq!(world.monitor().synchronizer().class_of(vs[0]), Some(PartitionClass::Complement));
        let report = world.settle(Vec::new()).unwrap();
        assert_eq!((report.state_changes, report.migrations), (1, 1));
        assert_eq!(world.monitor().synchronizer().class_of(vs[0]), Some(PartitionClass::Matching));
        assert!(world.is_safe(AgentId(0)).unwrap());

        world.set_flag(vs[2], "refuge", false);
        let report = world.settle(Vec::new()).unwrap();
        assert_eq!(report.unsafe_agents, vec![AgentId(0), AgentId(1)]);
        assert_eq!(report.hazardous, 1);
    }

    #[test]
    fn test_moving_agent_diffs_edges() {
        let config = still();
        let mut oracle = SimWorld::empty_oracle(&config).unwrap();
        oracle.spawn_agent(Vector2::new(10.0, 10.0), Vector2::zeros(), AgentKind::Refuge).unwrap();
        oracle.spawn_agent(Vector2::new(200.0, 10.0), Vector2::new(-8.0, 0.0), AgentKind::Mobile).unwrap();
        let mut world = SimWorld::new(config, oracle).unwrap();
        assert_eq!(world.unsafe_agents().unwrap(), vec![AgentId(1)]);

        let mut joined = false;
        for _ in 0..300 {
            let report = world.tick().unwrap();
            if report.edges_added > 0 {
                assert!(report.unsafe_agents.is_empty());
                joined = true;
                break;
            }
        }
        assert!(joined);
    }

    #[test]
    fn test_spawn_and_despawn() {
        let (mut world, vs) = line_world(&[(0.0, AgentKind::Mobile), (100.0, AgentKind::Refuge)]);
        assert!(!world.is_safe(AgentId(0)).unwrap());

        let bridge = world
            .spawn_agent(Vector2::new(50.0, 10.0), Vector2::zeros(), AgentKind::Mobile)
            .unwrap();
        assert_eq!(world.edges().len(), 2);
        assert!(world.is_safe(AgentId(0)).unwrap());

        assert!(world.despawn_agent(bridge).unwrap());
        assert!(!world.despawn_agent(bridge).unwrap());
        assert!(world.edges().is_empty());
        assert!(!world.monitor().synchronizer().topology().contains_vertex(bridge));
        assert!(!world.is_safe(AgentId(0)).unwrap());
        assert!(world.monitor().synchronizer().topology().contains_vertex(vs[1]));
    }
}
