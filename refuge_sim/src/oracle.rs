//! Ground truth oracle for simulation.
//!
//! The Oracle is the agent/environment model the engine observes:
//! - True positions and velocities of all agents
//! - Per-agent attributes (hazard, refuge, access point)
//! - Hazard zones deciding which agents are hazardous
//! - Identity, through the agent registry

use crate::config::SimConfig;
use crate::error::SimError;
use nalgebra::Vector2;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rand_distr::{Distribution, Normal};
use refuge_env::{AgentId, AgentRegistry, AttributeLookup, AttributeTable, VertexId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Role of an agent in the world.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentKind {
    /// Moves every tick, subject to hazards
    Mobile,
    /// Static safe place
    Refuge,
    /// Static relay
    AccessPoint,
}

/// A ground truth agent.
#[derive(Debug, Clone)]
pub struct SimAgent {
    pub id: AgentId,

    pub vertex: VertexId,

    /// Position [x, y] in meters
    pub position: Vector2<f64>,

    /// Velocity [vx, vy] in m/s
    pub velocity: Vector2<f64>,

    pub kind: AgentKind,

    /// Agent is active (not despawned)
    pub active: bool,
}

/// A circular hazardous area.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HazardZone {
    pub center: Vector2<f64>,
    pub radius: f64,
}

impl HazardZone {
    pub fn contains(&self, p: &Vector2<f64>) -> bool {
        (p - self.center).norm() <= self.radius
    }
}

/// The Oracle - maintains ground truth agent state.
pub struct Oracle {
    /// Master seed (separate from the monitor so topology changes don't
    /// affect trajectories)
    physics_seed: u64,

    physics_rng: ChaCha8Rng,

    registry: AgentRegistry,

    attributes: AttributeTable,

    agents: BTreeMap<VertexId, SimAgent>,

    zones: Vec<HazardZone>,

    next_id: u64,

    current_time: f64,

    arena_size: f64,

    max_speed: f64,

    jitter: Normal<f64>,

    hazard_attribute: String,

    refuge_attribute: String,

    access_point_attribute: String,
}

impl Oracle {
    /// Creates an empty Oracle for the given config.
    pub fn new(physics_seed: u64, config: &SimConfig) -> Result<Self, SimError> {
        let jitter = Normal::new(0.0, config.velocity_jitter_std)
            .map_err(|e| SimError::config(format!("velocity jitter: {}", e)))?;
        Ok(Self {
            physics_seed,
            physics_rng: ChaCha8Rng::seed_from_u64(physics_seed),
            registry: AgentRegistry::new(),
            attributes: AttributeTable::new(),
            agents: BTreeMap::new(),
            zones: Vec::new(),
            next_id: 0,
            current_time: 0.0,
            arena_size: config.arena_size,
            max_speed: config.max_speed,
            jitter,
            hazard_attribute: config.monitor.hazard_attribute.clone(),
            refuge_attribute: config.monitor.refuge_attribute.clone(),
            access_point_attribute: config.access_point_attribute.clone(),
        })
    }

    pub fn physics_seed(&self) -> u64 {
        self.physics_seed
    }

    /// Spawns a new agent and returns its vertex handle.
    ///
    /// Static kinds get their role attribute set; every agent gets its hazard
    /// flag from the current zones.
    pub fn spawn_agent(
        &mut self,
        position: Vector2<f64>,
        velocity: Vector2<f64>,
        kind: AgentKind,
    ) -> Result<VertexId, SimError> {
        let id = AgentId(self.next_id);
        let vertex = self.registry.register(id)?;
        self.next_id += 1;

        match kind {
            AgentKind::Refuge => {
                self.attributes.set_flag(vertex, &self.refuge_attribute, true);
            }
            AgentKind::AccessPoint => {
                self.attributes.set_flag(vertex, &self.access_point_attribute, true);
            }
            AgentKind::Mobile => {}
        }
        let hazardous = self.in_hazard_zone(&position);
        self.attributes.set_flag(vertex, &self.hazard_attribute, hazardous);

        self.agents.insert(
            vertex,
            SimAgent {
                id,
                vertex,
                position,
                velocity,
                kind,
                active: true,
            },
        );
        Ok(vertex)
    }

    /// Spawns a mobile agent at a random position with a random heading.
    pub fn spawn_random_mobile(&mut self) -> Result<VertexId, SimError> {
        let position = self.random_position();
        let angle = self.physics_rng.gen_range(0.0..std::f64::consts::TAU);
        let speed = self.physics_rng.gen_range(0.0..=self.max_speed);
        let velocity = Vector2::new(angle.cos(), angle.sin()) * speed;
        self.spawn_agent(position, velocity, AgentKind::Mobile)
    }

    /// Uniform random position inside the arena.
    pub fn random_position(&mut self) -> Vector2<f64> {
        Vector2::new(
            self.physics_rng.gen_range(0.0..self.arena_size),
            self.physics_rng.gen_range(0.0..self.arena_size),
        )
    }

    /// Marks an agent inactive. Returns false if it was not active.
    pub fn despawn_agent(&mut self, vertex: VertexId) -> bool {
        match self.agents.get_mut(&vertex) {
            Some(agent) if agent.active => {
                agent.active = false;
                true
            }
            _ => false,
        }
    }

    pub fn add_zone(&mut self, zone: HazardZone) {
        self.zones.push(zone);
    }

    pub fn zones(&self) -> &[HazardZone] {
        &self.zones
    }

    fn in_hazard_zone(&self, p: &Vector2<f64>) -> bool {
        self.zones.iter().any(|z| z.contains(p))
    }

    /// Advances physics by dt seconds and returns the agents whose hazard
    /// flag flipped.
    ///
    /// Mobile agents get Gaussian velocity jitter, capped speed, and bounce
    /// off the arena walls.
    pub fn step(&mut self, dt: f64) -> Vec<VertexId> {
        self.current_time += dt;
        let jitter_scale = dt.sqrt();

        for agent in self.agents.values_mut() {
            if !agent.active || agent.kind != AgentKind::Mobile {
                continue;
            }
            let noise = Vector2::new(
                self.jitter.sample(&mut self.physics_rng),
                self.jitter.sample(&mut self.physics_rng),
            );
            agent.velocity += noise * jitter_scale;
            let speed = agent.velocity.norm();
            if speed > self.max_speed && speed > 0.0 {
                agent.velocity *= self.max_speed / speed;
            }
            agent.position += agent.velocity * dt;

            for axis in 0..2 {
                if agent.position[axis] < 0.0 {
                    agent.position[axis] = -agent.position[axis];
                    agent.velocity[axis] = agent.velocity[axis].abs();
                } else if agent.position[axis] > self.arena_size {
                    agent.position[axis] = 2.0 * self.arena_size - agent.position[axis];
                    agent.velocity[axis] = -agent.velocity[axis].abs();
                }
            }
        }

        self.reclassify()
    }

    /// Recomputes every active agent's hazard flag from the zones.
    pub fn reclassify(&mut self) -> Vec<VertexId> {
        let mut flipped = Vec::new();
        for agent in self.agents.values() {
            if !agent.active {
                continue;
            }
            let hazardous = self.zones.iter().any(|z| z.contains(&agent.position));
            if self
                .attributes
                .set_flag(agent.vertex, &self.hazard_attribute, hazardous)
            {
                flipped.push(agent.vertex);
            }
        }
        flipped
    }

    /// Writes a boolean attribute. Returns whether the value changed.
    pub fn set_flag(&mut self, vertex: VertexId, name: &str, value: bool) -> bool {
        self.attributes.set_flag(vertex, name, value)
    }

    /// Returns the current simulation time.
    pub fn time(&self) -> f64 {
        self.current_time
    }

    /// Returns all active agents in handle order.
    pub fn active_agents(&self) -> impl Iterator<Item = &SimAgent> {
        self.agents.values().filter(|a| a.active)
    }

    pub fn agent(&self, vertex: VertexId) -> Option<&SimAgent> {
        self.agents.get(&vertex)
    }

    pub fn is_active(&self, vertex: VertexId) -> bool {
        self.agents.get(&vertex).map(|a| a.active).unwrap_or(false)
    }

    /// Distance between two agents, if both exist.
    pub fn distance(&self, a: VertexId, b: VertexId) -> Option<f64> {
        let pa = self.agents.get(&a)?.position;
        let pb = self.agents.get(&b)?.position;
        Some((pa - pb).norm())
    }

    /// Active agents within `range` of `center`, excluding `center` itself.
    pub fn within_range(&self, center: VertexId, range: f64) -> Vec<VertexId> {
        let Some(origin) = self.agents.get(&center).map(|a| a.position) else {
            return Vec::new();
        };
        self.active_agents()
            .filter(|a| a.vertex != center && (a.position - origin).norm() <= range)
            .map(|a| a.vertex)
            .collect()
    }

    pub fn is_access_point(&self, vertex: VertexId) -> bool {
        self.attributes
            .flag(vertex, &self.access_point_attribute)
            .unwrap_or(false)
    }

    pub fn registry(&self) -> &AgentRegistry {
        &self.registry
    }

    pub fn attributes(&self) -> &AttributeTable {
        &self.attributes
    }

    pub fn hazard_attribute(&self) -> &str {
        &self.hazard_attribute
    }

    pub fn refuge_attribute(&self) -> &str {
        &self.refuge_attribute
    }

    /// Positions of all active agents.
    pub fn positions(&self) -> Vec<(AgentId, Vector2<f64>)> {
        self.active_agents().map(|a| (a.id, a.position)).collect()
    }
}
