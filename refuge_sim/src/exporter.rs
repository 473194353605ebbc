//! JSON exporter for offline inspection.
//!
//! Records one frame per exported tick: agent positions and flags, the
//! unsafe set, and the current membership of both member subgraphs.

use crate::oracle::AgentKind;
use crate::world::SimWorld;
use refuge_core::MembershipSnapshot;
use refuge_env::{AgentId, AttributeLookup};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Write;
use std::path::Path;

/// A single frame of simulation data.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimFrame {
    /// Simulation time in seconds
    pub time_sec: f64,

    pub tick: u64,

    pub agents: Vec<AgentFrame>,

    pub unsafe_agents: Vec<AgentId>,

    pub membership: MembershipSnapshot,

    /// Flag edits and agent churn applied since the previous frame
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub events: Vec<String>,
}

/// Position and flags of one agent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentFrame {
    pub agent_id: AgentId,
    pub vertex: u32,
    pub kind: AgentKind,
    pub x: f64,
    pub y: f64,
    pub hazard: bool,
    pub refuge: bool,
}

impl SimFrame {
    /// Captures the world as it stands.
    pub fn capture(world: &SimWorld, unsafe_agents: Vec<AgentId>) -> Self {
        let oracle = world.oracle();
        let attrs = oracle.attributes();
        let agents = oracle
            .active_agents()
            .map(|a| AgentFrame {
                agent_id: a.id,
                vertex: a.vertex.0,
                kind: a.kind,
                x: a.position.x,
                y: a.position.y,
                hazard: attrs.flag(a.vertex, oracle.hazard_attribute()).unwrap_or(false),
                refuge: attrs.flag(a.vertex, oracle.refuge_attribute()).unwrap_or(false),
            })
            .collect();
        Self {
            time_sec: world.time(),
            tick: world.tick_count(),
            agents,
            unsafe_agents,
            membership: world.snapshot(),
            events: Vec::new(),
        }
    }
}

/// Complete simulation export.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimExport {
    /// Scenario name
    pub scenario: String,

    /// Seed used
    pub seed: u64,

    /// Duration in seconds
    pub duration_sec: f64,

    /// All frames
    pub frames: Vec<SimFrame>,

    /// Final results
    pub passed: bool,

    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub failure_reason: Option<String>,
}

impl SimExport {
    /// Creates a new export container.
    pub fn new(scenario: &str, seed: u64) -> Self {
        Self {
            scenario: scenario.to_string(),
            seed,
            duration_sec: 0.0,
            frames: Vec::new(),
            passed: false,
            failure_reason: None,
        }
    }

    /// Adds a frame.
    pub fn add_frame(&mut self, frame: SimFrame) {
        self.duration_sec = frame.time_sec;
        self.frames.push(frame);
    }

    /// Finalizes the export.
    pub fn finalize(&mut self, passed: bool, failure_reason: Option<String>) {
        self.passed = passed;
        self.failure_reason = failure_reason;
    }

    /// Writes to a JSON file.
    pub fn write_to_file(&self, path: impl AsRef<Path>) -> std::io::Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        let mut file = File::create(path)?;
        file.write_all(json.as_bytes())?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SimConfig;
    use nalgebra::Vector2;

    #[test]
    fn test_capture_frame() {
        let config = SimConfig::default();
        let mut oracle = SimWorld::empty_oracle(&config).unwrap();
        oracle.spawn_agent(Vector2::new(0.0, 0.0), Vector2::zeros(), AgentKind::Mobile).unwrap();
        oracle.spawn_agent(Vector2::new(10.0, 0.0), Vector2::zeros(), AgentKind::Refuge).unwrap();
        let world = SimWorld::new(config, oracle).unwrap();

        let frame = SimFrame::capture(&world, Vec::new());
        assert_eq!(frame.agents.len(), 2);
        assert!(frame.agents[1].refuge);
        assert!(!frame.agents[0].hazard);
        assert_eq!(frame.membership.complement.vertices.len(), 2);
        assert_eq!(frame.membership.complement.edges.len(), 1);
    }

    #[test]
    fn test_export_serializes() {
        let mut export = SimExport::new("chain", 7);
        export.finalize(false, Some("mismatch".to_string()));
        let json = serde_json::to_value(&export).unwrap();
        assert_eq!(json["scenario"], "chain");
        assert_eq!(json["failure_reason"], "mismatch");
        assert!(json["frames"].as_array().unwrap().is_empty());
    }

    #[test]
    fn test_events_omitted_when_empty() {
        let config = SimConfig::default();
        let world = SimWorld::new(config.clone(), SimWorld::empty_oracle(&config).unwrap()).unwrap();
        let mut frame = SimFrame::capture(&world, Vec::new());
        let json = serde_json::to_value(&frame).unwrap();
        assert!(json.get("events").is_none());

        frame.events.push("v0 hazard=true".to_string());
        let json = serde_json::to_value(&frame).unwrap();
        assert_eq!(json["events"][0], "v0 hazard=true");
    }
}
