//! Simulation configuration.
//!
//! Every field has a default, so a JSON config file only needs the values it
//! overrides. Command-line flags are applied on top by the binary.

use crate::error::SimError;
use refuge_core::MonitorConfig;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Which neighbor-selection rule builds the topology.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LinkingKind {
    /// Radio range only (access points also reach each other further away)
    WithinDistance,
    /// Radio range plus relaying through nearby access points
    ViaAccessPoint,
}

/// Neighbor-selection parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LinkingConfig {
    pub kind: LinkingKind,

    /// Node-to-node range in meters
    pub radius: f64,

    /// Access-point-to-access-point range in meters
    pub access_point_radius: f64,
}

impl Default for LinkingConfig {
    fn default() -> Self {
        Self {
            kind: LinkingKind::WithinDistance,
            radius: 60.0,
            access_point_radius: 150.0,
        }
    }
}

/// Configuration for a simulation run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    /// Master seed for determinism
    pub seed: u64,

    /// Number of mobile agents to spawn
    pub num_agents: usize,

    /// Number of static refuge agents
    pub num_refuges: usize,

    /// Number of static access points
    pub num_access_points: usize,

    /// Number of circular hazard zones
    pub num_hazard_zones: usize,

    /// Hazard zone radius in meters
    pub hazard_radius: f64,

    /// Side of the square arena in meters
    pub arena_size: f64,

    /// Speed cap for mobile agents in m/s
    pub max_speed: f64,

    /// Std-dev of the per-second velocity jitter in m/s
    pub velocity_jitter_std: f64,

    /// Tick rate in Hz
    pub tick_rate_hz: u32,

    /// Maximum simulation duration in seconds
    pub max_duration_secs: f64,

    /// Verify the partition invariant after every tick
    pub check_invariants: bool,

    /// Boolean attribute marking access points
    pub access_point_attribute: String,

    pub monitor: MonitorConfig,

    pub linking: LinkingConfig,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            num_agents: 40,
            num_refuges: 3,
            num_access_points: 0,
            num_hazard_zones: 2,
            hazard_radius: 80.0,
            arena_size: 500.0,
            max_speed: 8.0,
            velocity_jitter_std: 2.0,
            tick_rate_hz: 10,
            max_duration_secs: 10.0,
            check_invariants: true,
            access_point_attribute: "access_point".to_string(),
            monitor: MonitorConfig::default(),
            linking: LinkingConfig::default(),
        }
    }
}

impl SimConfig {
    /// Loads a config file, filling missing fields with defaults.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, SimError> {
        let text = std::fs::read_to_string(path)?;
        let config: SimConfig = serde_json::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    /// Rejects values the simulation cannot run with.
    pub fn validate(&self) -> Result<(), SimError> {
        if self.tick_rate_hz == 0 {
            return Err(SimError::config("tick_rate_hz must be positive"));
        }
        if !(self.arena_size.is_finite() && self.arena_size > 0.0) {
            return Err(SimError::config("arena_size must be positive"));
        }
        if !(self.velocity_jitter_std.is_finite() && self.velocity_jitter_std >= 0.0) {
            return Err(SimError::config("velocity_jitter_std must be non-negative"));
        }
        if !(self.max_speed.is_finite() && self.max_speed >= 0.0) {
            return Err(SimError::config("max_speed must be non-negative"));
        }
        let radii = [self.linking.radius, self.linking.access_point_radius];
        if !radii.iter().all(|r| r.is_finite() && *r >= 0.0) {
            return Err(SimError::config("linking radii must be non-negative"));
        }
        let names = [
            &self.monitor.hazard_attribute,
            &self.monitor.refuge_attribute,
            &self.access_point_attribute,
        ];
        if names[0] == names[1] || names[0] == names[2] || names[1] == names[2] {
            return Err(SimError::config("attribute names must be distinct"));
        }
        Ok(())
    }

    /// Time step in seconds.
    pub fn dt(&self) -> f64 {
        1.0 / self.tick_rate_hz as f64
    }

    /// Number of ticks covering `max_duration_secs`.
    pub fn target_ticks(&self) -> u64 {
        (self.max_duration_secs * self.tick_rate_hz as f64) as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        SimConfig::default().validate().unwrap();
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: SimConfig = serde_json::from_str(
            r#"{"seed": 7, "linking": {"kind": "via_access_point"}, "monitor": {"refuge_attribute": "shelter"}}"#,
        )
        .unwrap();
        assert_eq!(config.seed, 7);
        assert_eq!(config.linking.kind, LinkingKind::ViaAccessPoint);
        assert_eq!(config.linking.radius, 60.0);
        assert_eq!(config.monitor.refuge_attribute, "shelter");
        assert_eq!(config.monitor.hazard_attribute, "hazard");
    }

    #[test]
    fn test_rejects_zero_tick_rate() {
        let config = SimConfig {
            tick_rate_hz: 0,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(SimError::Config(_))));
    }

    #[test]
    fn test_rejects_bad_speed_and_radii() {
        for max_speed in [-1.0, f64::NAN, f64::INFINITY] {
            let config = SimConfig {
                max_speed,
                ..Default::default()
            };
            assert!(matches!(config.validate(), Err(SimError::Config(_))));
        }

        let mut config = SimConfig::default();
        config.linking.radius = f64::NAN;
        assert!(config.validate().is_err());

        let mut config = SimConfig::default();
        config.linking.access_point_radius = f64::INFINITY;
        assert!(config.validate().is_err());

        let config = SimConfig {
            max_speed: 0.0,
            ..Default::default()
        };
        config.validate().unwrap();
    }

    #[test]
    fn test_rejects_shared_attribute_names() {
        let mut config = SimConfig::default();
        config.monitor.refuge_attribute = config.monitor.hazard_attribute.clone();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_target_ticks() {
        let config = SimConfig {
            tick_rate_hz: 10,
            max_duration_secs: 2.5,
            ..Default::default()
        };
        assert_eq!(config.target_ticks(), 25);
        assert!((config.dt() - 0.1).abs() < 1e-12);
    }
}
