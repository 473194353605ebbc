//! Refuge Deterministic Simulation Harness
//!
//! This crate drives the safety monitor from a controlled, seeded world:
//! - **Oracle**: ground truth positions, hazard zones and agent attributes
//! - **Linking**: neighbor rules that turn positions into a topology
//! - **World**: diffs the topology every tick into explicit notifications
//! - **Runner**: scripted and random scenarios, cross-checked against a
//!   from-scratch evaluation
//!
//! All randomness is derived from a single 64-bit seed, so a failing seed
//! replays exactly.
//!
//! # Usage
//!
//! ```no_run
//! use refuge_sim::{ScenarioRunner, SimConfig};
//! use refuge_sim::scenarios::ScenarioId;
//!
//! let config = SimConfig {
//!     seed: 42,
//!     num_agents: 20,
//!     ..Default::default()
//! };
//!
//! let result = ScenarioRunner::new(config).run(ScenarioId::Evacuation);
//! assert!(result.passed);
//! ```

pub mod config;
pub mod error;
pub mod exporter;
pub mod linking;
pub mod oracle;
pub mod reference;
pub mod runner;
pub mod scenarios;
pub mod world;

pub use config::{LinkingConfig, LinkingKind, SimConfig};
pub use error::SimError;
pub use exporter::{AgentFrame, SimExport, SimFrame};
pub use linking::{ConnectViaAccessPoint, ConnectWithinDistance, LinkingRule};
pub use oracle::{AgentKind, HazardZone, Oracle, SimAgent};
pub use runner::{ScenarioMetrics, ScenarioResult, ScenarioRunner};
pub use world::{SimWorld, StepReport};
