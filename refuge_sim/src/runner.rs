//! Scenario runner - executes the scenario catalogue.

use crate::config::{LinkingConfig, LinkingKind, SimConfig};
use crate::error::SimError;
use crate::exporter::{SimExport, SimFrame};
use crate::oracle::AgentKind;
use crate::reference;
use crate::scenarios::ScenarioId;
use crate::world::{SimWorld, StepReport};

use nalgebra::Vector2;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use refuge_core::{Component, PartitionClass};
use refuge_env::{AgentId, VertexId};
use serde::Serialize;
use tracing::{debug, error, info};

/// Failure messages kept per run.
const MAX_FAILURES: usize = 5;

/// Results from running a scenario.
#[derive(Debug, Clone, Serialize)]
pub struct ScenarioResult {
    /// Scenario that was run
    pub scenario: ScenarioId,

    /// Seed used
    pub seed: u64,

    /// Whether scenario passed all assertions
    pub passed: bool,

    /// Total ticks executed
    pub total_ticks: u64,

    /// Final simulation time in seconds
    pub final_time_secs: f64,

    /// Number of active agents at end
    pub final_agent_count: usize,

    /// Failure message if any
    pub failure_reason: Option<String>,

    /// Metrics collected during run
    pub metrics: ScenarioMetrics,
}

/// Metrics collected during scenario execution.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ScenarioMetrics {
    /// Notifications delivered to the monitor
    pub notifications: u64,

    pub edges_added: u64,

    pub edges_removed: u64,

    pub state_changes: u64,

    /// State changes that moved a vertex between member subgraphs
    pub migrations: u64,

    /// Sum over settles of the number of unsafe mobile agents
    pub unsafe_observations: u64,

    /// Component cache rebuilds across both member subgraphs
    pub cache_rebuilds: u64,

    /// Verdicts compared against the from-scratch evaluation
    pub reference_checks: u64,

    pub reference_mismatches: u64,

    pub spawned: u64,

    pub despawned: u64,
}

impl ScenarioMetrics {
    fn record(&mut self, report: &StepReport) {
        self.notifications += report.notifications as u64;
        self.edges_added += report.edges_added as u64;
        self.edges_removed += report.edges_removed as u64;
        self.state_changes += report.state_changes as u64;
        self.migrations += report.migrations as u64;
        self.unsafe_observations += report.unsafe_agents.len() as u64;
        self.cache_rebuilds += report.cache_rebuilds;
    }
}

/// One scenario in progress.
struct Run {
    world: SimWorld,
    metrics: ScenarioMetrics,
    failures: Vec<String>,
    export: Option<SimExport>,
    /// Harness actions not yet attached to an exported frame
    events: Vec<String>,
}

impl Run {
    fn new(world: SimWorld, export: Option<SimExport>) -> Self {
        Self {
            world,
            metrics: ScenarioMetrics::default(),
            failures: Vec::new(),
            export,
            events: Vec::new(),
        }
    }

    fn check(&mut self, ok: bool, msg: impl FnOnce() -> String) {
        if !ok && self.failures.len() < MAX_FAILURES {
            self.failures.push(msg());
        }
    }

    fn record(&mut self, report: StepReport) -> StepReport {
        self.metrics.record(&report);
        if let Some(export) = self.export.as_mut() {
            let mut frame = SimFrame::capture(&self.world, report.unsafe_agents.clone());
            frame.events = std::mem::take(&mut self.events);
            export.add_frame(frame);
        }
        report
    }

    fn note(&mut self, event: impl FnOnce() -> String) {
        if self.export.is_some() {
            self.events.push(event());
        }
    }

    /// Queues a flag edit for the next settle.
    fn set_flag(&mut self, v: VertexId, name: &str, value: bool) {
        if self.world.set_flag(v, name, value) {
            self.note(|| format!("{} {}={}", v, name, value));
        }
    }

    fn spawn(&mut self, position: Vector2<f64>, velocity: Vector2<f64>, kind: AgentKind) -> Result<VertexId, SimError> {
        let v = self.world.spawn_agent(position, velocity, kind)?;
        self.metrics.spawned += 1;
        self.note(|| format!("spawned {} ({:?}) at ({:.1}, {:.1})", v, kind, position.x, position.y));
        Ok(v)
    }

    fn despawn(&mut self, v: VertexId) -> Result<bool, SimError> {
        let removed = self.world.despawn_agent(v)?;
        if removed {
            self.metrics.despawned += 1;
            self.note(|| format!("despawned {}", v));
        }
        Ok(removed)
    }

    fn settle(&mut self) -> Result<StepReport, SimError> {
        let report = self.world.settle(Vec::new())?;
        Ok(self.record(report))
    }

    fn tick(&mut self) -> Result<StepReport, SimError> {
        let report = self.world.tick()?;
        Ok(self.record(report))
    }

    fn agent(&self, v: VertexId) -> Result<AgentId, SimError> {
        Ok(self.world.oracle().registry().agent_of(v)?)
    }

    fn components(&mut self, class: PartitionClass) -> Vec<Component> {
        let mut components: Vec<Component> = self
            .world
            .monitor_mut()
            .synchronizer_mut()
            .all_components(class)
            .into_iter()
            .cloned()
            .collect();
        components.sort();
        components
    }

    /// Compares every mobile agent's verdict with the from-scratch one.
    fn cross_check(&mut self) -> Result<(), SimError> {
        let topology = self.world.topology()?;
        let monitor_config = self.world.config().monitor.clone();
        for agent in self.world.mobile_agents() {
            let v = self.world.oracle().registry().vertex_of(agent)?;
            let expected = reference::is_safe(&topology, v, &monitor_config, self.world.oracle().attributes())?;
            let actual = self.world.is_safe(agent)?;
            self.metrics.reference_checks += 1;
            if expected != actual {
                self.metrics.reference_mismatches += 1;
                let tick = self.world.tick_count();
                self.check(false, || {
                    format!("tick {}: {} monitor={} reference={}", tick, agent, actual, expected)
                });
            }
        }
        Ok(())
    }
}

/// Runs scenarios.
pub struct ScenarioRunner {
    config: SimConfig,
}

impl ScenarioRunner {
    /// Creates a new scenario runner.
    pub fn new(config: SimConfig) -> Self {
        Self { config }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.config.seed = seed;
        self
    }

    /// Sets the maximum duration.
    pub fn with_duration(mut self, secs: f64) -> Self {
        self.config.max_duration_secs = secs;
        self
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    /// Runs a scenario and returns the result.
    pub fn run(&self, scenario: ScenarioId) -> ScenarioResult {
        self.execute(scenario, None).0
    }

    /// Runs a scenario, recording a frame after every settle.
    pub fn run_with_export(&self, scenario: ScenarioId) -> (ScenarioResult, SimExport) {
        let export = SimExport::new(scenario.name(), self.config.seed);
        let (result, export) = self.execute(scenario, Some(export));
        let mut export = export.unwrap_or_else(|| SimExport::new(scenario.name(), self.config.seed));
        export.finalize(result.passed, result.failure_reason.clone());
        (result, export)
    }

    fn execute(&self, scenario: ScenarioId, export: Option<SimExport>) -> (ScenarioResult, Option<SimExport>) {
        info!("Starting scenario: {} (seed={})", scenario.name(), self.config.seed);

        let outcome = match scenario {
            ScenarioId::Chain => self.run_chain(export),
            ScenarioId::RefugeLoss => self.run_refuge_loss(export),
            ScenarioId::Isolated => self.run_isolated(export),
            ScenarioId::EmptyWorld => self.run_empty_world(export),
            ScenarioId::Evacuation => self.run_random(self.config.clone(), export, false),
            ScenarioId::AccessPoints => self.run_random(self.access_point_config(), export, false),
            ScenarioId::Churn => self.run_random(self.config.clone(), export, true),
        };

        self.conclude(scenario, outcome)
    }

    /// Turns a finished or aborted run into its result. Any error, an
    /// engine invariant violation included, fails the scenario.
    fn conclude(
        &self,
        scenario: ScenarioId,
        outcome: Result<Run, SimError>,
    ) -> (ScenarioResult, Option<SimExport>) {
        match outcome {
            Ok(run) => {
                let passed = run.failures.is_empty();
                let result = ScenarioResult {
                    scenario,
                    seed: self.config.seed,
                    passed,
                    total_ticks: run.world.tick_count(),
                    final_time_secs: run.world.time(),
                    final_agent_count: run.world.agent_count(),
                    failure_reason: if passed { None } else { Some(run.failures.join("; ")) },
                    metrics: run.metrics,
                };
                (result, run.export)
            }
            Err(e) => {
                error!("Scenario {} aborted: {}", scenario.name(), e);
                let result = ScenarioResult {
                    scenario,
                    seed: self.config.seed,
                    passed: false,
                    total_ticks: 0,
                    final_time_secs: 0.0,
                    final_agent_count: 0,
                    failure_reason: Some(e.to_string()),
                    metrics: ScenarioMetrics::default(),
                };
                (result, None)
            }
        }
    }

    /// Still agents in a row, 50m apart, linked to their direct neighbors.
    fn line_world(&self, kinds: &[AgentKind], export: Option<SimExport>) -> Result<(Run, Vec<VertexId>), SimError> {
        let config = SimConfig {
            num_hazard_zones: 0,
            velocity_jitter_std: 0.0,
            linking: LinkingConfig::default(),
            ..self.config.clone()
        };
        let mut oracle = SimWorld::empty_oracle(&config)?;
        let vertices = kinds
            .iter()
            .enumerate()
            .map(|(i, kind)| oracle.spawn_agent(Vector2::new(50.0 + 50.0 * i as f64, 50.0), Vector2::zeros(), *kind))
            .collect::<Result<Vec<_>, _>>()?;
        Ok((Run::new(SimWorld::new(config, oracle)?, export), vertices))
    }

    fn access_point_config(&self) -> SimConfig {
        SimConfig {
            num_access_points: self.config.num_access_points.max(6),
            linking: LinkingConfig {
                kind: LinkingKind::ViaAccessPoint,
                radius: self.config.linking.radius * 0.6,
                ..self.config.linking.clone()
            },
            ..self.config.clone()
        }
    }

    /// A-B-C-D with B and C hazardous, then C recovers.
    fn run_chain(&self, export: Option<SimExport>) -> Result<Run, SimError> {
        info!("Chain: one hazard component, two clear singletons");
        let (mut run, vs) = self.line_world(&[AgentKind::Mobile; 4], export)?;
        let (a, b, c, d) = (vs[0], vs[1], vs[2], vs[3]);
        let hazard = self.config.monitor.hazard_attribute.clone();

        run.set_flag(b, &hazard, true);
        run.set_flag(c, &hazard, true);
        let report = run.settle()?;

        let matching = run.components(PartitionClass::Matching);
        run.check(matching == vec![Component::from([b, c])], || {
            format!("hazard components {:?}", matching)
        });
        let complement = run.components(PartitionClass::Complement);
        run.check(complement == vec![Component::from([a]), Component::from([d])], || {
            format!("clear components {:?}", complement)
        });
        let bc = run
            .world
            .monitor_mut()
            .synchronizer_mut()
            .path_exists(PartitionClass::Matching, b, c);
        run.check(bc, || "no hazard path B-C".to_string());
        // no refuge anywhere
        run.check(report.unsafe_agents.len() == 4, || {
            format!("{} unsafe agents, expected 4", report.unsafe_agents.len())
        });

        run.set_flag(c, &hazard, false);
        run.settle()?;
        let complement = run.components(PartitionClass::Complement);
        run.check(complement == vec![Component::from([a]), Component::from([c, d])], || {
            format!("clear components after recovery {:?}", complement)
        });
        let matching = run.components(PartitionClass::Matching);
        run.check(matching == vec![Component::from([b])], || {
            format!("hazard components after recovery {:?}", matching)
        });

        info!("Chain complete: {} migrations", run.metrics.migrations);
        Ok(run)
    }

    /// E, F hazardous; F's only clear neighbor G is a refuge until it isn't.
    fn run_refuge_loss(&self, export: Option<SimExport>) -> Result<Run, SimError> {
        info!("RefugeLoss: hazard pair exiting through a refuge");
        let (mut run, vs) = self.line_world(&[AgentKind::Mobile, AgentKind::Mobile, AgentKind::Refuge], export)?;
        let (e, f, g) = (vs[0], vs[1], vs[2]);
        let hazard = self.config.monitor.hazard_attribute.clone();
        let refuge = self.config.monitor.refuge_attribute.clone();

        run.set_flag(e, &hazard, true);
        run.set_flag(f, &hazard, true);
        run.settle()?;
        let agent_e = run.agent(e)?;
        let agent_f = run.agent(f)?;
        let safe = run.world.is_safe(agent_e)?;
        run.check(safe, || "E unsafe while G is a refuge".to_string());
        let safe = run.world.is_safe(agent_f)?;
        run.check(safe, || "F unsafe while G is a refuge".to_string());

        run.set_flag(g, &refuge, false);
        run.settle()?;
        let safe = run.world.is_safe(agent_e)?;
        run.check(!safe, || "E still safe after G lost its refuge".to_string());

        Ok(run)
    }

    /// H and its clear neighbor have no refuge until one spawns next to them.
    fn run_isolated(&self, export: Option<SimExport>) -> Result<Run, SimError> {
        info!("Isolated: clear component without a refuge");
        let (mut run, vs) = self.line_world(&[AgentKind::Mobile, AgentKind::Mobile], export)?;
        let agent_h = run.agent(vs[0])?;

        let report = run.settle()?;
        run.check(report.unsafe_agents.contains(&agent_h), || "H reported safe".to_string());

        // 50m past the last agent, inside linking range
        let refuge = run.spawn(Vector2::new(150.0, 50.0), Vector2::zeros(), AgentKind::Refuge)?;
        run.settle()?;
        let safe = run.world.is_safe(agent_h)?;
        run.check(safe, || format!("H unsafe after refuge {} spawned", refuge));

        Ok(run)
    }

    fn run_empty_world(&self, export: Option<SimExport>) -> Result<Run, SimError> {
        info!("EmptyWorld: nothing to connect");
        let (mut run, _) = self.line_world(&[], export)?;
        let report = run.settle()?;

        for class in [PartitionClass::Matching, PartitionClass::Complement] {
            let sync = run.world.monitor_mut().synchronizer_mut();
            let connected = sync.is_connected(class);
            let count = sync.component_count(class);
            run.check(!connected, || format!("empty {:?} subgraph reported connected", class));
            run.check(count == 0, || format!("empty {:?} subgraph has {} components", class, count));
        }
        run.check(report.unsafe_agents.is_empty(), || "unsafe agents in empty world".to_string());
        Ok(run)
    }

    /// Physics-driven run, cross-checked against the from-scratch
    /// evaluation every tick. With `churn`, agents also spawn and despawn.
    fn run_random(&self, config: SimConfig, export: Option<SimExport>, churn: bool) -> Result<Run, SimError> {
        let target_ticks = config.target_ticks();
        let tick_rate = config.tick_rate_hz as u64;
        let arena = config.arena_size;
        let max_speed = config.max_speed;
        let mut churn_rng = ChaCha8Rng::seed_from_u64(config.seed.wrapping_mul(0x517cc1b727220a95));

        let mut run = Run::new(SimWorld::random(config)?, export);
        run.settle()?;
        run.cross_check()?;

        for tick in 0..target_ticks {
            if churn {
                if churn_rng.gen_bool(0.1) {
                    let position = Vector2::new(churn_rng.gen_range(0.0..arena), churn_rng.gen_range(0.0..arena));
                    let velocity = Vector2::new(
                        churn_rng.gen_range(-max_speed..=max_speed),
                        churn_rng.gen_range(-max_speed..=max_speed),
                    );
                    run.spawn(position, velocity, AgentKind::Mobile)?;
                }
                let mobile = run.world.mobile_agents();
                if !mobile.is_empty() && churn_rng.gen_bool(0.1) {
                    let agent = mobile[churn_rng.gen_range(0..mobile.len())];
                    let v = run.world.oracle().registry().vertex_of(agent)?;
                    run.despawn(v)?;
                }
            }

            let report = run.tick()?;
            run.cross_check()?;

            if tick_rate > 0 && tick % tick_rate == 0 {
                debug!(
                    "  t={:.1}s | agents={} | hazardous={} | unsafe={} | rebuilds={}",
                    report.time,
                    run.world.agent_count(),
                    report.hazardous,
                    report.unsafe_agents.len(),
                    run.metrics.cache_rebuilds
                );
            }
        }

        info!(
            "Random run complete: {} ticks, {} notifications, {} migrations, {} checks, {} mismatches",
            run.world.tick_count(),
            run.metrics.notifications,
            run.metrics.migrations,
            run.metrics.reference_checks,
            run.metrics.reference_mismatches
        );
        Ok(run)
    }
}
