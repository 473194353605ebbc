//! Scenario catalogue.
//!
//! Scripted scenarios place a handful of agents by hand and assert exact
//! answers. Random scenarios run the physics and cross-check every verdict
//! against a from-scratch evaluation.

use serde::{Deserialize, Serialize};

/// Scenario identifiers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScenarioId {
    /// Four agents in a line, the middle two hazardous
    Chain,

    /// Hazard pair whose only exit loses its refuge
    RefugeLoss,

    /// Clear agent cut off from every refuge
    Isolated,

    /// No agents at all
    EmptyWorld,

    /// Mobile agents drifting through hazard zones
    Evacuation,

    /// Sparse radio range bridged by access points
    AccessPoints,

    /// Agents joining and leaving while moving
    Churn,
}

impl ScenarioId {
    /// Returns a list of all scenarios.
    pub fn all() -> Vec<ScenarioId> {
        vec![
            ScenarioId::Chain,
            ScenarioId::RefugeLoss,
            ScenarioId::Isolated,
            ScenarioId::EmptyWorld,
            ScenarioId::Evacuation,
            ScenarioId::AccessPoints,
            ScenarioId::Churn,
        ]
    }

    /// Returns the hand-placed scenarios.
    pub fn scripted() -> Vec<ScenarioId> {
        Self::all().into_iter().filter(|s| !s.is_random()).collect()
    }

    /// Returns the scenario name.
    pub fn name(&self) -> &'static str {
        match self {
            ScenarioId::Chain => "chain",
            ScenarioId::RefugeLoss => "refuge_loss",
            ScenarioId::Isolated => "isolated",
            ScenarioId::EmptyWorld => "empty_world",
            ScenarioId::Evacuation => "evacuation",
            ScenarioId::AccessPoints => "access_points",
            ScenarioId::Churn => "churn",
        }
    }

    /// Returns a description of the scenario.
    pub fn description(&self) -> &'static str {
        match self {
            ScenarioId::Chain => "A-B-C-D line with B and C hazardous: one hazard component, two clear singletons",
            ScenarioId::RefugeLoss => "Hazard pair exits through a refuge; safety lost when the refuge flag is cleared",
            ScenarioId::Isolated => "Clear agent whose component holds no refuge is unsafe",
            ScenarioId::EmptyWorld => "Empty topology: neither member subgraph is connected",
            ScenarioId::Evacuation => "Random motion through hazard zones, verdicts cross-checked every tick",
            ScenarioId::AccessPoints => "Relay linking through access points, verdicts cross-checked every tick",
            ScenarioId::Churn => "Random spawn and despawn while moving, verdicts cross-checked every tick",
        }
    }

    /// Returns true if this scenario runs the physics.
    pub fn is_random(&self) -> bool {
        matches!(
            self,
            ScenarioId::Evacuation | ScenarioId::AccessPoints | ScenarioId::Churn
        )
    }
}

impl std::fmt::Display for ScenarioId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl std::str::FromStr for ScenarioId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "chain" => Ok(ScenarioId::Chain),
            "refuge_loss" | "refugeloss" => Ok(ScenarioId::RefugeLoss),
            "isolated" => Ok(ScenarioId::Isolated),
            "empty_world" | "emptyworld" | "empty" => Ok(ScenarioId::EmptyWorld),
            "evacuation" => Ok(ScenarioId::Evacuation),
            "access_points" | "accesspoints" => Ok(ScenarioId::AccessPoints),
            "churn" => Ok(ScenarioId::Churn),
            _ => Err(format!("Unknown scenario: {}", s)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_names_parse_back() {
        for id in ScenarioId::all() {
            assert_eq!(id.name().parse::<ScenarioId>().unwrap(), id);
            assert_eq!(id.to_string(), id.name());
        }
    }

    #[test]
    fn test_parse_aliases() {
        assert_eq!("Refuge-Loss".parse::<ScenarioId>().unwrap(), ScenarioId::RefugeLoss);
        assert_eq!("empty".parse::<ScenarioId>().unwrap(), ScenarioId::EmptyWorld);
        assert!("split_brain".parse::<ScenarioId>().is_err());
    }

    #[test]
    fn test_scripted_excludes_random() {
        let scripted = ScenarioId::scripted();
        assert_eq!(scripted.len(), 4);
        assert!(scripted.iter().all(|s| !s.is_random()));
    }
}
