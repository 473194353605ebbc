//! Neighbor selection for the simulated topology.
//!
//! A rule computes each agent's neighborhood from oracle positions. The
//! union of all neighborhoods, symmetrised, is the undirected topology the
//! engine mirrors.

use crate::config::{LinkingConfig, LinkingKind};
use crate::oracle::Oracle;
use refuge_core::Edge;
use refuge_env::VertexId;
use std::collections::BTreeSet;

/// Computes the neighborhood of one agent.
pub trait LinkingRule: Send + Sync {
    fn neighborhood(&self, center: VertexId, oracle: &Oracle) -> BTreeSet<VertexId>;

    fn name(&self) -> &'static str;
}

/// Links agents within `radius`. Access points also link to access points
/// within `access_point_radius`.
#[derive(Debug, Clone)]
pub struct ConnectWithinDistance {
    pub radius: f64,
    pub access_point_radius: f64,
}

impl LinkingRule for ConnectWithinDistance {
    fn neighborhood(&self, center: VertexId, oracle: &Oracle) -> BTreeSet<VertexId> {
        let mut neighbors: BTreeSet<VertexId> = oracle.within_range(center, self.radius).into_iter().collect();
        if oracle.is_access_point(center) {
            neighbors.extend(
                oracle
                    .within_range(center, self.access_point_radius)
                    .into_iter()
                    .filter(|v| oracle.is_access_point(*v)),
            );
        }
        neighbors
    }

    fn name(&self) -> &'static str {
        "within_distance"
    }
}

/// [`ConnectWithinDistance`] plus relaying: an ordinary agent next to an
/// access point also links to every ordinary agent within `radius` of that
/// access point.
#[derive(Debug, Clone)]
pub struct ConnectViaAccessPoint {
    pub base: ConnectWithinDistance,
}

impl LinkingRule for ConnectViaAccessPoint {
    fn neighborhood(&self, center: VertexId, oracle: &Oracle) -> BTreeSet<VertexId> {
        let mut neighbors = self.base.neighborhood(center, oracle);
        if oracle.is_access_point(center) {
            return neighbors;
        }

        let relays: Vec<VertexId> = neighbors
            .iter()
            .copied()
            .filter(|v| oracle.is_access_point(*v))
            .collect();
        for ap in relays {
            neighbors.extend(
                oracle
                    .within_range(ap, self.base.radius)
                    .into_iter()
                    .filter(|v| *v != center && !oracle.is_access_point(*v)),
            );
        }
        neighbors
    }

    fn name(&self) -> &'static str {
        "via_access_point"
    }
}

/// Builds the rule named by the config.
pub fn rule_from_config(config: &LinkingConfig) -> Box<dyn LinkingRule> {
    let base = ConnectWithinDistance {
        radius: config.radius,
        access_point_radius: config.access_point_radius,
    };
    match config.kind {
        LinkingKind::WithinDistance => Box::new(base),
        LinkingKind::ViaAccessPoint => Box::new(ConnectViaAccessPoint { base }),
    }
}

/// Undirected edge set over all active agents.
///
/// A pair is linked if either endpoint lists the other.
pub fn topology_edges(rule: &dyn LinkingRule, oracle: &Oracle) -> BTreeSet<Edge> {
    let mut edges = BTreeSet::new();
    for agent in oracle.active_agents() {
        for other in rule.neighborhood(agent.vertex, oracle) {
            if other != agent.vertex && oracle.is_active(other) {
                edges.insert(Edge::new(agent.vertex, other));
            }
        }
    }
    edges
}
