//! Refuge Core - Incremental Partitioned-Graph Safety Monitor
//!
//! This library answers one question after every step of a simulation:
//! can each hazardous agent reach a refuge by hopping only through
//! non-hazardous agents? It does so without rebuilding anything from scratch:
//! 1. **Graph**: an undirected topology mirror that reports every change as an event
//! 2. **Connectivity**: lazily cached connected components, merged on insertion
//!    and invalidated on removal
//! 3. **Partition**: two induced member subgraphs kept in sync with a runtime
//!    predicate, one connectivity tracker each
//! 4. **Monitor**: the hazard/refuge reachability query over those trackers

pub mod connectivity;
pub mod error;
pub mod graph;
pub mod monitor;
pub mod partition;

// Re-export key types for convenience
pub use connectivity::{Component, ConnectivityTracker, TrackedGraph};
pub use error::{EngineError, EngineResult};
pub use graph::{Edge, Graph, GraphEvent};
pub use monitor::{MonitorConfig, SafetyMonitor};
pub use partition::{
    AttributeFlag, GraphSnapshot, MembershipSnapshot, PartitionClass, PartitionPredicate,
    PartitionSynchronizer,
};
