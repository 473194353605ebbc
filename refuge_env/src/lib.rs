//! Refuge Environment Abstraction Layer
//!
//! This crate holds the boundary contracts between the Refuge engine and
//! the collaborators that drive it:
//! - **Identity**: agent ids and the dense vertex handles the graphs use
//! - **State**: named per-agent attributes read through [`AttributeLookup`]
//! - **Change**: the [`Notification`] stream emitted by the topology and
//!   agent models
//!
//! The engine never owns agent data. It only holds [`VertexId`] handles and
//! asks the environment for attribute values when it needs to classify.
//!
//! # Example
//!
//! ```
//! use refuge_env::{AgentId, AgentRegistry, AttributeLookup, AttributeTable};
//!
//! let mut registry = AgentRegistry::new();
//! let v = registry.register(AgentId(17)).unwrap();
//!
//! let mut attrs = AttributeTable::new();
//! attrs.set_flag(v, "danger", true);
//! assert!(attrs.flag(v, "danger").unwrap());
//! ```

mod attributes;
mod error;
mod registry;
mod types;

pub use attributes::{AttributeLookup, AttributeTable, AttributeValue};
pub use error::EnvError;
pub use registry::AgentRegistry;
pub use types::{AgentId, Notification, VertexId};
