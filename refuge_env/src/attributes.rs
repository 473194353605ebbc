//! Per-agent attribute storage and the lookup contract used by predicates.

use crate::error::EnvError;
use crate::types::VertexId;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// A value stored under a named attribute of an agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttributeValue {
    Flag(bool),
    Number(f64),
    Text(String),
}

impl AttributeValue {
    /// Short type name used in error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            AttributeValue::Flag(_) => "flag",
            AttributeValue::Number(_) => "number",
            AttributeValue::Text(_) => "text",
        }
    }
}

impl From<bool> for AttributeValue {
    fn from(b: bool) -> Self {
        AttributeValue::Flag(b)
    }
}

impl From<f64> for AttributeValue {
    fn from(n: f64) -> Self {
        AttributeValue::Number(n)
    }
}

/// Synchronous attribute lookup `(vertex, name) -> value`.
///
/// Implemented by the agent model. Partition predicates and the safety
/// query only ever read through this trait.
pub trait AttributeLookup {
    /// Returns the attribute value, or `None` when the agent does not carry it.
    fn attribute(&self, vertex: VertexId, name: &str) -> Result<Option<AttributeValue>, EnvError>;

    /// Reads a boolean attribute. A missing attribute reads as `false`; a
    /// value of another type is an error.
    fn flag(&self, vertex: VertexId, name: &str) -> Result<bool, EnvError> {
        match self.attribute(vertex, name)? {
            None => Ok(false),
            Some(AttributeValue::Flag(b)) => Ok(b),
            Some(other) => Err(EnvError::TypeMismatch {
                vertex,
                name: name.to_string(),
                expected: "flag",
                found: other.kind(),
            }),
        }
    }
}

impl<T: AttributeLookup + ?Sized> AttributeLookup for &T {
    fn attribute(&self, vertex: VertexId, name: &str) -> Result<Option<AttributeValue>, EnvError> {
        (**self).attribute(vertex, name)
    }
}

/// In-memory attribute store keyed by vertex handle.
#[derive(Debug, Default, Clone)]
pub struct AttributeTable {
    values: HashMap<VertexId, BTreeMap<String, AttributeValue>>,
}

impl AttributeTable {
    /// Creates an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Writes an attribute, returning the previous value.
    pub fn set(
        &mut self,
        vertex: VertexId,
        name: &str,
        value: impl Into<AttributeValue>,
    ) -> Option<AttributeValue> {
        self.values
            .entry(vertex)
            .or_default()
            .insert(name.to_string(), value.into())
    }

    /// Writes a boolean attribute and reports whether its truth value changed.
    pub fn set_flag(&mut self, vertex: VertexId, name: &str, value: bool) -> bool {
        let previous = self.set(vertex, name, value);
        !matches!(previous, Some(AttributeValue::Flag(b)) if b == value)
            && !(previous.is_none() && !value)
    }

    /// Removes one attribute from a vertex.
    pub fn remove(&mut self, vertex: VertexId, name: &str) -> Option<AttributeValue> {
        self.values.get_mut(&vertex)?.remove(name)
    }

    /// Drops every attribute of a vertex.
    pub fn clear_vertex(&mut self, vertex: VertexId) {
        self.values.remove(&vertex);
    }

    /// All attributes of one vertex, in name order.
    pub fn attributes_of(&self, vertex: VertexId) -> Option<&BTreeMap<String, AttributeValue>> {
        self.values.get(&vertex)
    }
}

impl AttributeLookup for AttributeTable {
    fn attribute(&self, vertex: VertexId, name: &str) -> Result<Option<AttributeValue>, EnvError> {
        Ok(self.values.get(&vertex).and_then(|attrs| attrs.get(name)).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_flag_reads_false() {
        let table = AttributeTable::new();
        assert!(!table.flag(VertexId(0), "danger").unwrap());
    }

    #[test]
    fn test_flag_type_mismatch() {
        let mut table = AttributeTable::new();
        table.set(VertexId(1), "danger", 0.5);
        let err = table.flag(VertexId(1), "danger").unwrap_err();
        assert!(matches!(err, EnvError::TypeMismatch { found: "number", .. }));
    }

    #[test]
    fn test_set_flag_reports_changes() {
        let mut table = AttributeTable::new();
        let v = VertexId(2);
        // absent reads false, so writing false is not a change
        assert!(!table.set_flag(v, "safe", false));
        assert!(table.set_flag(v, "safe", true));
        assert!(!table.set_flag(v, "safe", true));
        assert!(table.set_flag(v, "safe", false));
    }

    #[test]
    fn test_remove_and_clear() {
        let mut table = AttributeTable::new();
        let v = VertexId(3);
        table.set(v, "safe", true);
        table.set(v, "label", AttributeValue::Text("shelter".into()));
        assert_eq!(table.remove(v, "safe"), Some(AttributeValue::Flag(true)));
        assert!(!table.flag(v, "safe").unwrap());
        table.clear_vertex(v);
        assert!(table.attributes_of(v).is_none());
    }

    #[test]
    fn test_lookup_through_reference() {
        let mut table = AttributeTable::new();
        table.set(VertexId(0), "danger", true);
        let by_ref: &dyn AttributeLookup = &table;
        assert!(by_ref.flag(VertexId(0), "danger").unwrap());
    }
}
