//! # Physical State
//!
//! What a reconciliation pass leaves behind: for every applied node, its kind, the
//! predecessors it was applied with, and the output the service reported. The next pass
//! (or a teardown) starts from this record. It round-trips through JSON so a failed pass
//! can be persisted and resumed later.

use crate::chain::LogicalId;
use crate::error::StateError;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

/// Idempotency token for a node: `"{stack_id}-{logical_id}"`.
pub fn idempotency_key(stack_id: &str, logical_id: &LogicalId) -> String {
    format!("{stack_id}-{logical_id}")
}

/// Identifiers a node exposes to its dependents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeOutput {
    /// Assigned by the service on first create and stable afterwards.
    pub physical_id: String,
    /// Name the resource is addressed by.
    pub name: String,
    #[serde(default)]
    pub attributes: BTreeMap<String, String>,
}

impl NodeOutput {
    pub fn new(physical_id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            physical_id: physical_id.into(),
            name: name.into(),
            attributes: BTreeMap::new(),
        }
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.attributes.insert(key.into(), value.to_string());
        self
    }

    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).map(String::as_str)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhysicalRecord {
    pub kind: String,
    #[serde(default)]
    pub depends_on: BTreeSet<LogicalId>,
    pub output: NodeOutput,
}

/// Applied nodes keyed by logical id.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhysicalState {
    #[serde(default)]
    pub records: BTreeMap<LogicalId, PhysicalRecord>,
}

impl PhysicalState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, logical_id: &LogicalId) -> Option<&PhysicalRecord> {
        self.records.get(logical_id)
    }

    pub fn output(&self, logical_id: &LogicalId) -> Option<&NodeOutput> {
        self.records.get(logical_id).map(|r| &r.output)
    }

    pub fn physical_id(&self, logical_id: &LogicalId) -> Option<&str> {
        self.output(logical_id).map(|o| o.physical_id.as_str())
    }

    pub fn insert(&mut self, logical_id: LogicalId, record: PhysicalRecord) {
        self.records.insert(logical_id, record);
    }

    pub fn remove(&mut self, logical_id: &LogicalId) -> Option<PhysicalRecord> {
        self.records.remove(logical_id)
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Physical ids by logical id, for comparing two passes.
    pub fn physical_ids(&self) -> BTreeMap<LogicalId, String> {
        self.records
            .iter()
            .map(|(id, r)| (id.clone(), r.output.physical_id.clone()))
            .collect()
    }

    pub fn to_json(&self) -> Result<String, StateError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self, StateError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), StateError> {
        std::fs::write(path, self.to_json()?)?;
        Ok(())
    }

    /// Loads a saved state. A missing file is an empty state.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, StateError> {
        match std::fs::read_to_string(path) {
            Ok(json) => Self::from_json(&json),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(e) => Err(e.into()),
        }
    }
}
