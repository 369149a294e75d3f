//! Processing nodes: one external step with named ports.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Opaque identifier of the external operation a node runs.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StepKind(String);

impl StepKind {
    /// Pass-through node used for sub-graph inputs and outputs.
    pub const IDENTITY: &'static str = "identity";

    pub fn new(kind: impl Into<String>) -> Self {
        Self(kind.into())
    }

    pub fn identity() -> Self {
        Self::new(Self::IDENTITY)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_identity(&self) -> bool {
        self.0 == Self::IDENTITY
    }
}

impl fmt::Display for StepKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Declaration of an input port.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortSpec {
    pub required: bool,
}

/// A node of a processing graph.
///
/// Parameters are passed to the step verbatim. Bindings set an input port to
/// a constant value instead of an upstream output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessingNode {
    name: String,
    step: StepKind,
    #[serde(default)]
    inputs: BTreeMap<String, PortSpec>,
    #[serde(default)]
    outputs: BTreeSet<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    params: BTreeMap<String, Value>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    bindings: BTreeMap<String, Value>,
}

impl ProcessingNode {
    pub fn new(name: impl Into<String>, step: StepKind) -> Self {
        Self {
            name: name.into(),
            step,
            inputs: BTreeMap::new(),
            outputs: BTreeSet::new(),
            params: BTreeMap::new(),
            bindings: BTreeMap::new(),
        }
    }

    /// A pass-through node exposing each field as an optional input and an output.
    pub fn identity(name: impl Into<String>, fields: &[&str]) -> Self {
        fields.iter().fold(
            Self::new(name, StepKind::identity()),
            |node, field| node.optional_input(*field).output(*field),
        )
    }

    #[must_use]
    pub fn input(mut self, port: impl Into<String>) -> Self {
        self.inputs.insert(port.into(), PortSpec { required: true });
        self
    }

    #[must_use]
    pub fn optional_input(mut self, port: impl Into<String>) -> Self {
        self.inputs.insert(port.into(), PortSpec { required: false });
        self
    }

    #[must_use]
    pub fn output(mut self, port: impl Into<String>) -> Self {
        self.outputs.insert(port.into());
        self
    }

    #[must_use]
    pub fn param(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }

    /// Merge a parameter bag; later keys replace earlier ones.
    #[must_use]
    pub fn params<K, V>(mut self, params: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<Value>,
    {
        for (key, value) in params {
            self.params.insert(key.into(), value.into());
        }
        self
    }

    /// Bind an input port to a constant value.
    #[must_use]
    pub fn bind(mut self, port: impl Into<String>, value: impl Into<Value>) -> Self {
        self.bindings.insert(port.into(), value.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn step(&self) -> &StepKind {
        &self.step
    }

    pub fn inputs(&self) -> &BTreeMap<String, PortSpec> {
        &self.inputs
    }

    pub fn outputs(&self) -> &BTreeSet<String> {
        &self.outputs
    }

    pub fn param_values(&self) -> &BTreeMap<String, Value> {
        &self.params
    }

    pub fn bindings(&self) -> &BTreeMap<String, Value> {
        &self.bindings
    }

    pub fn has_input(&self, port: &str) -> bool {
        self.inputs.contains_key(port)
    }

    pub fn has_output(&self, port: &str) -> bool {
        self.outputs.contains(port)
    }

    pub(crate) fn renamed(&self, name: String) -> Self {
        Self {
            name,
            ..self.clone()
        }
    }
}
