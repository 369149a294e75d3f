//! Validated, acyclic processing graphs.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt::Write as _;

use serde::Serialize;

use crate::builder::{Edge, PortRef};
use crate::error::{GraphWiringError, Result};
use crate::node::ProcessingNode;

/// A named, validated DAG of processing nodes.
///
/// Constructed only through [`crate::GraphBuilder`] or [`crate::build_graph`],
/// so every edge resolves and the graph is acyclic.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PipelineGraph {
    name: String,
    nodes: BTreeMap<String, ProcessingNode>,
    edges: Vec<Edge>,
    order: Vec<String>,
}

impl PipelineGraph {
    pub(crate) fn from_parts(
        name: String,
        nodes: BTreeMap<String, ProcessingNode>,
        edges: Vec<Edge>,
        order: Vec<String>,
    ) -> Self {
        Self {
            name,
            nodes,
            edges,
            order,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Nodes sorted by name.
    pub fn nodes(&self) -> impl Iterator<Item = &ProcessingNode> {
        self.nodes.values()
    }

    pub fn node(&self, name: &str) -> Option<&ProcessingNode> {
        self.nodes.get(name)
    }

    pub fn node_names(&self) -> BTreeSet<&str> {
        self.nodes.keys().map(String::as_str).collect()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.nodes.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    /// Node names such that every producer precedes its consumers.
    pub fn topological_order(&self) -> &[String] {
        &self.order
    }

    /// Nodes without incoming edges.
    pub fn entry_points(&self) -> Vec<&str> {
        let consumers: BTreeSet<&str> = self.edges.iter().map(|edge| edge.to.node.as_str()).collect();
        self.nodes
            .keys()
            .map(String::as_str)
            .filter(|name| !consumers.contains(name))
            .collect()
    }

    /// Edges feeding `node`.
    pub fn incoming<'a>(&'a self, node: &'a str) -> impl Iterator<Item = &'a Edge> + 'a {
        self.edges.iter().filter(move |edge| edge.to.node == node)
    }

    /// Required inputs with neither an incoming edge nor a bound value.
    pub fn unresolved_inputs(&self) -> Vec<PortRef> {
        let fed: BTreeSet<(&str, &str)> = self
            .edges
            .iter()
            .map(|edge| (edge.to.node.as_str(), edge.to.port.as_str()))
            .collect();
        let mut unresolved = Vec::new();
        for node in self.nodes.values() {
            for (port, spec) in node.inputs() {
                if spec.required
                    && !node.bindings().contains_key(port)
                    && !fed.contains(&(node.name(), port.as_str()))
                {
                    unresolved.push(PortRef::new(node.name(), port.as_str()));
                }
            }
        }
        unresolved
    }

    /// Fail on the first required input that nothing feeds.
    pub fn ensure_fully_wired(&self) -> Result<()> {
        match self.unresolved_inputs().into_iter().next() {
            Some(port) => Err(GraphWiringError::Unwired {
                graph: self.name.clone(),
                node: port.node,
                port: port.port,
            }
            .into()),
            None => Ok(()),
        }
    }

    /// A fresh copy under another name.
    pub fn clone_as(&self, name: impl Into<String>) -> PipelineGraph {
        PipelineGraph {
            name: name.into(),
            ..self.clone()
        }
    }

    /// Top-level sub-graphs: the first segment of every namespaced node name.
    pub fn units(&self) -> BTreeSet<&str> {
        self.nodes
            .keys()
            .filter_map(|name| name.split_once('.').map(|(unit, _)| unit))
            .collect()
    }

    /// Graphviz rendering, one line per node and edge.
    pub fn to_dot(&self) -> String {
        let mut dot = String::new();
        let _ = writeln!(dot, "digraph {} {{", quote(&self.name));
        let _ = writeln!(dot, "  rankdir=LR;");
        for node in self.nodes.values() {
            let _ = writeln!(
                dot,
                "  {} [label={}];",
                quote(node.name()),
                quote(&format!("{}\\n{}", node.name(), node.step()))
            );
        }
        for edge in &self.edges {
            let _ = writeln!(
                dot,
                "  {} -> {} [label={}];",
                quote(&edge.from.node),
                quote(&edge.to.node),
                quote(&format!("{}:{}", edge.from.port, edge.to.port))
            );
        }
        dot.push_str("}\n");
        dot
    }
}

fn quote(text: &str) -> String {
    format!("\"{}\"", text.replace('"', "\\\""))
}
