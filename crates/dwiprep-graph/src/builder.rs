//! Graph assembly and validation.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use petgraph::algo::{tarjan_scc, toposort};
use petgraph::graphmap::DiGraphMap;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{GraphCycleError, GraphWiringError, PortDirection, Result};
use crate::node::ProcessingNode;
use crate::pipeline::PipelineGraph;

/// One port of one node.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PortRef {
    pub node: String,
    pub port: String,
}

impl PortRef {
    pub fn new(node: impl Into<String>, port: impl Into<String>) -> Self {
        Self {
            node: node.into(),
            port: port.into(),
        }
    }
}

impl fmt::Display for PortRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.node, self.port)
    }
}

/// Data flow from a producer's output port to a consumer's input port.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Edge {
    pub from: PortRef,
    pub to: PortRef,
}

impl Edge {
    pub fn new(from_node: &str, from_port: &str, to_node: &str, to_port: &str) -> Self {
        Self {
            from: PortRef::new(from_node, from_port),
            to: PortRef::new(to_node, to_port),
        }
    }
}

/// Collects nodes and edges; [`GraphBuilder::build`] validates them.
#[derive(Debug, Clone, Default)]
pub struct GraphBuilder {
    name: String,
    nodes: Vec<ProcessingNode>,
    edges: Vec<Edge>,
}

impl GraphBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn add_node(&mut self, node: ProcessingNode) -> &mut Self {
        self.nodes.push(node);
        self
    }

    /// Embed a built graph. Its nodes are renamed `{graph}.{node}`.
    pub fn add_graph(&mut self, graph: &PipelineGraph) -> &mut Self {
        let prefix = graph.name();
        for node in graph.nodes() {
            self.nodes
                .push(node.renamed(format!("{prefix}.{}", node.name())));
        }
        for edge in graph.edges() {
            self.edges.push(Edge::new(
                &format!("{prefix}.{}", edge.from.node),
                &edge.from.port,
                &format!("{prefix}.{}", edge.to.node),
                &edge.to.port,
            ));
        }
        self
    }

    pub fn connect(
        &mut self,
        from_node: &str,
        from_port: &str,
        to_node: &str,
        to_port: &str,
    ) -> &mut Self {
        self.edges
            .push(Edge::new(from_node, from_port, to_node, to_port));
        self
    }

    /// Connect several `(output, input)` port pairs between two nodes.
    pub fn connect_many(&mut self, from_node: &str, to_node: &str, ports: &[(&str, &str)]) -> &mut Self {
        for (from_port, to_port) in ports {
            self.connect(from_node, from_port, to_node, to_port);
        }
        self
    }

    pub fn contains(&self, node: &str) -> bool {
        self.nodes.iter().any(|candidate| candidate.name() == node)
    }

    pub fn build(self) -> Result<PipelineGraph> {
        build_graph(self.name, self.nodes, self.edges)
    }
}

/// Validate nodes and edges into an acyclic [`PipelineGraph`].
///
/// Checks, in order: node names are unique, bindings name declared inputs,
/// every edge endpoint resolves, no input is fed twice, and the edges are
/// acyclic.
pub fn build_graph(
    name: impl Into<String>,
    nodes: impl IntoIterator<Item = ProcessingNode>,
    edges: impl IntoIterator<Item = Edge>,
) -> Result<PipelineGraph> {
    let name = name.into();
    let edges: Vec<Edge> = edges.into_iter().collect();

    let mut by_name: BTreeMap<String, ProcessingNode> = BTreeMap::new();
    for node in nodes {
        if by_name.contains_key(node.name()) {
            return Err(GraphWiringError::DuplicateNode {
                graph: name,
                node: node.name().to_string(),
            }
            .into());
        }
        by_name.insert(node.name().to_string(), node);
    }
    if by_name.is_empty() {
        return Err(GraphWiringError::Empty { graph: name }.into());
    }

    let mut fed: BTreeSet<PortRef> = BTreeSet::new();
    for node in by_name.values() {
        for port in node.bindings().keys() {
            if !node.has_input(port) {
                return Err(unknown_port(&name, node.name(), port, PortDirection::Input));
            }
            fed.insert(PortRef::new(node.name(), port.as_str()));
        }
    }

    for edge in &edges {
        let producer = by_name
            .get(&edge.from.node)
            .ok_or_else(|| unknown_node(&name, &edge.from.node))?;
        if !producer.has_output(&edge.from.port) {
            return Err(unknown_port(&name, &edge.from.node, &edge.from.port, PortDirection::Output));
        }
        let consumer = by_name
            .get(&edge.to.node)
            .ok_or_else(|| unknown_node(&name, &edge.to.node))?;
        if !consumer.has_input(&edge.to.port) {
            return Err(unknown_port(&name, &edge.to.node, &edge.to.port, PortDirection::Input));
        }
        if !fed.insert(edge.to.clone()) {
            return Err(GraphWiringError::DuplicateFeed {
                graph: name,
                node: edge.to.node.clone(),
                port: edge.to.port.clone(),
            }
            .into());
        }
    }

    let order = topological_order(&name, &by_name, &edges)?;
    debug!(graph = %name, node_count = by_name.len(), edge_count = edges.len(), "built graph");
    Ok(PipelineGraph::from_parts(name, by_name, edges, order))
}

fn topological_order(
    graph: &str,
    nodes: &BTreeMap<String, ProcessingNode>,
    edges: &[Edge],
) -> std::result::Result<Vec<String>, GraphCycleError> {
    let mut dag: DiGraphMap<&str, ()> = DiGraphMap::new();
    for name in nodes.keys() {
        dag.add_node(name.as_str());
    }
    for edge in edges {
        dag.add_edge(edge.from.node.as_str(), edge.to.node.as_str(), ());
    }
    match toposort(&dag, None) {
        Ok(order) => Ok(order.into_iter().map(str::to_string).collect()),
        Err(cycle) => {
            let start = cycle.node_id();
            let mut members: Vec<String> = tarjan_scc(&dag)
                .into_iter()
                .find(|component| component.contains(&start))
                .unwrap_or_else(|| vec![start])
                .into_iter()
                .map(str::to_string)
                .collect();
            members.sort();
            Err(GraphCycleError {
                graph: graph.to_string(),
                nodes: members,
            })
        }
    }
}

fn unknown_node(graph: &str, node: &str) -> GraphWiringError {
    GraphWiringError::UnknownNode {
        graph: graph.to_string(),
        node: node.to_string(),
    }
}

fn unknown_port(graph: &str, node: &str, port: &str, direction: PortDirection) -> crate::GraphError {
    GraphWiringError::UnknownPort {
        graph: graph.to_string(),
        node: node.to_string(),
        port: port.to_string(),
        direction,
    }
    .into()
}
