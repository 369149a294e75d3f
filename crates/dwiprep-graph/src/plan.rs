//! Serializable plan documents.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::builder::{Edge, build_graph};
use crate::error::Result;
use crate::node::ProcessingNode;
use crate::pipeline::PipelineGraph;

/// A graph as written to disk for an external executor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanDocument {
    pub name: String,
    pub generated_at: DateTime<Utc>,
    pub nodes: Vec<ProcessingNode>,
    pub edges: Vec<Edge>,
    pub order: Vec<String>,
}

impl PlanDocument {
    pub fn from_graph(graph: &PipelineGraph, generated_at: DateTime<Utc>) -> Self {
        Self {
            name: graph.name().to_string(),
            generated_at,
            nodes: graph.nodes().cloned().collect(),
            edges: graph.edges().to_vec(),
            order: graph.topological_order().to_vec(),
        }
    }

    /// Rebuild and revalidate the graph.
    pub fn into_graph(self) -> Result<PipelineGraph> {
        build_graph(self.name, self.nodes, self.edges)
    }
}
