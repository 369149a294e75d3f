//! Error types for graph construction and dispatch.

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

/// Which side of a node a port belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PortDirection {
    Input,
    Output,
}

impl fmt::Display for PortDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PortDirection::Input => f.write_str("input"),
            PortDirection::Output => f.write_str("output"),
        }
    }
}

/// A reference in the graph that does not resolve.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GraphWiringError {
    #[error("graph '{graph}' has no nodes")]
    Empty { graph: String },

    #[error("graph '{graph}' declares node '{node}' twice")]
    DuplicateNode { graph: String, node: String },

    #[error("graph '{graph}': edge references unknown node '{node}'")]
    UnknownNode { graph: String, node: String },

    #[error("graph '{graph}': node '{node}' has no {direction} port '{port}'")]
    UnknownPort {
        graph: String,
        node: String,
        port: String,
        direction: PortDirection,
    },

    /// An input port receives more than one value.
    #[error("graph '{graph}': input '{node}.{port}' is fed more than once")]
    DuplicateFeed {
        graph: String,
        node: String,
        port: String,
    },

    /// A required input has neither an edge nor a bound value.
    #[error("graph '{graph}': required input '{node}.{port}' is not connected")]
    Unwired {
        graph: String,
        node: String,
        port: String,
    },
}

/// The graph's edges form a cycle.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("graph '{graph}' contains a cycle through {}", nodes.join(", "))]
pub struct GraphCycleError {
    pub graph: String,
    /// Nodes on the cycle, sorted by name.
    pub nodes: Vec<String>,
}

/// Errors raised while building a graph.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GraphError {
    #[error(transparent)]
    Wiring(#[from] GraphWiringError),

    #[error(transparent)]
    Cycle(#[from] GraphCycleError),
}

/// Errors raised while handing a graph to an executor.
#[derive(Debug, Error)]
pub enum ExecutorError {
    #[error("failed to create plan directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write plan {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to serialize plan: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Result type for graph construction.
pub type Result<T> = std::result::Result<T, GraphError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = GraphError::from(GraphCycleError {
            graph: "wf".to_string(),
            nodes: vec!["a".to_string(), "b".to_string()],
        });
        assert_eq!(err.to_string(), "graph 'wf' contains a cycle through a, b");

        let err = GraphWiringError::UnknownPort {
            graph: "wf".to_string(),
            node: "denoise".to_string(),
            port: "noise".to_string(),
            direction: PortDirection::Output,
        };
        assert!(err.to_string().contains("no output port 'noise'"));
    }

    #[test]
    fn test_executor_error_display() {
        let err = ExecutorError::CreateDir {
            path: PathBuf::from("/out/work/plans"),
            source: std::io::Error::from(std::io::ErrorKind::PermissionDenied),
        };
        assert!(err.to_string().starts_with("failed to create plan directory /out/work/plans"));
    }
}
