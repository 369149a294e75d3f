//! Error types for configuration and orchestration.

use std::path::PathBuf;

use dwiprep_graph::{ExecutorError, GraphError};
use dwiprep_ingest::IngestError;
use dwiprep_model::ModelError;
use dwiprep_query::QueryError;
use dwiprep_workflows::WorkflowError;
use thiserror::Error;

/// Errors raised while configuring or running the orchestrator.
#[derive(Debug, Error)]
pub enum CoreError {
    // === Configuration ===
    /// Config file could not be read.
    #[error("failed to read config {path}: {source}")]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Config file is not valid TOML or has unknown keys.
    #[error("failed to parse config {path}: {source}")]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    /// A participant or session label is malformed.
    #[error(transparent)]
    Label(#[from] ModelError),

    // === Orchestration ===
    /// Every session of the subject was skipped.
    #[error("no runnable diffusion data for sub-{subject}")]
    NoRunnableData { subject: String },

    #[error(transparent)]
    Index(#[from] IngestError),

    #[error(transparent)]
    Query(#[from] QueryError),

    #[error(transparent)]
    Workflow(#[from] WorkflowError),

    #[error(transparent)]
    Graph(#[from] GraphError),

    #[error(transparent)]
    Executor(#[from] ExecutorError),
}

/// Result type for core operations.
pub type Result<T> = std::result::Result<T, CoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = CoreError::NoRunnableData {
            subject: "01".to_string(),
        };
        assert_eq!(err.to_string(), "no runnable diffusion data for sub-01");
    }
}
