//! Error types for workflow assembly.

use std::path::PathBuf;

use dwiprep_graph::GraphError;
use dwiprep_output::PathBuildError;
use thiserror::Error;

/// Errors raised while assembling run or subject graphs.
#[derive(Debug, Error)]
pub enum WorkflowError {
    // === Data Absence ===
    /// A diffusion run lacks a file it cannot be processed without.
    #[error("run {run} is missing its {missing} file")]
    MissingRunData { run: PathBuf, missing: &'static str },

    /// The anatomical graph was requested without any T1w image.
    #[error("no T1w image for sub-{subject}")]
    MissingAnatomical { subject: String },

    // === Template Defects ===
    #[error(transparent)]
    Graph(#[from] GraphError),

    #[error(transparent)]
    Path(#[from] PathBuildError),
}

impl WorkflowError {
    /// True when the failure is caused by missing input data rather than a defect.
    pub fn is_data_absence(&self) -> bool {
        matches!(
            self,
            WorkflowError::MissingRunData { .. } | WorkflowError::MissingAnatomical { .. }
        )
    }
}

/// Result type for workflow assembly.
pub type Result<T> = std::result::Result<T, WorkflowError>;
