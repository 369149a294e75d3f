//! Error types for path building.

use std::path::PathBuf;

use dwiprep_model::EntityKey;
use thiserror::Error;

/// Errors raised while rendering or materializing output paths.
#[derive(Debug, Error)]
pub enum PathBuildError {
    /// A required placeholder has no value.
    #[error("missing required entity '{entity}' for pattern {pattern}")]
    MissingEntity { entity: EntityKey, pattern: String },

    /// An entity value would break the path structure.
    #[error("entity '{entity}' has invalid value '{value}'")]
    InvalidEntityValue { entity: EntityKey, value: String },

    /// The pattern itself is malformed.
    #[error("invalid path pattern {pattern}: {reason}")]
    InvalidPattern { pattern: String, reason: String },

    /// The parent directory could not be created.
    #[error("failed to create directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Result type for path building.
pub type Result<T> = std::result::Result<T, PathBuildError>;
