//! Error types for dataset indexing.

use std::path::PathBuf;

use dwiprep_model::ModelError;
use thiserror::Error;

/// Errors that can occur while indexing or querying a dataset.
#[derive(Debug, Error)]
pub enum IngestError {
    // === File System Errors ===
    /// Dataset root does not exist or is not a directory.
    #[error("directory not found: {path}")]
    DirectoryNotFound { path: PathBuf },

    /// Failed to read directory entries.
    #[error("failed to read directory {path}: {source}")]
    DirectoryRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Failed to read file.
    #[error("failed to read file {path}: {source}")]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // === Filename Errors ===
    /// Filename does not follow the `sub-<label>[_key-value]_<suffix>.<ext>` layout.
    #[error("unrecognized dataset filename {path}: {reason}")]
    UnrecognizedFilename { path: PathBuf, reason: String },

    /// Entity value in a filename was rejected by the model.
    #[error("invalid entity in {path}: {source}")]
    InvalidEntity {
        path: PathBuf,
        #[source]
        source: ModelError,
    },

    // === Metadata Errors ===
    /// Sidecar JSON could not be parsed.
    #[error("failed to parse metadata {path}: {source}")]
    MetadataParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// Sidecar JSON is valid but not an object.
    #[error("metadata in {path} is not a JSON object")]
    MetadataNotObject { path: PathBuf },
}

impl IngestError {
    /// True when the error concerns a single file rather than the dataset as a whole.
    pub fn is_file_local(&self) -> bool {
        !matches!(
            self,
            IngestError::DirectoryNotFound { .. } | IngestError::DirectoryRead { .. }
        )
    }
}

/// Result type for indexing operations.
pub type Result<T> = std::result::Result<T, IngestError>;
