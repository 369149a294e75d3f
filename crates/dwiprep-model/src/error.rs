//! Error types for the entity model.

use thiserror::Error;

/// Errors raised while constructing model values.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ModelError {
    /// Entity key is not part of the supported vocabulary.
    #[error("unknown entity key: {0}")]
    UnknownEntity(String),

    /// Phase-encoding direction could not be interpreted.
    #[error("invalid phase-encoding direction: {0}")]
    InvalidDirection(String),

    /// Datatype name is not one of dwi, fmap, t1w, t2w.
    #[error("unknown datatype: {0}")]
    UnknownDatatype(String),

    /// Entity value is empty or contains a path separator.
    #[error("invalid {key} label: '{value}'")]
    InvalidLabel { key: String, value: String },
}

/// Result type for model operations.
pub type Result<T> = std::result::Result<T, ModelError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ModelError::InvalidLabel {
            key: "subject".to_string(),
            value: "a/b".to_string(),
        };
        assert_eq!(err.to_string(), "invalid subject label: 'a/b'");
    }
}
