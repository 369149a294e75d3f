//! Error types for input resolution and fieldmap pairing.

use std::path::PathBuf;

use dwiprep_ingest::IngestError;
use dwiprep_model::Datatype;
use thiserror::Error;

/// Errors raised while resolving a subject's inputs.
#[derive(Debug, Error)]
pub enum QueryError {
    // === Data Absence ===
    /// A mandatory datatype yielded no files.
    #[error("missing mandatory {datatype} data for sub-{subject}{}", session_suffix(.session))]
    MissingMandatoryData {
        subject: String,
        session: Option<String>,
        datatype: Datatype,
    },

    // === Index Errors ===
    /// The dataset index failed.
    #[error(transparent)]
    Index(#[from] IngestError),

    // === Filter File Errors ===
    /// Filter file could not be read.
    #[error("failed to read filter file {path}: {source}")]
    FilterFileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Filter file is not a valid datatype → filter mapping.
    #[error("failed to parse filter file {path}: {source}")]
    FilterFileParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    // === Phase Encoding ===
    /// The header query tool could not be run or failed.
    #[error("phase-encoding lookup failed for {path}: {reason}")]
    DirectionProbe { path: PathBuf, reason: String },
}

impl QueryError {
    /// True when the error reports absent data rather than a broken dataset or tool.
    pub fn is_data_absence(&self) -> bool {
        matches!(self, QueryError::MissingMandatoryData { .. })
    }

    /// True when the error is confined to the session or run being resolved.
    /// Filter file and dataset-level index errors are not.
    pub fn is_unit_local(&self) -> bool {
        match self {
            QueryError::MissingMandatoryData { .. } | QueryError::DirectionProbe { .. } => true,
            QueryError::Index(error) => error.is_file_local(),
            QueryError::FilterFileRead { .. } | QueryError::FilterFileParse { .. } => false,
        }
    }
}

fn session_suffix(session: &Option<String>) -> String {
    session
        .as_ref()
        .map(|session| format!(" ses-{session}"))
        .unwrap_or_default()
}

/// Result type for query operations.
pub type Result<T> = std::result::Result<T, QueryError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_data_display() {
        let err = QueryError::MissingMandatoryData {
            subject: "01".to_string(),
            session: Some("2".to_string()),
            datatype: Datatype::Dwi,
        };
        assert_eq!(err.to_string(), "missing mandatory dwi data for sub-01 ses-2");
        assert!(err.is_data_absence());

        let err = QueryError::MissingMandatoryData {
            subject: "01".to_string(),
            session: None,
            datatype: Datatype::Dwi,
        };
        assert_eq!(err.to_string(), "missing mandatory dwi data for sub-01");
        assert!(err.is_unit_local());
    }

    #[test]
    fn test_unit_local_classification() {
        let lookup = QueryError::DirectionProbe {
            path: PathBuf::from("/bids/sub-01/fmap/sub-01_dir-PA_epi.nii.gz"),
            reason: "mrinfo: No such file or directory".to_string(),
        };
        assert!(lookup.is_unit_local());
        assert!(!lookup.is_data_absence());

        let sidecar = QueryError::Index(IngestError::MetadataNotObject {
            path: PathBuf::from("/bids/sub-01/fmap/sub-01_dir-PA_epi.json"),
        });
        assert!(sidecar.is_unit_local());

        let dataset = QueryError::Index(IngestError::DirectoryNotFound {
            path: PathBuf::from("/bids"),
        });
        assert!(!dataset.is_unit_local());

        let filters = QueryError::FilterFileRead {
            path: PathBuf::from("/filters.json"),
            source: std::io::Error::from(std::io::ErrorKind::NotFound),
        };
        assert!(!filters.is_unit_local());
    }
}
