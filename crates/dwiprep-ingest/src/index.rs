//! The dataset index interface consumed by the query layer.

use std::collections::BTreeSet;
use std::path::Path;

use dwiprep_model::{EntityFilter, EntityKey, EntityRecord, FileRef, SidecarRole};

use crate::error::{IngestError, Result};
use crate::parse::{parse_entities, shares_stem};

/// Sidecar metadata of one file.
pub type Metadata = serde_json::Map<String, serde_json::Value>;

/// Queryable view of an imaging dataset.
///
/// Implementations own the file references they return; callers treat them
/// as read-only handles. `query` results need not be in any order.
pub trait DatasetIndex {
    /// Dataset root directory.
    fn root(&self) -> &Path;

    /// All files whose entities satisfy `filter`.
    fn query(&self, filter: &EntityFilter) -> Result<Vec<FileRef>>;

    /// Files sharing `file`'s prefix and differing only in extension.
    fn associated(&self, file: &FileRef) -> Result<Vec<FileRef>>;

    /// Sidecar metadata of `file`. Empty when no sidecar exists.
    fn metadata(&self, file: &FileRef) -> Result<Metadata>;

    /// Entities encoded in `path`.
    fn parse_entities(&self, path: &Path) -> Result<EntityRecord> {
        parse_entities(path)
    }

    /// Subject labels present in the dataset, sorted.
    fn subjects(&self) -> Result<Vec<String>> {
        let labels: BTreeSet<String> = self
            .query(&EntityFilter::new())?
            .iter()
            .filter_map(|file| file.entities.subject().map(str::to_string))
            .collect();
        Ok(labels.into_iter().collect())
    }

    /// Session labels of `subject`, sorted. Empty for session-less subjects.
    fn sessions(&self, subject: &str) -> Result<Vec<String>> {
        let filter = EntityFilter::new().with(EntityKey::Subject, subject);
        let labels: BTreeSet<String> = self
            .query(&filter)?
            .iter()
            .filter_map(|file| file.entities.session().map(str::to_string))
            .collect();
        Ok(labels.into_iter().collect())
    }
}

pub(crate) fn filter_files(files: &[FileRef], filter: &EntityFilter) -> Vec<FileRef> {
    files
        .iter()
        .filter(|file| filter.accepts(&file.entities))
        .cloned()
        .collect()
}

pub(crate) fn associated_files(files: &[FileRef], file: &FileRef) -> Vec<FileRef> {
    files
        .iter()
        .filter(|candidate| candidate.path != file.path && shares_stem(&candidate.path, &file.path))
        .cloned()
        .collect()
}

pub(crate) fn json_sidecar(files: &[FileRef], file: &FileRef) -> Option<std::path::PathBuf> {
    if SidecarRole::from_path(&file.path) == Some(SidecarRole::Json) {
        return Some(file.path.clone());
    }
    associated_files(files, file)
        .into_iter()
        .find(|candidate| SidecarRole::from_path(&candidate.path) == Some(SidecarRole::Json))
        .map(|candidate| candidate.path)
}

pub(crate) fn metadata_from_value(path: &Path, value: serde_json::Value) -> Result<Metadata> {
    match value {
        serde_json::Value::Object(map) => Ok(map),
        _ => Err(IngestError::MetadataNotObject {
            path: path.to_path_buf(),
        }),
    }
}
