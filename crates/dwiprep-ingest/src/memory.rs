//! In-memory dataset index.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use dwiprep_model::{EntityFilter, FileRef};

use crate::error::Result;
use crate::index::{
    DatasetIndex, Metadata, associated_files, filter_files, json_sidecar, metadata_from_value,
};
use crate::parse::parse_entities;

/// A dataset index assembled from relative paths and metadata values.
///
/// Useful for planning against a dataset listing without touching the disk.
/// Metadata registered for an image or for its `.json` sidecar is returned
/// for the image.
#[derive(Debug, Clone, Default)]
pub struct InMemoryIndex {
    root: PathBuf,
    files: Vec<FileRef>,
    metadata: BTreeMap<PathBuf, Metadata>,
}

impl InMemoryIndex {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            ..Self::default()
        }
    }

    /// Register a file given relative to the root.
    pub fn add_file(&mut self, relative: impl AsRef<Path>) -> Result<()> {
        let path = self.root.join(relative);
        let entities = parse_entities(&path)?;
        if let Err(position) = self.files.binary_search_by(|file| file.path.cmp(&path)) {
            self.files.insert(position, FileRef::new(path, entities));
        }
        Ok(())
    }

    pub fn with_file(mut self, relative: impl AsRef<Path>) -> Result<Self> {
        self.add_file(relative)?;
        Ok(self)
    }

    /// Register metadata for a file given relative to the root.
    pub fn set_metadata(&mut self, relative: impl AsRef<Path>, value: serde_json::Value) -> Result<()> {
        let path = self.root.join(relative);
        let metadata = metadata_from_value(&path, value)?;
        self.metadata.insert(path, metadata);
        Ok(())
    }

    pub fn with_metadata(mut self, relative: impl AsRef<Path>, value: serde_json::Value) -> Result<Self> {
        self.set_metadata(relative, value)?;
        Ok(self)
    }

    pub fn files(&self) -> &[FileRef] {
        &self.files
    }
}

impl DatasetIndex for InMemoryIndex {
    fn root(&self) -> &Path {
        &self.root
    }

    fn query(&self, filter: &EntityFilter) -> Result<Vec<FileRef>> {
        Ok(filter_files(&self.files, filter))
    }

    fn associated(&self, file: &FileRef) -> Result<Vec<FileRef>> {
        Ok(associated_files(&self.files, file))
    }

    fn metadata(&self, file: &FileRef) -> Result<Metadata> {
        if let Some(metadata) = self.metadata.get(&file.path) {
            return Ok(metadata.clone());
        }
        Ok(json_sidecar(&self.files, file)
            .and_then(|path| self.metadata.get(&path).cloned())
            .unwrap_or_default())
    }
}
