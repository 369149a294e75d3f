//! Filesystem-backed dataset index.

use std::path::{Path, PathBuf};

use dwiprep_model::{EntityFilter, FileRef};
use tracing::{debug, info};

use crate::error::{IngestError, Result};
use crate::index::{
    DatasetIndex, Metadata, associated_files, filter_files, json_sidecar, metadata_from_value,
};
use crate::parse::parse_entities;

/// A BIDS dataset crawled from disk.
///
/// Only `sub-*` trees are indexed. Hidden entries are ignored and files whose
/// names do not parse are skipped. This is not a validator.
#[derive(Debug, Clone)]
pub struct DatasetLayout {
    root: PathBuf,
    files: Vec<FileRef>,
}

impl DatasetLayout {
    /// Crawl `root` and index every parseable file.
    pub fn load(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        if !root.is_dir() {
            return Err(IngestError::DirectoryNotFound { path: root });
        }

        let mut paths = Vec::new();
        for entry in read_dir_sorted(&root)? {
            let is_subject = entry
                .file_name()
                .and_then(|name| name.to_str())
                .is_some_and(|name| name.starts_with("sub-"));
            if is_subject && entry.is_dir() {
                collect_files(&entry, &mut paths)?;
            }
        }

        let mut files = Vec::with_capacity(paths.len());
        let mut skipped = 0usize;
        for path in paths {
            match parse_entities(&path) {
                Ok(entities) => files.push(FileRef::new(path, entities)),
                Err(error) => {
                    skipped += 1;
                    debug!(%error, "skipping file");
                }
            }
        }
        files.sort_by(|a, b| a.path.cmp(&b.path));

        info!(
            root = %root.display(),
            files = files.len(),
            skipped,
            "indexed dataset"
        );
        Ok(Self { root, files })
    }

    pub fn files(&self) -> &[FileRef] {
        &self.files
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

impl DatasetIndex for DatasetLayout {
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
        let Some(path) = json_sidecar(&self.files, file) else {
            return Ok(Metadata::new());
        };
        let text = std::fs::read_to_string(&path).map_err(|source| IngestError::FileRead {
            path: path.clone(),
            source,
        })?;
        let value: serde_json::Value =
            serde_json::from_str(&text).map_err(|source| IngestError::MetadataParse {
                path: path.clone(),
                source,
            })?;
        metadata_from_value(&path, value)
    }
}

fn collect_files(dir: &Path, out: &mut Vec<PathBuf>) -> Result<()> {
    for path in read_dir_sorted(dir)? {
        if path.is_dir() {
            collect_files(&path, out)?;
        } else if path.is_file() {
            out.push(path);
        }
    }
    Ok(())
}

fn read_dir_sorted(dir: &Path) -> Result<Vec<PathBuf>> {
    let entries = std::fs::read_dir(dir).map_err(|e| IngestError::DirectoryRead {
        path: dir.to_path_buf(),
        source: e,
    })?;

    let mut paths = Vec::new();
    for entry_result in entries {
        let entry = entry_result.map_err(|e| IngestError::DirectoryRead {
            path: dir.to_path_buf(),
            source: e,
        })?;
        let hidden = entry.file_name().to_str().is_some_and(|name| name.starts_with('.'));
        if !hidden {
            paths.push(entry.path());
        }
    }
    paths.sort();
    Ok(paths)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn touch(root: &Path, relative: &str) {
        let path = root.join(relative);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, "").unwrap();
    }

    #[test]
    fn test_load_missing_root() {
        let result = DatasetLayout::load("/nonexistent/bids/root");
        assert!(matches!(result, Err(IngestError::DirectoryNotFound { .. })));
    }

    #[test]
    fn test_load_skips_non_subject_trees() {
        let temp = TempDir::new().unwrap();
        touch(temp.path(), "dataset_description.json");
        touch(temp.path(), "derivatives/sub-01/dwi/sub-01_dwi.nii.gz");
        touch(temp.path(), "sub-01/dwi/sub-01_dwi.nii.gz");
        touch(temp.path(), "sub-01/dwi/.sub-01_dwi.nii.gz.swp");

        let layout = DatasetLayout::load(temp.path()).unwrap();
        assert_eq!(layout.len(), 1);
        assert!(layout.files()[0].path.ends_with("sub-01/dwi/sub-01_dwi.nii.gz"));
    }
}
