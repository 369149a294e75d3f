//! Rendering derivative paths and preparing their directories.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use dwiprep_model::EntityRecord;
use serde::Serialize;
use tracing::debug;

use crate::error::{PathBuildError, Result};
use crate::pattern::PathPattern;

/// Render a relative path from base entities with overrides applied.
///
/// Pure: no filesystem access.
pub fn build_path(
    base: &EntityRecord,
    overrides: &EntityRecord,
    pattern: &PathPattern,
) -> Result<PathBuf> {
    pattern.render(&base.merged(overrides)).map(PathBuf::from)
}

/// Create the parent directory of `path`. An existing directory is not an error.
pub fn ensure_parent_dir(path: &Path) -> Result<()> {
    let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) else {
        return Ok(());
    };
    match std::fs::create_dir_all(parent) {
        Ok(()) => Ok(()),
        Err(error) if error.kind() == ErrorKind::AlreadyExists && parent.is_dir() => Ok(()),
        Err(source) => Err(PathBuildError::CreateDir {
            path: parent.to_path_buf(),
            source,
        }),
    }
}

/// Where a derivative is written, handed to the derivatives sink.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DerivativeTarget {
    /// Path relative to the output root.
    pub relative: PathBuf,
    /// `relative` joined onto the output root.
    pub absolute: PathBuf,
    /// Entities the path was rendered from.
    pub entities: EntityRecord,
}

/// Builds derivative targets under an output root.
#[derive(Debug, Clone)]
pub struct PathBuilder {
    root: PathBuf,
    create_dirs: bool,
}

impl PathBuilder {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            create_dirs: true,
        }
    }

    /// Disable parent-directory creation (planning without side effects).
    #[must_use]
    pub fn with_create_dirs(mut self, enable: bool) -> Self {
        self.create_dirs = enable;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Render a target and, unless disabled, create its parent directory.
    pub fn build(
        &self,
        base: &EntityRecord,
        overrides: &EntityRecord,
        pattern: &PathPattern,
    ) -> Result<DerivativeTarget> {
        let entities = base.merged(overrides);
        let relative = PathBuf::from(pattern.render(&entities)?);
        let absolute = self.root.join(&relative);
        if self.create_dirs {
            ensure_parent_dir(&absolute)?;
        }
        debug!(path = %relative.display(), "built derivative path");
        Ok(DerivativeTarget {
            relative,
            absolute,
            entities,
        })
    }
}
