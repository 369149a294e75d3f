//! Dataset file references and sidecar bundles.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::entity::EntityRecord;

/// A file known to the dataset index together with its parsed entities.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FileRef {
    pub path: PathBuf,
    pub entities: EntityRecord,
}

impl FileRef {
    pub fn new(path: impl Into<PathBuf>, entities: EntityRecord) -> Self {
        Self {
            path: path.into(),
            entities,
        }
    }

    /// Bare filename, without any directory component.
    pub fn file_name(&self) -> Option<&str> {
        self.path.file_name().and_then(|name| name.to_str())
    }
}

/// Classification of a file associated with a primary image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SidecarRole {
    Nifti,
    Json,
    Bval,
    Bvec,
}

impl SidecarRole {
    /// Classify by the full extension (everything after the first `.` of the filename).
    pub fn from_path(path: &Path) -> Option<Self> {
        let name = path.file_name()?.to_str()?;
        let (_, extension) = name.split_once('.')?;
        match extension {
            "nii" | "nii.gz" => Some(SidecarRole::Nifti),
            "json" => Some(SidecarRole::Json),
            "bval" => Some(SidecarRole::Bval),
            "bvec" => Some(SidecarRole::Bvec),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SidecarRole::Nifti => "nifti",
            SidecarRole::Json => "json",
            SidecarRole::Bval => "bval",
            SidecarRole::Bvec => "bvec",
        }
    }
}

/// A primary image with whichever sidecars the index associates with it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileBundle {
    pub nifti: FileRef,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub json: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bval: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bvec: Option<PathBuf>,
}

impl FileBundle {
    pub fn new(nifti: FileRef) -> Self {
        Self {
            nifti,
            json: None,
            bval: None,
            bvec: None,
        }
    }

    /// Attach a sidecar. A second nifti is ignored; the primary stays.
    pub fn attach(&mut self, role: SidecarRole, path: PathBuf) {
        match role {
            SidecarRole::Json => self.json = Some(path),
            SidecarRole::Bval => self.bval = Some(path),
            SidecarRole::Bvec => self.bvec = Some(path),
            SidecarRole::Nifti => {}
        }
    }

    pub fn sidecar(&self, role: SidecarRole) -> Option<&Path> {
        match role {
            SidecarRole::Nifti => Some(self.nifti.path.as_path()),
            SidecarRole::Json => self.json.as_deref(),
            SidecarRole::Bval => self.bval.as_deref(),
            SidecarRole::Bvec => self.bvec.as_deref(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.nifti.path
    }

    pub fn file_name(&self) -> Option<&str> {
        self.nifti.file_name()
    }

    pub fn has_gradients(&self) -> bool {
        self.bval.is_some() && self.bvec.is_some()
    }
}
