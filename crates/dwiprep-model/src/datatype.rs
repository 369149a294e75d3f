//! Datatypes queried per subject and their data requirements.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::entity::{EntityFilter, EntityKey};
use crate::error::ModelError;

/// Image extensions accepted for primary files.
pub const IMAGE_EXTENSIONS: [&str; 2] = ["nii", "nii.gz"];

/// Category of input queried for a subject.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Datatype {
    Dwi,
    Fmap,
    T1w,
    T2w,
}

/// Whether a datatype must be present for processing to proceed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Requirement {
    /// Absence aborts the unit being processed.
    Mandatory,
    /// Absence is reported and processing continues in a degraded mode.
    Recommended,
    /// Absence is unremarkable.
    Optional,
}

impl Datatype {
    pub const ALL: [Datatype; 4] = [Datatype::Dwi, Datatype::Fmap, Datatype::T1w, Datatype::T2w];

    pub fn as_str(self) -> &'static str {
        match self {
            Datatype::Dwi => "dwi",
            Datatype::Fmap => "fmap",
            Datatype::T1w => "t1w",
            Datatype::T2w => "t2w",
        }
    }

    /// Built-in query for this datatype; user filters are merged over it.
    pub fn default_filter(self) -> EntityFilter {
        match self {
            Datatype::Dwi => EntityFilter::new()
                .with(EntityKey::Datatype, "dwi")
                .with(EntityKey::Suffix, "dwi"),
            Datatype::Fmap => EntityFilter::new().with(EntityKey::Datatype, "fmap"),
            Datatype::T1w => EntityFilter::new()
                .with(EntityKey::Datatype, "anat")
                .with(EntityKey::Suffix, "T1w"),
            Datatype::T2w => EntityFilter::new()
                .with(EntityKey::Datatype, "anat")
                .with(EntityKey::Suffix, "T2w"),
        }
    }

    pub fn requirement(self) -> Requirement {
        match self {
            Datatype::Dwi => Requirement::Mandatory,
            Datatype::Fmap => Requirement::Recommended,
            Datatype::T1w | Datatype::T2w => Requirement::Optional,
        }
    }
}

impl fmt::Display for Datatype {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Datatype {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase();
        Datatype::ALL
            .into_iter()
            .find(|datatype| datatype.as_str() == normalized)
            .ok_or_else(|| ModelError::UnknownDatatype(s.to_string()))
    }
}
