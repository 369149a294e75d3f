//! Per-run and per-session groupings of resolved inputs.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::datatype::Datatype;
use crate::files::FileBundle;

/// One diffusion acquisition and the fieldmaps intended for it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunBundle {
    pub dwi: FileBundle,
    /// Candidate fieldmaps, sorted by path. Pairing decides which are used.
    #[serde(default)]
    pub fieldmaps: Vec<FileBundle>,
}

impl RunBundle {
    pub fn new(dwi: FileBundle) -> Self {
        Self {
            dwi,
            fieldmaps: Vec::new(),
        }
    }

    pub fn file_name(&self) -> Option<&str> {
        self.dwi.file_name()
    }
}

/// Partition key: a session label, or the synthetic key of a session-less dataset.
///
/// Serialized as `ses-<label>` or `single-session`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum SessionKey {
    Session(String),
    Sessionless,
}

impl SessionKey {
    pub fn from_label(label: Option<&str>) -> Self {
        match label {
            Some(label) => SessionKey::Session(label.to_string()),
            None => SessionKey::Sessionless,
        }
    }

    pub fn label(&self) -> Option<&str> {
        match self {
            SessionKey::Session(label) => Some(label),
            SessionKey::Sessionless => None,
        }
    }
}

impl fmt::Display for SessionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionKey::Session(label) => write!(f, "ses-{label}"),
            SessionKey::Sessionless => f.write_str("single-session"),
        }
    }
}

impl Serialize for SessionKey {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for SessionKey {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        if s == "single-session" {
            return Ok(SessionKey::Sessionless);
        }
        match s.strip_prefix("ses-") {
            Some(label) if !label.is_empty() => Ok(SessionKey::Session(label.to_string())),
            _ => Err(serde::de::Error::custom(format!("invalid session key: {s}"))),
        }
    }
}

/// Inputs resolved for one session.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionData {
    pub runs: Vec<RunBundle>,
    pub fieldmaps: Vec<FileBundle>,
    pub t1w: Vec<FileBundle>,
    pub t2w: Vec<FileBundle>,
}

impl SessionData {
    /// The DWI bundles of every run, in run order.
    pub fn dwi_bundles(&self) -> Vec<FileBundle> {
        self.runs.iter().map(|run| run.dwi.clone()).collect()
    }
}

/// A non-fatal note about recommended data that was not found.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Advisory {
    pub subject: String,
    pub session: Option<String>,
    pub datatype: Datatype,
    pub message: String,
}

impl fmt::Display for Advisory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sub-{}", self.subject)?;
        if let Some(session) = &self.session {
            write!(f, " ses-{session}")?;
        }
        write!(f, " [{}]: {}", self.datatype, self.message)
    }
}

/// Everything resolved for one subject, keyed by session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionPartition {
    pub subject: String,
    pub sessions: BTreeMap<SessionKey, SessionData>,
    #[serde(default)]
    pub advisories: Vec<Advisory>,
}

impl SessionPartition {
    pub fn new(subject: impl Into<String>) -> Self {
        Self {
            subject: subject.into(),
            sessions: BTreeMap::new(),
            advisories: Vec::new(),
        }
    }

    pub fn run_count(&self) -> usize {
        self.sessions.values().map(|data| data.runs.len()).sum()
    }

    pub fn has_fieldmaps(&self) -> bool {
        self.sessions.values().any(|data| !data.fieldmaps.is_empty())
    }
}
