//! BIDS entities, entity records and entity filters.
//!
//! An [`EntityRecord`] classifies one file (`sub-01_ses-1_dir-AP_dwi.nii.gz`
//! carries subject, session, direction, suffix and extension). An
//! [`EntityFilter`] is the query side of the same vocabulary: every key it
//! names must be present on a record and match one of the accepted values.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{ModelError, Result};

/// The closed set of entity keys understood by the planner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum EntityKey {
    Subject,
    Session,
    Datatype,
    Acquisition,
    Direction,
    Run,
    Space,
    Description,
    From,
    To,
    Suffix,
    Extension,
}

impl EntityKey {
    /// Every key, in canonical order.
    pub const ALL: [EntityKey; 12] = [
        EntityKey::Subject,
        EntityKey::Session,
        EntityKey::Datatype,
        EntityKey::Acquisition,
        EntityKey::Direction,
        EntityKey::Run,
        EntityKey::Space,
        EntityKey::Description,
        EntityKey::From,
        EntityKey::To,
        EntityKey::Suffix,
        EntityKey::Extension,
    ];

    /// Long name used in filters, patterns and serialized records.
    pub fn as_str(self) -> &'static str {
        match self {
            EntityKey::Subject => "subject",
            EntityKey::Session => "session",
            EntityKey::Datatype => "datatype",
            EntityKey::Acquisition => "acquisition",
            EntityKey::Direction => "direction",
            EntityKey::Run => "run",
            EntityKey::Space => "space",
            EntityKey::Description => "description",
            EntityKey::From => "from",
            EntityKey::To => "to",
            EntityKey::Suffix => "suffix",
            EntityKey::Extension => "extension",
        }
    }

    /// Key as it appears in a filename (`sub` in `sub-01`).
    ///
    /// Datatype, suffix and extension are positional and have no label.
    pub fn filename_label(self) -> Option<&'static str> {
        match self {
            EntityKey::Subject => Some("sub"),
            EntityKey::Session => Some("ses"),
            EntityKey::Acquisition => Some("acq"),
            EntityKey::Direction => Some("dir"),
            EntityKey::Run => Some("run"),
            EntityKey::Space => Some("space"),
            EntityKey::Description => Some("desc"),
            EntityKey::From => Some("from"),
            EntityKey::To => Some("to"),
            EntityKey::Datatype | EntityKey::Suffix | EntityKey::Extension => None,
        }
    }

    /// Inverse of [`EntityKey::filename_label`].
    pub fn from_filename_label(label: &str) -> Option<Self> {
        EntityKey::ALL
            .into_iter()
            .find(|key| key.filename_label() == Some(label))
    }
}

impl fmt::Display for EntityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EntityKey {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self> {
        let normalized = s.trim().to_ascii_lowercase();
        if let Some(key) = EntityKey::from_filename_label(&normalized) {
            return Ok(key);
        }
        EntityKey::ALL
            .into_iter()
            .find(|key| key.as_str() == normalized)
            .ok_or_else(|| ModelError::UnknownEntity(s.to_string()))
    }
}

impl Serialize for EntityKey {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for EntityKey {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Normalize a user-supplied entity value.
///
/// Strips a redundant `sub-`/`ses-` prefix and a leading `.` on extensions.
pub fn normalize_label(key: EntityKey, value: &str) -> Result<String> {
    let trimmed = value.trim();
    let stripped = match key {
        EntityKey::Subject => trimmed.strip_prefix("sub-").unwrap_or(trimmed),
        EntityKey::Session => trimmed.strip_prefix("ses-").unwrap_or(trimmed),
        EntityKey::Extension => trimmed.trim_start_matches('.'),
        _ => trimmed,
    };
    if stripped.is_empty() || stripped.contains(['/', '\\']) {
        return Err(ModelError::InvalidLabel {
            key: key.as_str().to_string(),
            value: value.to_string(),
        });
    }
    Ok(stripped.to_string())
}

/// Entities describing one file. Absent keys are unconstrained.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityRecord(BTreeMap<EntityKey, String>);

impl EntityRecord {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: EntityKey) -> Option<&str> {
        self.0.get(&key).map(String::as_str)
    }

    pub fn insert(&mut self, key: EntityKey, value: impl Into<String>) -> Option<String> {
        self.0.insert(key, value.into())
    }

    /// Builder form of [`EntityRecord::insert`].
    #[must_use]
    pub fn with(mut self, key: EntityKey, value: impl Into<String>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn remove(&mut self, key: EntityKey) -> Option<String> {
        self.0.remove(&key)
    }

    pub fn contains(&self, key: EntityKey) -> bool {
        self.0.contains_key(&key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (EntityKey, &str)> {
        self.0.iter().map(|(key, value)| (*key, value.as_str()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn subject(&self) -> Option<&str> {
        self.get(EntityKey::Subject)
    }

    pub fn session(&self) -> Option<&str> {
        self.get(EntityKey::Session)
    }

    pub fn suffix(&self) -> Option<&str> {
        self.get(EntityKey::Suffix)
    }

    pub fn extension(&self) -> Option<&str> {
        self.get(EntityKey::Extension)
    }

    /// Returns a copy where every key in `overrides` replaces the local value.
    #[must_use]
    pub fn merged(&self, overrides: &EntityRecord) -> EntityRecord {
        let mut merged = self.clone();
        for (key, value) in &overrides.0 {
            merged.0.insert(*key, value.clone());
        }
        merged
    }

    /// Returns a copy with the given keys removed.
    #[must_use]
    pub fn without(&self, keys: &[EntityKey]) -> EntityRecord {
        let mut out = self.clone();
        for key in keys {
            out.0.remove(key);
        }
        out
    }
}

impl FromIterator<(EntityKey, String)> for EntityRecord {
    fn from_iter<T: IntoIterator<Item = (EntityKey, String)>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl<const N: usize> From<[(EntityKey, &str); N]> for EntityRecord {
    fn from(pairs: [(EntityKey, &str); N]) -> Self {
        pairs
            .into_iter()
            .map(|(key, value)| (key, value.to_string()))
            .collect()
    }
}

/// Accepted value(s) for one filter key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FilterValue {
    One(String),
    AnyOf(Vec<String>),
}

impl FilterValue {
    pub fn matches(&self, value: &str) -> bool {
        match self {
            FilterValue::One(expected) => expected == value,
            FilterValue::AnyOf(options) => options.iter().any(|option| option == value),
        }
    }

    fn map(&self, f: impl Fn(&str) -> String) -> FilterValue {
        match self {
            FilterValue::One(value) => FilterValue::One(f(value)),
            FilterValue::AnyOf(values) => {
                FilterValue::AnyOf(values.iter().map(|value| f(value)).collect())
            }
        }
    }
}

impl From<&str> for FilterValue {
    fn from(value: &str) -> Self {
        FilterValue::One(value.to_string())
    }
}

impl From<String> for FilterValue {
    fn from(value: String) -> Self {
        FilterValue::One(value)
    }
}

impl From<&[&str]> for FilterValue {
    fn from(values: &[&str]) -> Self {
        FilterValue::AnyOf(values.iter().map(|value| (*value).to_string()).collect())
    }
}

/// Entity constraints used to query a dataset index.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityFilter(BTreeMap<EntityKey, FilterValue>);

impl EntityFilter {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with(mut self, key: EntityKey, value: impl Into<FilterValue>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn insert(&mut self, key: EntityKey, value: impl Into<FilterValue>) {
        let value = value.into();
        let value = if key == EntityKey::Extension {
            value.map(|ext| ext.trim_start_matches('.').to_string())
        } else {
            value
        };
        self.0.insert(key, value);
    }

    pub fn get(&self, key: EntityKey) -> Option<&FilterValue> {
        self.0.get(&key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (EntityKey, &FilterValue)> {
        self.0.iter().map(|(key, value)| (*key, value))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns a copy where every key of `overrides` replaces the local constraint.
    #[must_use]
    pub fn merged(&self, overrides: &EntityFilter) -> EntityFilter {
        let mut merged = self.clone();
        for (key, value) in &overrides.0 {
            merged.insert(*key, value.clone());
        }
        merged
    }

    /// True when every constrained key is present on `record` with an accepted value.
    pub fn accepts(&self, record: &EntityRecord) -> bool {
        self.0.iter().all(|(key, expected)| match record.get(*key) {
            Some(value) if *key == EntityKey::Extension => expected
                .map(|ext| ext.trim_start_matches('.').to_string())
                .matches(value.trim_start_matches('.')),
            Some(value) => expected.matches(value),
            None => false,
        })
    }
}
