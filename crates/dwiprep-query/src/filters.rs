//! Per-datatype entity filters.

use std::collections::BTreeMap;
use std::path::Path;

use dwiprep_model::{Datatype, EntityFilter, EntityKey, IMAGE_EXTENSIONS};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{QueryError, Result};

/// User filters keyed by datatype, merged over each datatype's defaults.
///
/// Deserializes from a filter file such as
/// `{"dwi": {"acquisition": "64dir"}, "t1w": {"run": "1"}}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DatatypeFilters(BTreeMap<Datatype, EntityFilter>);

impl DatatypeFilters {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with(mut self, datatype: Datatype, filter: EntityFilter) -> Self {
        self.0.insert(datatype, filter);
        self
    }

    pub fn get(&self, datatype: Datatype) -> Option<&EntityFilter> {
        self.0.get(&datatype)
    }

    /// Merge `overrides` per datatype and per key.
    #[must_use]
    pub fn merged(&self, overrides: &DatatypeFilters) -> DatatypeFilters {
        let mut merged = self.clone();
        for (datatype, filter) in &overrides.0 {
            let combined = match merged.0.get(datatype) {
                Some(existing) => existing.merged(filter),
                None => filter.clone(),
            };
            merged.0.insert(*datatype, combined);
        }
        merged
    }

    /// Load a JSON filter file.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|source| QueryError::FilterFileRead {
            path: path.to_path_buf(),
            source,
        })?;
        let filters: DatatypeFilters =
            serde_json::from_str(&text).map_err(|source| QueryError::FilterFileParse {
                path: path.to_path_buf(),
                source,
            })?;
        debug!(path = %path.display(), datatypes = filters.0.len(), "loaded filter file");
        Ok(filters)
    }

    /// The full query for one datatype of one subject (and session).
    pub fn query_for(&self, datatype: Datatype, subject: &str, session: Option<&str>) -> EntityFilter {
        let mut base = EntityFilter::new()
            .with(EntityKey::Subject, subject)
            .with(EntityKey::Extension, &IMAGE_EXTENSIONS[..]);
        if let Some(session) = session {
            base.insert(EntityKey::Session, session);
        }
        let typed = match self.get(datatype) {
            Some(user) => datatype.default_filter().merged(user),
            None => datatype.default_filter(),
        };
        base.merged(&typed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dwiprep_model::EntityRecord;

    #[test]
    fn test_query_for_merges_defaults_and_base() {
        let filters = DatatypeFilters::new().with(
            Datatype::Dwi,
            EntityFilter::new().with(EntityKey::Acquisition, "64dir"),
        );
        let query = filters.query_for(Datatype::Dwi, "01", Some("1"));
        let record = EntityRecord::from([
            (EntityKey::Subject, "01"),
            (EntityKey::Session, "1"),
            (EntityKey::Datatype, "dwi"),
            (EntityKey::Acquisition, "64dir"),
            (EntityKey::Suffix, "dwi"),
            (EntityKey::Extension, "nii.gz"),
        ]);
        assert!(query.accepts(&record));
        assert!(!query.accepts(&record.clone().with(EntityKey::Extension, "json")));
        assert!(!query.accepts(&record.without(&[EntityKey::Acquisition])));
    }

    #[test]
    fn test_merged_is_per_key() {
        let base = DatatypeFilters::new().with(
            Datatype::T1w,
            EntityFilter::new().with(EntityKey::Run, "1"),
        );
        let overrides = DatatypeFilters::new().with(
            Datatype::T1w,
            EntityFilter::new().with(EntityKey::Acquisition, "mprage"),
        );
        let merged = base.merged(&overrides);
        let filter = merged.get(Datatype::T1w).unwrap();
        assert!(filter.get(EntityKey::Run).is_some());
        assert!(filter.get(EntityKey::Acquisition).is_some());
    }
}
