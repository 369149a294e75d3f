//! Pipeline configuration.
//!
//! ```toml
//! bids_dir = "/data/bids"
//! output_dir = "/data/out"
//! participant_label = ["01", "sub-02"]
//! phase_encoding = "metadata"
//!
//! [filters.dwi]
//! acquisition = "64dir"
//!
//! [workflow.preproc]
//! rpe_options = "all"
//! ```

use std::path::{Path, PathBuf};

use dwiprep_model::{EntityKey, normalize_label};
use dwiprep_query::DatatypeFilters;
use dwiprep_workflows::WorkflowOptions;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{CoreError, Result};

/// Name of the derivatives folder under the output directory.
pub const DERIVATIVES_DIR: &str = "dwiprep";

/// Where phase-encoding directions are read from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PhaseEncodingLookup {
    /// Sidecar `PhaseEncodingDirection`, falling back to the `dir` entity.
    #[default]
    Metadata,
    /// Image header through `mrinfo`.
    Header,
}

/// Settings of one orchestrator invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PipelineConfig {
    pub bids_dir: PathBuf,
    pub output_dir: PathBuf,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub work_dir: Option<PathBuf>,
    /// Subjects to process; empty means every subject in the dataset.
    #[serde(default)]
    pub participant_label: Vec<String>,
    /// Sessions to process; empty means every session of the subject.
    #[serde(default)]
    pub session_label: Vec<String>,
    /// JSON filter file merged over `filters`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bids_filter_file: Option<PathBuf>,
    #[serde(default)]
    pub filters: DatatypeFilters,
    #[serde(default)]
    pub workflow: WorkflowOptions,
    #[serde(default)]
    pub phase_encoding: PhaseEncodingLookup,
}

impl PipelineConfig {
    pub fn new(bids_dir: impl Into<PathBuf>, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            bids_dir: bids_dir.into(),
            output_dir: output_dir.into(),
            work_dir: None,
            participant_label: Vec::new(),
            session_label: Vec::new(),
            bids_filter_file: None,
            filters: DatatypeFilters::default(),
            workflow: WorkflowOptions::default(),
            phase_encoding: PhaseEncodingLookup::default(),
        }
    }

    /// Load a TOML config file.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|source| CoreError::ConfigRead {
            path: path.to_path_buf(),
            source,
        })?;
        let config: PipelineConfig =
            toml::from_str(&contents).map_err(|source| CoreError::ConfigParse {
                path: path.to_path_buf(),
                source,
            })?;
        info!(path = %path.display(), "loaded config");
        config.normalized()
    }

    /// Strip `sub-`/`ses-` prefixes from the label lists and reject empty labels.
    pub fn normalized(mut self) -> Result<Self> {
        self.participant_label = normalize_all(EntityKey::Subject, &self.participant_label)?;
        self.session_label = normalize_all(EntityKey::Session, &self.session_label)?;
        Ok(self)
    }

    /// `<output_dir>/dwiprep`
    pub fn derivatives_root(&self) -> PathBuf {
        self.output_dir.join(DERIVATIVES_DIR)
    }

    /// The configured work directory, or `<output_dir>/work`.
    pub fn work_dir(&self) -> PathBuf {
        self.work_dir
            .clone()
            .unwrap_or_else(|| self.output_dir.join("work"))
    }

    /// Config filters with the filter file merged over them.
    pub fn resolved_filters(&self) -> Result<DatatypeFilters> {
        match &self.bids_filter_file {
            Some(path) => {
                let overrides = DatatypeFilters::load(path)?;
                debug!(path = %path.display(), "merged filter file");
                Ok(self.filters.merged(&overrides))
            }
            None => Ok(self.filters.clone()),
        }
    }
}

fn normalize_all(key: EntityKey, labels: &[String]) -> Result<Vec<String>> {
    let mut normalized = Vec::with_capacity(labels.len());
    for label in labels {
        let label = normalize_label(key, label)?;
        if !normalized.contains(&label) {
            normalized.push(label);
        }
    }
    Ok(normalized)
}

#[cfg(test)]
mod tests {
    use super::*;
    use dwiprep_model::{Datatype, FilterValue};

    #[test]
    fn test_defaults() {
        let config = PipelineConfig::new("/bids", "/out");
        assert_eq!(config.derivatives_root(), PathBuf::from("/out/dwiprep"));
        assert_eq!(config.work_dir(), PathBuf::from("/out/work"));
        assert_eq!(config.phase_encoding, PhaseEncodingLookup::Metadata);
    }

    #[test]
    fn test_parse_toml() {
        let config: PipelineConfig = toml::from_str(
            r#"
            bids_dir = "/bids"
            output_dir = "/out"
            work_dir = "/scratch"
            participant_label = ["sub-01", "02", "01"]
            phase_encoding = "header"

            [filters.dwi]
            acquisition = "64dir"

            [workflow.preproc]
            rpe_options = "all"
            "#,
        )
        .unwrap();
        let config = config.normalized().unwrap();

        assert_eq!(config.participant_label, ["01", "02"]);
        assert_eq!(config.work_dir(), PathBuf::from("/scratch"));
        assert_eq!(config.phase_encoding, PhaseEncodingLookup::Header);
        assert_eq!(
            config.filters.get(Datatype::Dwi).and_then(|f| f.get(EntityKey::Acquisition)),
            Some(&FilterValue::One("64dir".to_string()))
        );
        assert_eq!(config.workflow.preproc["rpe_options"], "all");
        assert_eq!(config.workflow.preproc["align_seepi"], true);
    }

    #[test]
    fn test_rejects_unknown_keys() {
        let result: std::result::Result<PipelineConfig, _> =
            toml::from_str("bids_dir = \"/b\"\noutput_dir = \"/o\"\nthreads = 4\n");
        assert!(result.is_err());
    }
}
