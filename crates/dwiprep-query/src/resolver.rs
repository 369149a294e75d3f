//! Resolution of a subject's inputs into sessions and runs.
//!
//! For each datatype the resolver issues one index query (the datatype's
//! defaults, the user's filter and the subject/session/extension base),
//! bundles every image with its sidecars and groups the result by session.
//! Fieldmaps are attached to the diffusion runs named in their
//! `IntendedFor` metadata.

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use dwiprep_ingest::DatasetIndex;
use dwiprep_model::{
    Advisory, Datatype, EntityFilter, FileBundle, FileRef, Resolution, RunBundle, SessionData,
    SessionKey, SessionPartition, SidecarRole,
};
use tracing::{debug, debug_span, trace, warn};

use crate::error::{QueryError, Result};
use crate::filters::DatatypeFilters;

/// Metadata key listing the images a fieldmap corrects.
pub const INTENDED_FOR: &str = "IntendedFor";

/// Structural images of one subject, across all sessions.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AnatomicalInputs {
    pub t1w: Vec<FileBundle>,
    pub t2w: Vec<FileBundle>,
}

impl AnatomicalInputs {
    pub fn has_t1w(&self) -> bool {
        !self.t1w.is_empty()
    }
}

/// Resolves subject inputs against a dataset index.
pub struct QueryResolver<'a, I: DatasetIndex + ?Sized> {
    index: &'a I,
}

impl<'a, I: DatasetIndex + ?Sized> QueryResolver<'a, I> {
    pub fn new(index: &'a I) -> Self {
        Self { index }
    }

    /// Resolve all datatypes for `subject` (restricted to `session` when given).
    ///
    /// Fails with [`QueryError::MissingMandatoryData`] when no diffusion image
    /// matches. Missing fieldmaps are recorded as advisories.
    pub fn resolve(
        &self,
        subject: &str,
        session: Option<&str>,
        filters: &DatatypeFilters,
    ) -> Result<SessionPartition> {
        let span = debug_span!("resolve", subject, session = session.unwrap_or("-"));
        let _guard = span.enter();

        let mut partition = SessionPartition::new(subject);
        let mut resolved: BTreeMap<Datatype, Vec<FileBundle>> = BTreeMap::new();
        for datatype in Datatype::ALL {
            let files = self.sorted_query(&filters.query_for(datatype, subject, session))?;
            debug!(datatype = %datatype, count = files.len(), "queried datatype");
            match Resolution::classify(datatype, files) {
                Resolution::Found(files) => {
                    let bundles = files
                        .into_iter()
                        .map(|file| self.bundle(file))
                        .collect::<Result<Vec<_>>>()?;
                    resolved.insert(datatype, bundles);
                }
                Resolution::AdvisoryMissing { datatype } => {
                    let advisory = Advisory {
                        subject: subject.to_string(),
                        session: session.map(str::to_string),
                        datatype,
                        message: "no files found; distortion correction is disabled".to_string(),
                    };
                    warn!(datatype = %datatype, "{advisory}");
                    partition.advisories.push(advisory);
                }
                Resolution::FatalMissing { datatype } => {
                    return Err(QueryError::MissingMandatoryData {
                        subject: subject.to_string(),
                        session: session.map(str::to_string),
                        datatype,
                    });
                }
            }
        }

        for bundle in resolved.remove(&Datatype::Dwi).unwrap_or_default() {
            session_entry(&mut partition, &bundle.nifti)
                .runs
                .push(RunBundle::new(bundle));
        }
        for bundle in resolved.remove(&Datatype::T1w).unwrap_or_default() {
            session_entry(&mut partition, &bundle.nifti).t1w.push(bundle);
        }
        for bundle in resolved.remove(&Datatype::T2w).unwrap_or_default() {
            session_entry(&mut partition, &bundle.nifti).t2w.push(bundle);
        }
        for fieldmap in resolved.remove(&Datatype::Fmap).unwrap_or_default() {
            self.attach_fieldmap(&mut partition, &fieldmap)?;
            session_entry(&mut partition, &fieldmap.nifti)
                .fieldmaps
                .push(fieldmap);
        }

        debug!(
            sessions = partition.sessions.len(),
            runs = partition.run_count(),
            advisories = partition.advisories.len(),
            "resolved subject"
        );
        Ok(partition)
    }

    /// Structural images of `subject` regardless of session.
    pub fn anatomical(&self, subject: &str, filters: &DatatypeFilters) -> Result<AnatomicalInputs> {
        let mut inputs = AnatomicalInputs::default();
        for (datatype, target) in [(Datatype::T1w, &mut inputs.t1w), (Datatype::T2w, &mut inputs.t2w)] {
            for file in self.sorted_query(&filters.query_for(datatype, subject, None))? {
                target.push(self.bundle(file)?);
            }
        }
        Ok(inputs)
    }

    /// Query results in lexicographic path order, whatever order the index uses.
    fn sorted_query(&self, filter: &EntityFilter) -> Result<Vec<FileRef>> {
        let mut files = self.index.query(filter)?;
        files.sort_by(|a, b| a.path.cmp(&b.path));
        Ok(files)
    }

    /// Attach the index's sidecars to a primary image.
    pub fn bundle(&self, file: FileRef) -> Result<FileBundle> {
        let associated = self.index.associated(&file)?;
        let mut bundle = FileBundle::new(file);
        for sidecar in associated {
            match SidecarRole::from_path(&sidecar.path) {
                Some(role) => bundle.attach(role, sidecar.path),
                None => trace!(path = %sidecar.path.display(), "ignoring unclassified sidecar"),
            }
        }
        Ok(bundle)
    }

    /// Bare filenames listed in a fieldmap's `IntendedFor` metadata.
    pub fn intended_for(&self, fieldmap: &FileRef) -> Result<BTreeSet<String>> {
        let metadata = self.index.metadata(fieldmap)?;
        let entries: Vec<&str> = match metadata.get(INTENDED_FOR) {
            Some(serde_json::Value::String(target)) => vec![target.as_str()],
            Some(serde_json::Value::Array(targets)) => {
                targets.iter().filter_map(serde_json::Value::as_str).collect()
            }
            _ => Vec::new(),
        };
        Ok(entries
            .into_iter()
            .filter_map(|entry| Path::new(entry).file_name())
            .filter_map(|name| name.to_str())
            .map(str::to_string)
            .collect())
    }

    fn attach_fieldmap(&self, partition: &mut SessionPartition, fieldmap: &FileBundle) -> Result<()> {
        let targets = self.intended_for(&fieldmap.nifti)?;
        if targets.is_empty() {
            debug!(
                fieldmap = %fieldmap.path().display(),
                "fieldmap declares no {INTENDED_FOR} targets"
            );
            return Ok(());
        }
        // Matching is by bare filename only, so identically named runs in
        // different directories all receive the fieldmap.
        for data in partition.sessions.values_mut() {
            for run in &mut data.runs {
                if run.file_name().is_some_and(|name| targets.contains(name)) {
                    trace!(
                        fieldmap = %fieldmap.path().display(),
                        run = %run.dwi.path().display(),
                        "attached fieldmap"
                    );
                    run.fieldmaps.push(fieldmap.clone());
                }
            }
        }
        Ok(())
    }
}

fn session_entry<'p>(partition: &'p mut SessionPartition, file: &FileRef) -> &'p mut SessionData {
    partition
        .sessions
        .entry(SessionKey::from_label(file.entities.session()))
        .or_default()
}
