//! Per-subject orchestration.
//!
//! A subject moves through discovery (which sessions to plan), resolution
//! and pairing per session, run graph assembly, attachment to the shared
//! anatomical graph and a single dispatch of the merged subject graph.
//! Failures local to one session or run, such as absent diffusion data or an
//! unreadable sidecar, skip only that unit.

use std::collections::BTreeMap;

use dwiprep_graph::{ExecutionHandle, GraphExecutor, PipelineGraph};
use dwiprep_ingest::DatasetIndex;
use dwiprep_model::{Advisory, EntityKey, SessionKey, SessionPartition, normalize_label};
use dwiprep_output::PathBuilder;
use dwiprep_query::{
    DatatypeFilters, HeaderDirections, MetadataDirections, PhaseEncodingSource, QueryResolver, pair,
};
use dwiprep_workflows::{
    ANAT_PREPROC_WF, RunContext, init_anat_preproc_graph, init_dwi_preproc_graph,
    init_subject_graph,
};
use serde::Serialize;
use tracing::{debug, info, info_span, warn};

use crate::config::{PhaseEncodingLookup, PipelineConfig};
use crate::error::{CoreError, Result};

/// A session or run left out of the subject graph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedUnit {
    pub session: SessionKey,
    /// Run filename, or `None` when the whole session was skipped.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub run: Option<String>,
    pub reason: String,
}

/// Outcome of planning one subject.
#[derive(Debug, Clone, Serialize)]
pub struct SubjectReport {
    pub subject: String,
    pub graph: String,
    pub node_count: usize,
    /// Dispatch receipt per session, restricted to that session's units.
    pub handles: BTreeMap<SessionKey, ExecutionHandle>,
    /// Run graph names per session.
    pub runs: BTreeMap<SessionKey, Vec<String>>,
    pub coregistered: bool,
    pub advisories: Vec<Advisory>,
    pub skipped: Vec<SkippedUnit>,
}

impl SubjectReport {
    pub fn run_count(&self) -> usize {
        self.runs.values().map(Vec::len).sum()
    }
}

/// Drives resolution, graph assembly and dispatch for subjects of one dataset.
pub struct Orchestrator<'a, I: DatasetIndex + ?Sized, E: GraphExecutor + ?Sized> {
    index: &'a I,
    executor: &'a E,
    config: &'a PipelineConfig,
    filters: DatatypeFilters,
    paths: PathBuilder,
}

impl<'a, I: DatasetIndex + ?Sized, E: GraphExecutor + ?Sized> Orchestrator<'a, I, E> {
    /// Fails when the configured filter file cannot be loaded.
    pub fn new(config: &'a PipelineConfig, index: &'a I, executor: &'a E) -> Result<Self> {
        Ok(Self {
            index,
            executor,
            config,
            filters: config.resolved_filters()?,
            paths: PathBuilder::new(config.derivatives_root()),
        })
    }

    /// Plan without creating derivative directories.
    #[must_use]
    pub fn with_create_dirs(mut self, create_dirs: bool) -> Self {
        self.paths = self.paths.with_create_dirs(create_dirs);
        self
    }

    /// Subjects selected by the config, or every subject of the dataset.
    pub fn subjects(&self) -> Result<Vec<String>> {
        if self.config.participant_label.is_empty() {
            Ok(self.index.subjects()?)
        } else {
            Ok(self.config.participant_label.clone())
        }
    }

    /// Plan and dispatch one subject; see [`Orchestrator::run_with_report`].
    pub fn run(
        &self,
        subject: &str,
        sessions: Option<&[String]>,
    ) -> Result<BTreeMap<SessionKey, ExecutionHandle>> {
        Ok(self.run_with_report(subject, sessions)?.handles)
    }

    /// Plan and dispatch one subject.
    ///
    /// `sessions` restricts planning to the given labels; `None` falls back
    /// to the config's session list, then to every session of the subject.
    pub fn run_with_report(
        &self,
        subject: &str,
        sessions: Option<&[String]>,
    ) -> Result<SubjectReport> {
        let subject = normalize_label(EntityKey::Subject, subject)?;
        let span = info_span!("subject", subject = %subject);
        let _guard = span.enter();

        let mut skipped = Vec::new();
        let selected = {
            let _stage = info_span!("discover").entered();
            self.discover(&subject, sessions, &mut skipped)?
        };

        let resolver = QueryResolver::new(self.index);
        let mut partition = SessionPartition::new(subject.as_str());
        {
            let _stage = info_span!("partition").entered();
            for session in &selected {
                match resolver.resolve(&subject, session.as_deref(), &self.filters) {
                    Ok(resolved) => {
                        partition.sessions.extend(resolved.sessions);
                        partition.advisories.extend(resolved.advisories);
                    }
                    Err(error) if error.is_unit_local() => {
                        let key = SessionKey::from_label(session.as_deref());
                        warn!(session = %key, %error, "skipping session");
                        skipped.push(SkippedUnit {
                            session: key,
                            run: None,
                            reason: error.to_string(),
                        });
                    }
                    Err(error) => return Err(error.into()),
                }
            }
        }

        let anat = {
            let _stage = info_span!("anatomical").entered();
            let inputs = resolver.anatomical(&subject, &self.filters)?;
            if inputs.has_t1w() {
                Some(init_anat_preproc_graph(
                    &subject,
                    &inputs,
                    &self.config.derivatives_root(),
                )?)
            } else {
                warn!("no T1w image; coregistration is disabled");
                None
            }
        };

        let directions = self.phase_encoding_source();
        let work_dir = self.config.work_dir();
        let mut run_graphs: Vec<PipelineGraph> = Vec::new();
        let mut runs: BTreeMap<SessionKey, Vec<String>> = BTreeMap::new();
        for (key, data) in &partition.sessions {
            let _stage = info_span!("session", session = %key).entered();
            let ctx = RunContext {
                subject: &subject,
                session: key.label(),
                bids_dir: &self.config.bids_dir,
                work_dir: &work_dir,
                paths: &self.paths,
                options: &self.config.workflow,
                coregister: anat.is_some(),
            };
            let dwi_runs = data.dwi_bundles();
            for run in &data.runs {
                let pairing = match pair(&*directions, &run.fieldmaps, &dwi_runs) {
                    Ok(pairing) => pairing,
                    Err(error) if error.is_unit_local() => {
                        warn!(run = %run.dwi.path().display(), %error, "skipping run");
                        skipped.push(SkippedUnit {
                            session: key.clone(),
                            run: run.file_name().map(str::to_string),
                            reason: error.to_string(),
                        });
                        continue;
                    }
                    Err(error) => return Err(error.into()),
                };
                debug!(
                    run = %run.dwi.path().display(),
                    fieldmaps = ?pairing.keys(),
                    "paired fieldmaps"
                );
                match init_dwi_preproc_graph(run, &pairing, &ctx) {
                    Ok(graph) => {
                        runs.entry(key.clone())
                            .or_default()
                            .push(graph.name().to_string());
                        run_graphs.push(graph);
                    }
                    Err(error) if error.is_data_absence() => {
                        warn!(run = %run.dwi.path().display(), %error, "skipping run");
                        skipped.push(SkippedUnit {
                            session: key.clone(),
                            run: run.file_name().map(str::to_string),
                            reason: error.to_string(),
                        });
                    }
                    Err(error) => return Err(error.into()),
                }
            }
        }

        if run_graphs.is_empty() {
            return Err(CoreError::NoRunnableData { subject });
        }

        let graph = {
            let _stage = info_span!("attach").entered();
            let graph = init_subject_graph(&subject, anat.as_ref(), &run_graphs)?;
            graph.ensure_fully_wired()?;
            graph
        };

        let handle = {
            let _stage = info_span!("dispatch").entered();
            self.executor.dispatch(&graph)?
        };
        let handles = runs
            .iter()
            .map(|(key, names)| {
                let mut units = names.clone();
                if anat.is_some() {
                    units.push(ANAT_PREPROC_WF.to_string());
                }
                (key.clone(), handle.restricted_to(&units))
            })
            .collect();

        info!(
            graph = %graph.name(),
            node_count = graph.len(),
            runs = run_graphs.len(),
            skipped = skipped.len(),
            dispatch_id = %handle.dispatch_id,
            "dispatched subject graph"
        );
        Ok(SubjectReport {
            subject,
            graph: graph.name().to_string(),
            node_count: graph.len(),
            handles,
            runs,
            coregistered: anat.is_some(),
            advisories: partition.advisories,
            skipped,
        })
    }

    /// Session labels to resolve; `None` stands for a session-less dataset.
    fn discover(
        &self,
        subject: &str,
        requested: Option<&[String]>,
        skipped: &mut Vec<SkippedUnit>,
    ) -> Result<Vec<Option<String>>> {
        let available = self.index.sessions(subject)?;
        let requested = requested.unwrap_or(&self.config.session_label);
        debug!(available = ?available, requested = ?requested, "discovered sessions");

        if available.is_empty() {
            if !requested.is_empty() {
                warn!("dataset has no sessions; ignoring session selection");
            }
            return Ok(vec![None]);
        }
        if requested.is_empty() {
            return Ok(available.into_iter().map(Some).collect());
        }

        let mut selected = Vec::new();
        for label in requested {
            let label = normalize_label(EntityKey::Session, label)?;
            if available.contains(&label) {
                selected.push(Some(label));
            } else {
                warn!(session = %label, "requested session not found");
                skipped.push(SkippedUnit {
                    session: SessionKey::Session(label),
                    run: None,
                    reason: "session not found in dataset".to_string(),
                });
            }
        }
        Ok(selected)
    }

    fn phase_encoding_source(&self) -> Box<dyn PhaseEncodingSource + 'a> {
        match self.config.phase_encoding {
            PhaseEncodingLookup::Metadata => Box::new(MetadataDirections::new(self.index)),
            PhaseEncodingLookup::Header => Box::new(HeaderDirections::new()),
        }
    }
}
