//! Handing graphs to an executor.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::info;

use crate::error::ExecutorError;
use crate::pipeline::PipelineGraph;
use crate::plan::PlanDocument;

/// Receipt for a dispatched graph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExecutionHandle {
    pub dispatch_id: String,
    pub graph: String,
    /// Top-level sub-graphs covered by this handle.
    pub units: Vec<String>,
    pub node_count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub plan_path: Option<PathBuf>,
    pub dispatched_at: DateTime<Utc>,
}

impl ExecutionHandle {
    pub fn new(graph: &PipelineGraph, dispatched_at: DateTime<Utc>) -> Self {
        Self {
            dispatch_id: format!(
                "{}-{}",
                graph.name(),
                dispatched_at.format("%Y%m%dT%H%M%S%.3fZ")
            ),
            graph: graph.name().to_string(),
            units: graph.units().into_iter().map(str::to_string).collect(),
            node_count: graph.len(),
            plan_path: None,
            dispatched_at,
        }
    }

    #[must_use]
    pub fn with_plan_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.plan_path = Some(path.into());
        self
    }

    /// The same dispatch, restricted to the units in `keep`.
    #[must_use]
    pub fn restricted_to(&self, keep: &[String]) -> Self {
        Self {
            units: self
                .units
                .iter()
                .filter(|unit| keep.contains(unit))
                .cloned()
                .collect(),
            ..self.clone()
        }
    }
}

/// Something that accepts a validated graph for execution.
pub trait GraphExecutor {
    fn dispatch(&self, graph: &PipelineGraph) -> Result<ExecutionHandle, ExecutorError>;
}

/// Accepts graphs without side effects.
#[derive(Debug, Clone, Copy, Default)]
pub struct DryRun;

impl GraphExecutor for DryRun {
    fn dispatch(&self, graph: &PipelineGraph) -> Result<ExecutionHandle, ExecutorError> {
        let handle = ExecutionHandle::new(graph, Utc::now());
        info!(
            graph = %graph.name(),
            node_count = graph.len(),
            dispatch_id = %handle.dispatch_id,
            "dry run"
        );
        Ok(handle)
    }
}

/// Writes `<graph>.json` and `<graph>.dot` into a plan directory.
#[derive(Debug, Clone)]
pub struct PlanWriter {
    dir: PathBuf,
}

impl PlanWriter {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl GraphExecutor for PlanWriter {
    fn dispatch(&self, graph: &PipelineGraph) -> Result<ExecutionHandle, ExecutorError> {
        std::fs::create_dir_all(&self.dir).map_err(|source| ExecutorError::CreateDir {
            path: self.dir.clone(),
            source,
        })?;

        let dispatched_at = Utc::now();
        let document = PlanDocument::from_graph(graph, dispatched_at);
        let json_path = self.dir.join(format!("{}.json", graph.name()));
        let json = serde_json::to_string_pretty(&document)?;
        write(&json_path, json)?;
        write(&self.dir.join(format!("{}.dot", graph.name())), graph.to_dot())?;

        info!(
            graph = %graph.name(),
            node_count = graph.len(),
            path = %json_path.display(),
            "wrote plan"
        );
        Ok(ExecutionHandle::new(graph, dispatched_at).with_plan_path(json_path))
    }
}

fn write(path: &Path, contents: String) -> Result<(), ExecutorError> {
    std::fs::write(path, contents).map_err(|source| ExecutorError::Write {
        path: path.to_path_buf(),
        source,
    })
}
