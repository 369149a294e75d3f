use std::path::PathBuf;

use dwiprep_core::SubjectReport;
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct PlanResult {
    pub bids_dir: PathBuf,
    pub derivatives_dir: PathBuf,
    /// `None` for dry runs.
    pub plan_dir: Option<PathBuf>,
    pub reports: Vec<SubjectReport>,
    pub failures: Vec<SubjectFailure>,
}

impl PlanResult {
    pub fn has_errors(&self) -> bool {
        !self.failures.is_empty()
    }
}

#[derive(Debug, Serialize)]
pub struct SubjectFailure {
    pub subject: String,
    pub error: String,
}

#[derive(Debug, Serialize)]
pub struct SubjectListing {
    pub subject: String,
    pub sessions: Vec<String>,
    pub runs: usize,
}
