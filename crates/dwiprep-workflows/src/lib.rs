//! Workflow templates for diffusion preprocessing.
//!
//! # Features
//!
//! - **Step Catalog**: port declarations of every external step
//! - **Templates**: conversion, EPI reference, phasediff, preprocessing,
//!   NIfTI conversion, tensor estimation, EPI-to-T1w registration and
//!   transform application sub-graphs
//! - **Run Graphs**: per-run assembly with build-time distortion-correction
//!   and coregistration branches and derivative sinks
//! - **Subject Graphs**: run graphs attached to one shared anatomical graph
//!
//! # Example
//!
//! ```ignore
//! use dwiprep_workflows::{RunContext, WorkflowOptions, init_dwi_preproc_graph};
//!
//! let ctx = RunContext {
//!     subject: "01",
//!     session: Some("1"),
//!     bids_dir: &bids_dir,
//!     work_dir: &work_dir,
//!     paths: &paths,
//!     options: &WorkflowOptions::default(),
//!     coregister: true,
//! };
//! let graph = init_dwi_preproc_graph(&run, &pairing, &ctx)?;
//! ```

mod anat;
pub mod catalog;
mod error;
mod naming;
mod options;
mod run;
mod subject;
pub mod templates;

// === Error Types ===
pub use error::{Result, WorkflowError};

// === Options ===
pub use options::{Params, WorkflowOptions};

// === Naming ===
pub use naming::{subject_graph_name, workflow_name};

// === Graph Assembly ===
pub use anat::{ANAT_PREPROC_WF, init_anat_preproc_graph};
pub use run::{RUN_INPUT_FIELDS, RunContext, init_dwi_preproc_graph};
pub use subject::init_subject_graph;
pub use templates::ANAT_OUTPUTS;
