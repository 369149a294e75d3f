//! Orchestration of diffusion preprocessing plans.
//!
//! # Features
//!
//! - **Configuration**: TOML pipeline config with filter-file merging and
//!   output/work directory defaults
//! - **Orchestrator**: per-subject discovery, resolution, pairing, run graph
//!   assembly and a single dispatch of the merged subject graph
//!
//! # Example
//!
//! ```ignore
//! use dwiprep_core::{Orchestrator, PipelineConfig};
//! use dwiprep_graph::DryRun;
//! use dwiprep_ingest::DatasetLayout;
//!
//! let config = PipelineConfig::load(Path::new("dwiprep.toml"))?;
//! let layout = DatasetLayout::load(&config.bids_dir)?;
//! let orchestrator = Orchestrator::new(&config, &layout, &DryRun)?;
//! for subject in orchestrator.subjects()? {
//!     let handles = orchestrator.run(&subject, None)?;
//! }
//! ```

mod config;
mod error;
mod orchestrator;

// === Error Types ===
pub use error::{CoreError, Result};

// === Configuration ===
pub use config::{DERIVATIVES_DIR, PhaseEncodingLookup, PipelineConfig};

// === Orchestration ===
pub use orchestrator::{Orchestrator, SkippedUnit, SubjectReport};
