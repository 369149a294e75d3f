//! Input resolution for diffusion preprocessing.
//!
//! # Features
//!
//! - **Query Resolver**: per-datatype queries, sidecar bundling, session
//!   partitioning and `IntendedFor` fieldmap attachment
//! - **Datatype Filters**: user filters merged over built-in defaults,
//!   loadable from a JSON filter file
//! - **Fieldmap Pairing**: opposite phase-encoding pairing and the
//!   distortion-correction decision
//!
//! # Example
//!
//! ```ignore
//! use dwiprep_query::{DatatypeFilters, MetadataDirections, QueryResolver, pair};
//!
//! let resolver = QueryResolver::new(&layout);
//! let partition = resolver.resolve("01", Some("1"), &DatatypeFilters::new())?;
//! let directions = MetadataDirections::new(&layout);
//! for data in partition.sessions.values() {
//!     for run in &data.runs {
//!         let pairing = pair(&directions, &run.fieldmaps, &data.dwi_bundles())?;
//!     }
//! }
//! ```

mod error;
mod filters;
mod pairing;
mod resolver;

// === Error Types ===
pub use error::{QueryError, Result};

// === Filters ===
pub use filters::DatatypeFilters;

// === Resolution ===
pub use resolver::{AnatomicalInputs, INTENDED_FOR, QueryResolver};

// === Fieldmap Pairing ===
pub use pairing::{
    FieldmapPairing, HeaderDirections, MetadataDirections, PHASE_ENCODING_DIRECTION,
    PairedSource, PhaseEncodingSource, SdcDecision, decide_sdc_feasibility, pair,
};
