//! Data model for diffusion MRI preprocessing plans.
//!
//! The types here describe what the planner knows about a dataset:
//! entity records parsed from BIDS filenames, the datatypes queried per
//! subject, phase-encoding directions, and the run/session groupings the
//! query layer produces.

pub mod datatype;
pub mod direction;
pub mod entity;
pub mod error;
pub mod files;
pub mod resolution;
pub mod session;
pub mod tensor;

pub use datatype::{Datatype, IMAGE_EXTENSIONS, Requirement};
pub use direction::Direction;
pub use entity::{EntityFilter, EntityKey, EntityRecord, FilterValue, normalize_label};
pub use error::{ModelError, Result};
pub use files::{FileBundle, FileRef, SidecarRole};
pub use resolution::Resolution;
pub use session::{Advisory, RunBundle, SessionData, SessionKey, SessionPartition};
pub use tensor::TensorMetric;
