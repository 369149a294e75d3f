//! Dataset indexing for BIDS-organized imaging datasets.
//!
//! # Features
//!
//! - **Dataset Index**: the [`DatasetIndex`] trait the query layer consumes
//! - **Filename Parsing**: entities from `sub-01_ses-1_dir-AP_dwi.nii.gz`
//! - **Layout Discovery**: crawl `sub-*` trees on disk ([`DatasetLayout`])
//! - **In-Memory Index**: plan against a listing without disk access
//!
//! # Example
//!
//! ```ignore
//! use dwiprep_ingest::{DatasetIndex, DatasetLayout};
//! use dwiprep_model::{EntityFilter, EntityKey};
//!
//! let layout = DatasetLayout::load("/data/bids")?;
//! let dwi = layout.query(&EntityFilter::new().with(EntityKey::Suffix, "dwi"))?;
//! let metadata = layout.metadata(&dwi[0])?;
//! ```

mod error;
mod index;
mod layout;
mod memory;
mod parse;

// === Error Types ===
pub use error::{IngestError, Result};

// === Index Interface ===
pub use index::{DatasetIndex, Metadata};

// === Implementations ===
pub use layout::DatasetLayout;
pub use memory::InMemoryIndex;

// === Filename Parsing ===
pub use parse::{parse_entities, shares_stem, split_extension};
