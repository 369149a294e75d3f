//! Output naming for preprocessing derivatives.
//!
//! # Features
//!
//! - **Path Patterns**: `{entity}` placeholders with `[...]` optional segments
//! - **Path Builder**: render relative paths and create parent directories
//!   idempotently
//! - **Output Profiles**: the entity overrides of every derivative kind
//!
//! # Example
//!
//! ```ignore
//! use dwiprep_output::{OutputProfile, PathBuilder};
//!
//! let builder = PathBuilder::new("/out/dwiprep");
//! let profile = OutputProfile::NativeDwiPreproc;
//! let base = profile.base_entities(&run_entities, "nii.gz");
//! let target = builder.build(&base, &profile.overrides(), &profile.pattern()?)?;
//! ```

mod builder;
mod error;
mod pattern;
mod profiles;

// === Error Types ===
pub use error::{PathBuildError, Result};

// === Patterns ===
pub use pattern::PathPattern;

// === Path Building ===
pub use builder::{DerivativeTarget, PathBuilder, build_path, ensure_parent_dir};

// === Output Profiles ===
pub use profiles::{DERIVATIVES_PATTERN, OutputProfile, TRANSFORM_PATTERN};
