//! CLI library components for the dwiprep planner.

pub mod cli;
pub mod commands;
pub mod logging;
pub mod types;
