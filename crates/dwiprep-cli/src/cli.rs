//! CLI argument definitions for the dwiprep planner.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use clap_verbosity_flag::{Verbosity, WarnLevel};
use colorchoice_clap::Color;

#[derive(Parser)]
#[command(
    name = "dwiprep",
    version,
    about = "dwiprep - Plan diffusion MRI preprocessing for BIDS datasets",
    long_about = "Resolve the diffusion, fieldmap and anatomical inputs of each participant,\n\
                  assemble the preprocessing graph and hand it to an executor.\n\n\
                  Plans are written as JSON and Graphviz DOT documents."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Adjust log verbosity (-v for info, -vv for debug, -q for errors only).
    #[command(flatten)]
    pub verbosity: Verbosity<WarnLevel>,

    /// Control ANSI color output (auto, always, never).
    #[command(flatten)]
    pub color: Color,

    /// Explicit log level (overrides -v/-q flags).
    #[arg(long = "log-level", value_enum, global = true)]
    pub log_level: Option<LogLevelArg>,

    /// Log output format (pretty for human, json for machine parsing).
    #[arg(
        long = "log-format",
        value_enum,
        default_value = "pretty",
        global = true
    )]
    pub log_format: LogFormatArg,

    /// Write logs to a file instead of stderr.
    #[arg(long = "log-file", value_name = "PATH", global = true)]
    pub log_file: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Command {
    /// Build and dispatch preprocessing plans for participants.
    Plan(PlanArgs),

    /// List participants and sessions of a dataset.
    Subjects(SubjectsArgs),
}

#[derive(Parser, Default)]
pub struct PlanArgs {
    /// Root of the BIDS dataset (required unless set in --config).
    #[arg(value_name = "BIDS_DIR")]
    pub bids_dir: Option<PathBuf>,

    /// Output directory; derivatives go to <OUTPUT_DIR>/dwiprep.
    #[arg(value_name = "OUTPUT_DIR")]
    pub output_dir: Option<PathBuf>,

    /// TOML pipeline configuration. Command-line flags override its values.
    #[arg(long = "config", value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Participants to plan (with or without the `sub-` prefix).
    #[arg(long = "participant-label", value_name = "LABEL", num_args = 1..)]
    pub participant_label: Vec<String>,

    /// Sessions to plan (with or without the `ses-` prefix).
    #[arg(long = "session-label", value_name = "LABEL", num_args = 1..)]
    pub session_label: Vec<String>,

    /// Work directory (default: <OUTPUT_DIR>/work).
    #[arg(long = "work-dir", value_name = "DIR")]
    pub work_dir: Option<PathBuf>,

    /// JSON file of per-datatype entity filters.
    #[arg(long = "bids-filter-file", value_name = "PATH")]
    pub bids_filter_file: Option<PathBuf>,

    /// Where phase-encoding directions are read from.
    #[arg(long = "phase-encoding", value_enum)]
    pub phase_encoding: Option<PhaseEncodingArg>,

    /// Directory for plan documents (default: <WORK_DIR>/plans).
    #[arg(long = "plan-dir", value_name = "DIR")]
    pub plan_dir: Option<PathBuf>,

    /// Build and validate plans without writing anything.
    #[arg(long = "dry-run")]
    pub dry_run: bool,

    /// Print the subject reports as JSON instead of tables.
    #[arg(long = "json")]
    pub json: bool,
}

#[derive(Parser)]
pub struct SubjectsArgs {
    /// Root of the BIDS dataset.
    #[arg(value_name = "BIDS_DIR")]
    pub bids_dir: PathBuf,
}

/// CLI phase-encoding source choices.
#[derive(Clone, Copy, ValueEnum)]
pub enum PhaseEncodingArg {
    Metadata,
    Header,
}

/// CLI log level choices.
#[derive(Clone, Copy, ValueEnum)]
pub enum LogLevelArg {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// CLI log format choices.
#[derive(Clone, Copy, ValueEnum)]
pub enum LogFormatArg {
    Pretty,
    Compact,
    Json,
}
