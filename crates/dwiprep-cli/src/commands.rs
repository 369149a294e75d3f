use anyhow::{Context, Result, anyhow};
use tracing::{error, info, info_span};

use dwiprep_core::{Orchestrator, PhaseEncodingLookup, PipelineConfig};
use dwiprep_graph::{DryRun, GraphExecutor, PlanWriter};
use dwiprep_ingest::{DatasetIndex, DatasetLayout};
use dwiprep_model::{Datatype, EntityKey, IMAGE_EXTENSIONS};

use crate::cli::{PhaseEncodingArg, PlanArgs, SubjectsArgs};
use crate::types::{PlanResult, SubjectFailure, SubjectListing};

/// Merge the config file (if any) with command-line overrides.
pub fn build_config(args: &PlanArgs) -> Result<PipelineConfig> {
    let mut config = match &args.config {
        Some(path) => PipelineConfig::load(path)
            .with_context(|| format!("load config {}", path.display()))?,
        None => {
            let bids_dir = args
                .bids_dir
                .clone()
                .ok_or_else(|| anyhow!("BIDS_DIR is required without --config"))?;
            let output_dir = args
                .output_dir
                .clone()
                .ok_or_else(|| anyhow!("OUTPUT_DIR is required without --config"))?;
            PipelineConfig::new(bids_dir, output_dir)
        }
    };
    if let Some(bids_dir) = &args.bids_dir {
        config.bids_dir.clone_from(bids_dir);
    }
    if let Some(output_dir) = &args.output_dir {
        config.output_dir.clone_from(output_dir);
    }
    if args.work_dir.is_some() {
        config.work_dir.clone_from(&args.work_dir);
    }
    if !args.participant_label.is_empty() {
        config.participant_label.clone_from(&args.participant_label);
    }
    if !args.session_label.is_empty() {
        config.session_label.clone_from(&args.session_label);
    }
    if args.bids_filter_file.is_some() {
        config.bids_filter_file.clone_from(&args.bids_filter_file);
    }
    if let Some(lookup) = args.phase_encoding {
        config.phase_encoding = match lookup {
            PhaseEncodingArg::Metadata => PhaseEncodingLookup::Metadata,
            PhaseEncodingArg::Header => PhaseEncodingLookup::Header,
        };
    }
    config.normalized().context("invalid participant or session label")
}

pub fn run_plan(args: &PlanArgs) -> Result<PlanResult> {
    let config = build_config(args)?;
    let span = info_span!("plan", bids_dir = %config.bids_dir.display());
    let _guard = span.enter();

    let layout = DatasetLayout::load(&config.bids_dir)
        .with_context(|| format!("index dataset {}", config.bids_dir.display()))?;
    let plan_dir = (!args.dry_run).then(|| {
        args.plan_dir
            .clone()
            .unwrap_or_else(|| config.work_dir().join("plans"))
    });
    let writer;
    let executor: &dyn GraphExecutor = match &plan_dir {
        Some(dir) => {
            writer = PlanWriter::new(dir);
            &writer
        }
        None => &DryRun,
    };
    let orchestrator = Orchestrator::new(&config, &layout, executor)
        .context("configure orchestrator")?
        .with_create_dirs(!args.dry_run);

    let subjects = orchestrator.subjects().context("list subjects")?;
    info!(subjects = subjects.len(), dry_run = args.dry_run, "planning");
    let mut reports = Vec::new();
    let mut failures = Vec::new();
    for subject in subjects {
        match orchestrator.run_with_report(&subject, None) {
            Ok(report) => reports.push(report),
            Err(err) => {
                error!(subject = %subject, error = %err, "subject failed");
                failures.push(SubjectFailure {
                    subject,
                    error: err.to_string(),
                });
            }
        }
    }

    Ok(PlanResult {
        bids_dir: config.bids_dir.clone(),
        derivatives_dir: config.derivatives_root(),
        plan_dir,
        reports,
        failures,
    })
}

pub fn run_subjects(args: &SubjectsArgs) -> Result<Vec<SubjectListing>> {
    let layout = DatasetLayout::load(&args.bids_dir)
        .with_context(|| format!("index dataset {}", args.bids_dir.display()))?;
    let mut listings = Vec::new();
    for subject in layout.subjects()? {
        let sessions = layout.sessions(&subject)?;
        let filter = Datatype::Dwi
            .default_filter()
            .with(EntityKey::Subject, subject.as_str())
            .with(EntityKey::Extension, &IMAGE_EXTENSIONS[..]);
        let runs = layout.query(&filter)?.len();
        listings.push(SubjectListing {
            subject,
            sessions,
            runs,
        });
    }
    Ok(listings)
}
