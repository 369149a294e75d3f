//! Per-run graph assembly.

use std::path::{Path, PathBuf};

use dwiprep_graph::{GraphBuilder, PipelineGraph, ProcessingNode};
use dwiprep_model::{Direction, FileBundle, RunBundle};
use dwiprep_output::{OutputProfile, PathBuilder};
use dwiprep_query::{FieldmapPairing, PairedSource, decide_sdc_feasibility};
use tracing::{debug, info};

use crate::catalog::{self, path_value};
use crate::error::{Result, WorkflowError};
use crate::naming::workflow_name;
use crate::options::WorkflowOptions;
use crate::templates::{
    ANAT_OUTPUTS, APPLY_TRANSFORM_WF, CONVERSION_WF, EPI_REF_WF, EPI_REG_WF, INPUTNODE,
    NII_CONVERSION_WF, PHASEDIFF_WF, PREPROCESS_WF, PREPROCESSED_EPI_REF_WF, TENSOR_WF,
    init_apply_transform_wf, init_conversion_wf, init_epi_ref_wf, init_epireg_wf,
    init_nii_conversion_wf, init_phasediff_wf, init_preprocess_wf, init_tensor_wf, inputnode_of,
    outputnode_of, transformed_fields,
};

/// Fields of every run graph's `inputnode`.
pub const RUN_INPUT_FIELDS: [&str; 9] = [
    "dwi",
    "in_bval",
    "in_bvec",
    "in_json",
    "participant_label",
    "session_id",
    "work_dir",
    "bids_dir",
    "destination",
];

const REFERENCE_FIELDS: [&str; 4] = [
    "reference_dwi",
    "reference_bval",
    "reference_bvec",
    "reference_json",
];
const REFERENCE_CONVERSION: &str = "reference_conversion";
const REFERENCE_EPI_REF_WF: &str = "reference_epi_ref_wf";
const T1W_BRAIN: &str = "t1w_brain";

/// Everything a run graph needs besides the run itself.
#[derive(Debug, Clone, Copy)]
pub struct RunContext<'a> {
    pub subject: &'a str,
    pub session: Option<&'a str>,
    pub bids_dir: &'a Path,
    pub work_dir: &'a Path,
    pub paths: &'a PathBuilder,
    pub options: &'a WorkflowOptions,
    /// Build the T1w coregistration branch.
    pub coregister: bool,
}

impl RunContext<'_> {
    /// `<work>/dwiprep_wf/sub-<subject>[/ses-<session>]`
    pub fn run_work_dir(&self) -> PathBuf {
        let dir = self
            .work_dir
            .join("dwiprep_wf")
            .join(format!("sub-{}", self.subject));
        match self.session {
            Some(session) => dir.join(format!("ses-{session}")),
            None => dir,
        }
    }
}

/// Build the preprocessing graph of one diffusion run.
///
/// Distortion-correction nodes are present only when `pairing` holds an
/// opposite pair; the coregistration branch only when `ctx.coregister` is set.
pub fn init_dwi_preproc_graph(
    run: &RunBundle,
    pairing: &FieldmapPairing,
    ctx: &RunContext<'_>,
) -> Result<PipelineGraph> {
    let dwi = &run.dwi;
    let bval = dwi.bval.as_deref().ok_or_else(|| missing(dwi, "bval"))?;
    let bvec = dwi.bvec.as_deref().ok_or_else(|| missing(dwi, "bvec"))?;

    let decision = decide_sdc_feasibility(pairing);
    let sdc_pair = pairing.opposite_pair().filter(|_| decision.run_sdc);
    let fieldmaps: Vec<(Direction, &FileBundle)> = match sdc_pair {
        Some((first, second)) => pairing
            .fieldmaps()
            .filter(|(direction, _)| *direction == first || *direction == second)
            .collect(),
        None => Vec::new(),
    };
    let reference = sdc_pair.and_then(|(first, second)| {
        [first, second].into_iter().find_map(|direction| match pairing.get(direction) {
            Some(PairedSource::DwiReference(bundle)) if bundle.path() != dwi.path() => Some(bundle),
            _ => None,
        })
    });
    let fieldmap_keys: Vec<String> = fieldmaps
        .iter()
        .map(|(direction, _)| direction.fieldmap_key())
        .collect();

    let mut input_fields: Vec<String> =
        RUN_INPUT_FIELDS.iter().map(|field| (*field).to_string()).collect();
    for key in &fieldmap_keys {
        input_fields.push(key.clone());
        input_fields.push(format!("{key}_json"));
    }
    if reference.is_some() {
        input_fields.extend(REFERENCE_FIELDS.iter().map(|field| (*field).to_string()));
    }
    if ctx.coregister {
        input_fields.extend(ANAT_OUTPUTS.iter().map(|field| (*field).to_string()));
    }
    let field_refs: Vec<&str> = input_fields.iter().map(String::as_str).collect();

    let mut inputnode = ProcessingNode::identity(INPUTNODE, &field_refs)
        .bind("dwi", path_value(dwi.path()))
        .bind("in_bval", path_value(bval))
        .bind("in_bvec", path_value(bvec))
        .bind("participant_label", ctx.subject)
        .bind("work_dir", path_value(&ctx.run_work_dir()))
        .bind("bids_dir", path_value(ctx.bids_dir))
        .bind("destination", path_value(ctx.paths.root()));
    if let Some(json) = &dwi.json {
        inputnode = inputnode.bind("in_json", path_value(json));
    }
    if let Some(session) = ctx.session {
        inputnode = inputnode.bind("session_id", session);
    }
    for ((_, fieldmap), key) in fieldmaps.iter().zip(&fieldmap_keys) {
        inputnode = inputnode.bind(key.as_str(), path_value(fieldmap.path()));
        if let Some(json) = &fieldmap.json {
            inputnode = inputnode.bind(format!("{key}_json"), path_value(json));
        }
    }
    if let Some(reference) = reference {
        inputnode = bind_reference(inputnode, reference);
    }

    let mut wf = GraphBuilder::new(workflow_name(dwi.path()));
    wf.add_node(inputnode);

    // Conversion and EPI reference
    let conversion_in = inputnode_of(CONVERSION_WF);
    let conversion_out = outputnode_of(CONVERSION_WF);
    wf.add_graph(&init_conversion_wf(&fieldmap_keys)?).connect_many(
        INPUTNODE,
        &conversion_in,
        &[
            ("dwi", "dwi_file"),
            ("in_bval", "in_bval"),
            ("in_bvec", "in_bvec"),
            ("in_json", "dwi_json"),
        ],
    );
    for key in &fieldmap_keys {
        let json_key = format!("{key}_json");
        wf.connect_many(
            INPUTNODE,
            &conversion_in,
            &[
                (key.as_str(), key.as_str()),
                (json_key.as_str(), json_key.as_str()),
            ],
        );
    }

    let epi_ref = init_epi_ref_wf(ctx.options)?;
    wf.add_graph(&epi_ref)
        .connect(&conversion_out, "dwi_file", &inputnode_of(EPI_REF_WF), "dwi_file");

    // Distortion correction
    if let Some((first, second)) = sdc_pair {
        let keys = [first.fieldmap_key(), second.fieldmap_key()];
        let phasediff_in = inputnode_of(PHASEDIFF_WF);
        wf.add_graph(&init_phasediff_wf(ctx.options, [keys[0].as_str(), keys[1].as_str()])?);
        for (direction, key) in [first, second].into_iter().zip(&keys) {
            match pairing.get(direction) {
                Some(PairedSource::Fieldmap(_)) => {
                    wf.connect(&conversion_out, key, &phasediff_in, key);
                }
                Some(PairedSource::DwiReference(bundle)) if bundle.path() == dwi.path() => {
                    wf.connect(&outputnode_of(EPI_REF_WF), "epi_ref_file", &phasediff_in, key);
                }
                Some(PairedSource::DwiReference(_)) => {
                    add_reference_branch(&mut wf, ctx.options)?;
                    wf.connect(
                        &outputnode_of(REFERENCE_EPI_REF_WF),
                        "epi_ref_file",
                        &phasediff_in,
                        key,
                    );
                }
                None => {}
            }
        }
        add_sink(
            &mut wf,
            ctx,
            dwi,
            OutputProfile::PhasediffFieldmap,
            "nii.gz",
            (outputnode_of(PHASEDIFF_WF).as_str(), "merged_phasediff"),
        )?;
    }

    let preprocess_out = outputnode_of(PREPROCESS_WF);
    wf.add_graph(&init_preprocess_wf(ctx.options, sdc_pair.is_some())?)
        .connect(&conversion_out, "dwi_file", &inputnode_of(PREPROCESS_WF), "dwi_file");
    if sdc_pair.is_some() {
        wf.connect(
            &outputnode_of(PHASEDIFF_WF),
            "merged_phasediff",
            &inputnode_of(PREPROCESS_WF),
            "merged_phasediff",
        );
    }

    wf.add_graph(&epi_ref.clone_as(PREPROCESSED_EPI_REF_WF)).connect(
        &preprocess_out,
        "dwi_preproc",
        &inputnode_of(PREPROCESSED_EPI_REF_WF),
        "dwi_file",
    );

    let nii_in = inputnode_of(NII_CONVERSION_WF);
    let nii_out = outputnode_of(NII_CONVERSION_WF);
    wf.add_graph(&init_nii_conversion_wf()?)
        .connect(&preprocess_out, "dwi_preproc", &nii_in, "dwi_file")
        .connect(
            &outputnode_of(PREPROCESSED_EPI_REF_WF),
            "epi_ref_file",
            &nii_in,
            "epi_ref",
        );

    // Native-space derivatives
    for (port, profile, extension) in [
        ("dwi_file", OutputProfile::NativeDwiPreproc, "nii.gz"),
        ("dwi_bvec", OutputProfile::NativeDwiPreproc, "bvec"),
        ("dwi_bval", OutputProfile::NativeDwiPreproc, "bval"),
        ("dwi_json", OutputProfile::NativeDwiPreproc, "json"),
        ("epi_ref_file", OutputProfile::NativeEpiRef, "nii.gz"),
        ("epi_ref_json", OutputProfile::NativeEpiRef, "json"),
    ] {
        add_sink(&mut wf, ctx, dwi, profile, extension, (nii_out.as_str(), port))?;
    }

    let metrics = &ctx.options.metrics;
    let tensor_out = outputnode_of(TENSOR_WF);
    if !metrics.is_empty() {
        wf.add_graph(&init_tensor_wf(ctx.options)?).connect(
            &preprocess_out,
            "dwi_preproc",
            &inputnode_of(TENSOR_WF),
            "dwi_file",
        );
        for metric in metrics {
            add_sink(
                &mut wf,
                ctx,
                dwi,
                OutputProfile::NativeTensor(*metric),
                "nii.gz",
                (tensor_out.as_str(), metric.label()),
            )?;
        }
    }

    if ctx.coregister {
        let epi_reg_in = inputnode_of(EPI_REG_WF);
        let epi_reg_out = outputnode_of(EPI_REG_WF);
        wf.add_node(catalog::apply_mask(T1W_BRAIN))
            .connect_many(
                INPUTNODE,
                T1W_BRAIN,
                &[("t1w_preproc", "in_file"), ("t1w_mask", "in_mask")],
            )
            .add_graph(&init_epireg_wf()?)
            .connect(INPUTNODE, "t1w_preproc", &epi_reg_in, "t1w_head")
            .connect(T1W_BRAIN, "out_file", &epi_reg_in, "t1w_brain")
            .connect(&nii_out, "epi_ref_file", &epi_reg_in, "in_file");
        for (port, profile) in [
            ("epi_to_t1w_aff", OutputProfile::EpiToT1wTransform),
            ("t1w_to_epi_aff", OutputProfile::T1wToEpiTransform),
            ("epi_to_t1w", OutputProfile::CoregEpiRef),
        ] {
            add_sink(&mut wf, ctx, dwi, profile, "nii.gz", (epi_reg_out.as_str(), port))?;
        }

        let fields = transformed_fields(metrics);
        let apply_in = inputnode_of(APPLY_TRANSFORM_WF);
        let apply_out = outputnode_of(APPLY_TRANSFORM_WF);
        wf.add_graph(&init_apply_transform_wf(&fields)?)
            .connect(&nii_out, "dwi_file", &apply_in, "dwi_file")
            .connect(&epi_reg_out, "epi_to_t1w_aff", &apply_in, "epi_to_t1w_aff")
            .connect(T1W_BRAIN, "out_file", &apply_in, "t1w_brain");
        add_sink(
            &mut wf,
            ctx,
            dwi,
            OutputProfile::CoregDwiPreproc,
            "nii.gz",
            (apply_out.as_str(), "dwi_file"),
        )?;
        for metric in metrics {
            wf.connect(&tensor_out, metric.label(), &apply_in, metric.label());
            add_sink(
                &mut wf,
                ctx,
                dwi,
                OutputProfile::CoregTensor(*metric),
                "nii.gz",
                (apply_out.as_str(), metric.label()),
            )?;
        }
    } else {
        debug!(run = %dwi.path().display(), "no T1w; coregistration omitted");
    }

    let graph = wf.build()?;
    graph.ensure_fully_wired()?;
    info!(
        graph = %graph.name(),
        node_count = graph.len(),
        run_sdc = decision.run_sdc,
        extract_b0 = decision.extract_b0,
        coregister = ctx.coregister,
        "built run graph"
    );
    Ok(graph)
}

fn missing(dwi: &FileBundle, what: &'static str) -> WorkflowError {
    WorkflowError::MissingRunData {
        run: dwi.path().to_path_buf(),
        missing: what,
    }
}

fn bind_reference(mut inputnode: ProcessingNode, reference: &FileBundle) -> ProcessingNode {
    let files = [
        Some(reference.path()),
        reference.bval.as_deref(),
        reference.bvec.as_deref(),
        reference.json.as_deref(),
    ];
    for (field, file) in REFERENCE_FIELDS.iter().zip(files) {
        if let Some(file) = file {
            inputnode = inputnode.bind(*field, path_value(file));
        }
    }
    inputnode
}

/// Conversion and mean b=0 extraction of another run used as fieldmap counterpart.
fn add_reference_branch(wf: &mut GraphBuilder, options: &WorkflowOptions) -> Result<()> {
    let reference_epi_ref = init_epi_ref_wf(options)?.clone_as(REFERENCE_EPI_REF_WF);
    wf.add_node(catalog::mrconvert(REFERENCE_CONVERSION))
        .connect_many(
            INPUTNODE,
            REFERENCE_CONVERSION,
            &[
                ("reference_dwi", "in_file"),
                ("reference_bval", "in_bval"),
                ("reference_bvec", "in_bvec"),
                ("reference_json", "json_import"),
            ],
        )
        .add_graph(&reference_epi_ref)
        .connect(
            REFERENCE_CONVERSION,
            "out_file",
            &inputnode_of(REFERENCE_EPI_REF_WF),
            "dwi_file",
        );
    Ok(())
}

/// Add a derivatives sink fed by `from`, writing the run's `profile` output.
fn add_sink(
    wf: &mut GraphBuilder,
    ctx: &RunContext<'_>,
    dwi: &FileBundle,
    profile: OutputProfile,
    extension: &str,
    from: (&str, &str),
) -> Result<()> {
    let base = profile.base_entities(&dwi.nifti.entities, extension);
    let target = ctx
        .paths
        .build(&base, &profile.overrides(), &profile.pattern()?)?;
    let name = if profile.fixed_extension() || extension == "nii.gz" {
        profile.name()
    } else {
        format!("{}_{extension}", profile.name())
    };
    wf.add_node(catalog::derivatives_sink(&name, &target, dwi.path()))
        .connect(from.0, from.1, &name, "in_file");
    Ok(())
}
