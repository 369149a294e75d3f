//! Tests for run and subject graph assembly.

use std::collections::BTreeMap;
use std::path::Path;

use dwiprep_graph::PipelineGraph;
use dwiprep_model::{
    Direction, EntityKey, EntityRecord, FileBundle, FileRef, RunBundle, TensorMetric,
};
use dwiprep_output::PathBuilder;
use dwiprep_query::{AnatomicalInputs, FieldmapPairing, PhaseEncodingSource, pair};
use dwiprep_workflows::{
    RunContext, WorkflowError, WorkflowOptions, init_anat_preproc_graph, init_dwi_preproc_graph,
    init_subject_graph,
};

/// Directions from the filename `dir` entity.
struct DirEntity;

impl PhaseEncodingSource for DirEntity {
    fn direction(&self, file: &FileRef) -> dwiprep_query::Result<Option<Direction>> {
        Ok(file
            .entities
            .get(EntityKey::Direction)
            .and_then(|label| label.parse().ok()))
    }
}

fn bundle(datatype: &str, direction: &str, run: Option<&str>, gradients: bool) -> FileBundle {
    let suffix = if datatype == "fmap" { "epi" } else { "dwi" };
    let mut entities = EntityRecord::from([
        (EntityKey::Subject, "01"),
        (EntityKey::Datatype, datatype),
        (EntityKey::Direction, direction),
        (EntityKey::Suffix, suffix),
        (EntityKey::Extension, "nii.gz"),
    ]);
    let run_part = match run {
        Some(run) => {
            entities.insert(EntityKey::Run, run);
            format!("_run-{run}")
        }
        None => String::new(),
    };
    let stem = format!("/bids/sub-01/{datatype}/sub-01_dir-{direction}{run_part}_{suffix}");
    let mut bundle = FileBundle::new(FileRef::new(format!("{stem}.nii.gz"), entities));
    bundle.json = Some(format!("{stem}.json").into());
    if gradients {
        bundle.bval = Some(format!("{stem}.bval").into());
        bundle.bvec = Some(format!("{stem}.bvec").into());
    }
    bundle
}

fn dwi(direction: &str) -> FileBundle {
    bundle("dwi", direction, None, true)
}

fn fmap(direction: &str) -> FileBundle {
    bundle("fmap", direction, None, false)
}

fn build(
    run: &RunBundle,
    pairing: &FieldmapPairing,
    options: &WorkflowOptions,
    coregister: bool,
) -> Result<PipelineGraph, WorkflowError> {
    let paths = PathBuilder::new("/out/dwiprep").with_create_dirs(false);
    let ctx = RunContext {
        subject: "01",
        session: None,
        bids_dir: Path::new("/bids"),
        work_dir: Path::new("/out/work"),
        paths: &paths,
        options,
        coregister,
    };
    init_dwi_preproc_graph(run, pairing, &ctx)
}

fn has_sdc_nodes(graph: &PipelineGraph) -> bool {
    graph
        .node_names()
        .iter()
        .any(|name| {
            name.contains("phasediff") || name.contains("fmap_") || name.starts_with("reference_")
        })
}

#[test]
fn graph_without_fieldmaps_is_deterministic_and_has_no_sdc_nodes() {
    let run = RunBundle::new(dwi("AP"));
    let options = WorkflowOptions::default();
    let first = build(&run, &FieldmapPairing::default(), &options, false).expect("first build");
    let second = build(&run, &FieldmapPairing::default(), &options, false).expect("second build");

    assert_eq!(first.name(), "dwi_preproc_dir_AP_wf");
    assert_eq!(first.node_names(), second.node_names());
    assert_eq!(first, second);
    assert!(!has_sdc_nodes(&first));
    let preproc = first.node("preprocess_wf.dwipreproc").expect("preproc node");
    assert_eq!(preproc.param_values()["rpe_options"], "none");
}

#[test]
fn opposite_fieldmaps_enable_distortion_correction() {
    let run = RunBundle::new(dwi("AP"));
    let fieldmaps = [fmap("PA"), fmap("AP")];
    let pairing = pair(&DirEntity, &fieldmaps, &[run.dwi.clone()]).expect("pairing");
    let graph = build(&run, &pairing, &WorkflowOptions::default(), false).expect("graph");

    for node in [
        "mif_conversion_wf.fmap_ap_conversion",
        "mif_conversion_wf.fmap_pa_conversion",
        "phasediff_prep_wf.mrcat",
        "ds_phasediff",
    ] {
        assert!(graph.contains(node), "missing {node}");
    }
    assert!(graph.incoming("preprocess_wf.dwipreproc").any(|edge| edge.to.port == "in_epi"));
    let inputnode = graph.node("inputnode").expect("inputnode");
    assert!(inputnode.bindings()["fmap_pa"]
        .as_str()
        .is_some_and(|path| path.ends_with("sub-01_dir-PA_epi.nii.gz")));
}

#[test]
fn run_itself_can_be_the_fieldmap_counterpart() {
    let run = RunBundle::new(dwi("PA"));
    let fieldmaps = [fmap("AP")];
    let pairing = pair(&DirEntity, &fieldmaps, &[run.dwi.clone()]).expect("pairing");
    let graph = build(&run, &pairing, &WorkflowOptions::default(), false).expect("graph");

    assert!(graph.contains("mif_conversion_wf.fmap_ap_conversion"));
    assert!(!graph.contains("mif_conversion_wf.fmap_pa_conversion"));
    assert!(!graph.contains("reference_conversion"));
    assert!(graph.incoming("phasediff_prep_wf.inputnode").any(|edge| {
        edge.from.node == "epi_reference_wf.outputnode" && edge.to.port == "fmap_pa"
    }));
}

#[test]
fn another_run_can_be_the_fieldmap_counterpart() {
    let run = RunBundle::new(bundle("dwi", "AP", Some("1"), true));
    let other = bundle("dwi", "PA", Some("2"), true);
    let fieldmaps = [fmap("AP")];
    let pairing = pair(&DirEntity, &fieldmaps, &[run.dwi.clone(), other]).expect("pairing");
    let graph = build(&run, &pairing, &WorkflowOptions::default(), false).expect("graph");

    assert!(graph.contains("reference_conversion"));
    assert!(graph.contains("reference_epi_ref_wf.mrmath"));
    let inputnode = graph.node("inputnode").expect("inputnode");
    assert!(inputnode.bindings()["reference_dwi"]
        .as_str()
        .is_some_and(|path| path.ends_with("sub-01_dir-PA_run-2_dwi.nii.gz")));
    let sink = graph.node("ds_native_dwi_preproc").expect("sink");
    assert_eq!(
        sink.param_values()["relative_path"],
        "sub-01/dwi/sub-01_dir-AP_run-1_space-orig_desc-preproc_dwi.nii.gz"
    );
}

#[test]
fn single_fieldmap_without_counterpart_disables_correction() {
    let run = RunBundle::new(dwi("AP"));
    let fieldmaps = [fmap("AP")];
    let pairing = pair(&DirEntity, &fieldmaps, &[run.dwi.clone()]).expect("pairing");
    let graph = build(&run, &pairing, &WorkflowOptions::default(), false).expect("graph");
    assert!(!has_sdc_nodes(&graph));
}

#[test]
fn run_without_gradients_is_data_absence() {
    let run = RunBundle::new(bundle("dwi", "AP", None, false));
    let error = build(&run, &FieldmapPairing::default(), &WorkflowOptions::default(), false)
        .unwrap_err();
    assert!(matches!(error, WorkflowError::MissingRunData { missing: "bval", .. }));
    assert!(error.is_data_absence());
}

#[test]
fn coregistration_branch_follows_flag() {
    let run = RunBundle::new(dwi("AP"));
    let options = WorkflowOptions::default();
    let native = build(&run, &FieldmapPairing::default(), &options, false).expect("native");
    assert!(!native.contains("epi_reg_wf.epi_reg"));
    assert!(!native.contains("ds_coreg_fa"));

    let coreg = build(&run, &FieldmapPairing::default(), &options, true).expect("coreg");
    for node in [
        "t1w_brain",
        "epi_reg_wf.epi_reg",
        "apply_transform_wf.apply_transform_dwi_file",
        "apply_transform_wf.apply_transform_fa",
        "ds_epi_to_t1w_aff",
        "ds_coreg_dwi_preproc",
        "ds_coreg_fa",
    ] {
        assert!(coreg.contains(node), "missing {node}");
    }
    let transform = coreg.node("ds_epi_to_t1w_aff").expect("transform sink");
    assert_eq!(
        transform.param_values()["relative_path"],
        "sub-01/dwi/sub-01_dir-AP_from-epiref_to-T1w_xfm.txt"
    );
}

#[test]
fn metric_selection_limits_tensor_outputs() {
    let run = RunBundle::new(dwi("AP"));
    let options = WorkflowOptions {
        metrics: vec![TensorMetric::Fa],
        ..WorkflowOptions::default()
    };
    let graph = build(&run, &FieldmapPairing::default(), &options, false).expect("graph");
    assert!(graph.contains("ds_native_fa"));
    assert!(!graph.contains("ds_native_adc"));

    let none = WorkflowOptions {
        metrics: Vec::new(),
        ..WorkflowOptions::default()
    };
    let graph = build(&run, &FieldmapPairing::default(), &none, false).expect("graph");
    assert!(!graph.contains("tensor_estimation_wf.fit_tensor"));
}

fn anat_graph() -> PipelineGraph {
    let t1w = FileRef::new(
        "/bids/sub-01/anat/sub-01_T1w.nii.gz",
        EntityRecord::from([(EntityKey::Subject, "01"), (EntityKey::Suffix, "T1w")]),
    );
    let anat = AnatomicalInputs {
        t1w: vec![FileBundle::new(t1w)],
        t2w: Vec::new(),
    };
    init_anat_preproc_graph("01", &anat, Path::new("/out/dwiprep")).expect("anat graph")
}

#[test]
fn subject_graph_fans_out_anatomical_outputs() {
    let anat = anat_graph();
    let options = WorkflowOptions::default();
    let runs: Vec<PipelineGraph> = ["1", "2"]
        .into_iter()
        .map(|label| {
            let run = RunBundle::new(bundle("dwi", "AP", Some(label), true));
            build(&run, &FieldmapPairing::default(), &options, true).expect("run graph")
        })
        .collect();

    let subject = init_subject_graph("01", Some(&anat), &runs).expect("subject graph");
    assert_eq!(subject.name(), "single_subject_01_wf");
    assert_eq!(
        subject.units().into_iter().collect::<Vec<_>>(),
        ["anat_preproc_wf", "dwi_preproc_dir_AP_run_1_wf", "dwi_preproc_dir_AP_run_2_wf"]
    );
    let anat_nodes = subject
        .node_names()
        .iter()
        .filter(|name| name.starts_with("anat_preproc_wf."))
        .count();
    assert_eq!(anat_nodes, 3);
    for run in &runs {
        let inputnode = format!("{}.inputnode", run.name());
        let fed = subject
            .incoming(&inputnode)
            .filter(|edge| edge.from.node == "anat_preproc_wf.outputnode")
            .count();
        assert_eq!(fed, 12);
    }
    assert!(subject.ensure_fully_wired().is_ok());
}

#[test]
fn opposite_runs_of_one_session_write_distinct_derivatives() {
    let dwi_runs = [dwi("AP"), dwi("PA")];
    let fieldmaps = [fmap("PA")];
    let options = WorkflowOptions::default();
    let runs: Vec<PipelineGraph> = dwi_runs
        .iter()
        .map(|dwi| {
            let run = RunBundle::new(dwi.clone());
            let pairing = pair(&DirEntity, &fieldmaps, &dwi_runs).expect("pairing");
            build(&run, &pairing, &options, true).expect("run graph")
        })
        .collect();
    for run in &runs {
        assert!(run.contains("ds_phasediff"), "{} has no SDC", run.name());
    }

    let subject = init_subject_graph("01", Some(&anat_graph()), &runs).expect("subject graph");
    let mut targets: BTreeMap<&str, Vec<&str>> = BTreeMap::new();
    for node in subject.nodes() {
        if let Some(path) = node.param_values().get("out_path").and_then(|value| value.as_str()) {
            targets.entry(path).or_default().push(node.name());
        }
    }

    assert!(targets.len() > 20);
    for (path, writers) in &targets {
        assert_eq!(writers.len(), 1, "{path} written by {writers:?}");
    }
    assert!(targets.contains_key(
        "/out/dwiprep/sub-01/dwi/sub-01_dir-PA_from-T1w_to-epiref_xfm.txt"
    ));
    assert!(targets.contains_key(
        "/out/dwiprep/sub-01/fmap/sub-01_dir-AP_space-orig_desc-phasediff_fieldmap.nii.gz"
    ));
}

#[test]
fn anatomical_graph_requires_t1w() {
    let error = init_anat_preproc_graph("01", &AnatomicalInputs::default(), Path::new("/out"))
        .unwrap_err();
    assert!(error.is_data_absence());
}
