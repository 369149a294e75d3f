//! Sub-graph templates.
//!
//! Every template is a graph with an identity `inputnode` and `outputnode`,
//! built fresh on each call. Parents embed them with
//! [`GraphBuilder::add_graph`] and wire `{template}.inputnode` /
//! `{template}.outputnode` ports.

use dwiprep_graph::{GraphBuilder, PipelineGraph, ProcessingNode, Result};
use dwiprep_model::TensorMetric;

use crate::catalog;
use crate::options::WorkflowOptions;

pub const CONVERSION_WF: &str = "mif_conversion_wf";
pub const EPI_REF_WF: &str = "epi_reference_wf";
pub const PREPROCESSED_EPI_REF_WF: &str = "preprocessed_epi_ref_wf";
pub const PHASEDIFF_WF: &str = "phasediff_prep_wf";
pub const PREPROCESS_WF: &str = "preprocess_wf";
pub const NII_CONVERSION_WF: &str = "nii_conversion_wf";
pub const TENSOR_WF: &str = "tensor_estimation_wf";
pub const EPI_REG_WF: &str = "epi_reg_wf";
pub const APPLY_TRANSFORM_WF: &str = "apply_transform_wf";

pub const INPUTNODE: &str = "inputnode";
pub const OUTPUTNODE: &str = "outputnode";

/// Outputs of the structural preprocessing graph, also inputs of every
/// coregistered run graph.
pub const ANAT_OUTPUTS: [&str; 12] = [
    "t1w_preproc",
    "t1w_mask",
    "t1w_dseg",
    "t1w_aseg",
    "t1w_aparc",
    "t1w_tpms",
    "template",
    "anat2std_xfm",
    "std2anat_xfm",
    "subjects_dir",
    "t1w2fsnative_xfm",
    "fsnative2t1w_xfm",
];

/// `{template}.inputnode`
pub fn inputnode_of(template: &str) -> String {
    format!("{template}.{INPUTNODE}")
}

/// `{template}.outputnode`
pub fn outputnode_of(template: &str) -> String {
    format!("{template}.{OUTPUTNODE}")
}

/// Conversion of the run and the given fieldmap slots to MRtrix format.
pub fn init_conversion_wf(fieldmap_keys: &[String]) -> Result<PipelineGraph> {
    let mut input_fields = vec!["dwi_file", "in_bvec", "in_bval", "dwi_json"];
    let json_keys: Vec<String> = fieldmap_keys.iter().map(|key| format!("{key}_json")).collect();
    input_fields.extend(fieldmap_keys.iter().map(String::as_str));
    input_fields.extend(json_keys.iter().map(String::as_str));
    let mut output_fields = vec!["dwi_file"];
    output_fields.extend(fieldmap_keys.iter().map(String::as_str));

    let mut wf = GraphBuilder::new(CONVERSION_WF);
    wf.add_node(ProcessingNode::identity(INPUTNODE, &input_fields))
        .add_node(ProcessingNode::identity(OUTPUTNODE, &output_fields))
        .add_node(catalog::mrconvert("dwi_conversion"))
        .connect_many(
            INPUTNODE,
            "dwi_conversion",
            &[
                ("dwi_file", "in_file"),
                ("dwi_json", "json_import"),
                ("in_bvec", "in_bvec"),
                ("in_bval", "in_bval"),
            ],
        )
        .connect("dwi_conversion", "out_file", OUTPUTNODE, "dwi_file");
    for (key, json_key) in fieldmap_keys.iter().zip(&json_keys) {
        let node = format!("{key}_conversion");
        wf.add_node(catalog::mrconvert(&node))
            .connect_many(
                INPUTNODE,
                &node,
                &[(key.as_str(), "in_file"), (json_key.as_str(), "json_import")],
            )
            .connect(&node, "out_file", OUTPUTNODE, key);
    }
    wf.build()
}

/// Mean b=0 reference image of a diffusion series.
pub fn init_epi_ref_wf(options: &WorkflowOptions) -> Result<PipelineGraph> {
    let mut wf = GraphBuilder::new(EPI_REF_WF);
    wf.add_node(ProcessingNode::identity(INPUTNODE, &["dwi_file"]))
        .add_node(ProcessingNode::identity(OUTPUTNODE, &["epi_ref_file"]))
        .add_node(catalog::dwiextract_b0("dwiextract"))
        .add_node(catalog::mrmath("mrmath", &options.epi_ref))
        .connect(INPUTNODE, "dwi_file", "dwiextract", "in_file")
        .connect("dwiextract", "out_file", "mrmath", "in_file")
        .connect("mrmath", "out_file", OUTPUTNODE, "epi_ref_file");
    wf.build()
}

/// Concatenation of two opposite-direction b=0 images.
pub fn init_phasediff_wf(options: &WorkflowOptions, keys: [&str; 2]) -> Result<PipelineGraph> {
    let mut wf = GraphBuilder::new(PHASEDIFF_WF);
    wf.add_node(ProcessingNode::identity(INPUTNODE, &keys))
        .add_node(ProcessingNode::identity(OUTPUTNODE, &["merged_phasediff"]))
        .add_node(catalog::merge("merge_files", 2))
        .add_node(catalog::mrcat("mrcat", &options.phasediff))
        .connect_many(INPUTNODE, "merge_files", &[(keys[0], "in1"), (keys[1], "in2")])
        .connect("merge_files", "out", "mrcat", "in_files")
        .connect("mrcat", "out_file", OUTPUTNODE, "merged_phasediff");
    wf.build()
}

/// Denoising, eddy/motion correction and bias-field correction.
///
/// With `sdc` the merged phasediff image feeds distortion correction.
pub fn init_preprocess_wf(options: &WorkflowOptions, sdc: bool) -> Result<PipelineGraph> {
    let inputs: &[&str] = if sdc {
        &["dwi_file", "merged_phasediff"]
    } else {
        &["dwi_file"]
    };
    let mut wf = GraphBuilder::new(PREPROCESS_WF);
    wf.add_node(ProcessingNode::identity(INPUTNODE, inputs))
        .add_node(ProcessingNode::identity(OUTPUTNODE, &["dwi_preproc"]))
        .add_node(catalog::denoise("denoise", &options.denoise))
        .add_node(catalog::infer_pe("infer_pe"))
        .add_node(catalog::dwifslpreproc("dwipreproc", &options.preproc, sdc))
        .add_node(catalog::biascorrect("biascorrect", &options.bias_correct))
        .connect(INPUTNODE, "dwi_file", "denoise", "in_file")
        .connect("denoise", "out_file", "infer_pe", "in_file")
        .connect("denoise", "out_file", "dwipreproc", "in_file")
        .connect("infer_pe", "pe_dir", "dwipreproc", "pe_dir")
        .connect("dwipreproc", "out_file", "biascorrect", "in_file")
        .connect("biascorrect", "out_file", OUTPUTNODE, "dwi_preproc");
    if sdc {
        wf.connect(INPUTNODE, "merged_phasediff", "dwipreproc", "in_epi");
    }
    wf.build()
}

/// Conversion of the preprocessed series and its reference back to NIfTI.
pub fn init_nii_conversion_wf() -> Result<PipelineGraph> {
    let mut wf = GraphBuilder::new(NII_CONVERSION_WF);
    wf.add_node(ProcessingNode::identity(INPUTNODE, &["dwi_file", "epi_ref"]))
        .add_node(ProcessingNode::identity(
            OUTPUTNODE,
            &["dwi_file", "dwi_bvec", "dwi_bval", "dwi_json", "epi_ref_file", "epi_ref_json"],
        ))
        .add_node(
            catalog::mrconvert("preproc_conversion")
                .param("out_file", "dwi.nii.gz")
                .param("out_bvec", "dwi.bvec")
                .param("out_bval", "dwi.bval")
                .param("json_export", "dwi.json"),
        )
        .add_node(
            catalog::mrconvert("preproc_epi_ref_conversion")
                .param("out_file", "epiref.nii.gz")
                .param("json_export", "epiref.json"),
        )
        .connect(INPUTNODE, "dwi_file", "preproc_conversion", "in_file")
        .connect(INPUTNODE, "epi_ref", "preproc_epi_ref_conversion", "in_file")
        .connect_many(
            "preproc_conversion",
            OUTPUTNODE,
            &[
                ("out_file", "dwi_file"),
                ("out_bvec", "dwi_bvec"),
                ("out_bval", "dwi_bval"),
                ("json_export", "dwi_json"),
            ],
        )
        .connect_many(
            "preproc_epi_ref_conversion",
            OUTPUTNODE,
            &[("out_file", "epi_ref_file"), ("json_export", "epi_ref_json")],
        );
    wf.build()
}

/// Tensor fit and the requested scalar maps, one output field per metric.
pub fn init_tensor_wf(options: &WorkflowOptions) -> Result<PipelineGraph> {
    let fields: Vec<&str> = options.metrics.iter().map(|metric| metric.label()).collect();
    let mut wf = GraphBuilder::new(TENSOR_WF);
    wf.add_node(ProcessingNode::identity(INPUTNODE, &["dwi_file"]))
        .add_node(ProcessingNode::identity(OUTPUTNODE, &fields))
        .add_node(catalog::fit_tensor("fit_tensor", &options.tensor))
        .add_node(catalog::tensor_metrics("tensor2metric", &options.metrics))
        .connect(INPUTNODE, "dwi_file", "fit_tensor", "in_file")
        .connect("fit_tensor", "out_file", "tensor2metric", "in_file");
    for metric in &options.metrics {
        wf.connect("tensor2metric", &metric.port(), OUTPUTNODE, metric.label());
    }
    wf.build()
}

/// Registration of the EPI reference to the skull-stripped T1w image.
pub fn init_epireg_wf() -> Result<PipelineGraph> {
    let mut wf = GraphBuilder::new(EPI_REG_WF);
    wf.add_node(ProcessingNode::identity(INPUTNODE, &["in_file", "t1w_brain", "t1w_head"]))
        .add_node(ProcessingNode::identity(
            OUTPUTNODE,
            &["epi_to_t1w_aff", "t1w_to_epi_aff", "epi_to_t1w"],
        ))
        .add_node(catalog::epi_reg("epi_reg"))
        .add_node(catalog::invert_xfm("invert_xfm"))
        .connect_many(
            INPUTNODE,
            "epi_reg",
            &[("t1w_brain", "t1_brain"), ("t1w_head", "t1_head"), ("in_file", "epi")],
        )
        .connect("epi_reg", "epi2str_mat", "invert_xfm", "in_file")
        .connect_many(
            "epi_reg",
            OUTPUTNODE,
            &[("epi2str_mat", "epi_to_t1w_aff"), ("out_file", "epi_to_t1w")],
        )
        .connect("invert_xfm", "out_file", OUTPUTNODE, "t1w_to_epi_aff");
    wf.build()
}

/// Resampling of each field into T1w space.
pub fn init_apply_transform_wf(fields: &[&str]) -> Result<PipelineGraph> {
    let mut input_fields = fields.to_vec();
    input_fields.extend(["epi_to_t1w_aff", "t1w_brain"]);

    let mut wf = GraphBuilder::new(APPLY_TRANSFORM_WF);
    wf.add_node(ProcessingNode::identity(INPUTNODE, &input_fields))
        .add_node(ProcessingNode::identity(OUTPUTNODE, fields));
    for field in fields {
        let node = format!("apply_transform_{field}");
        wf.add_node(catalog::apply_xfm(&node))
            .connect_many(
                INPUTNODE,
                &node,
                &[
                    (*field, "in_file"),
                    ("epi_to_t1w_aff", "in_matrix_file"),
                    ("t1w_brain", "reference"),
                ],
            )
            .connect(&node, "out_file", OUTPUTNODE, field);
    }
    wf.build()
}

/// Fields resampled by [`init_apply_transform_wf`] for a run.
pub fn transformed_fields(metrics: &[TensorMetric]) -> Vec<&'static str> {
    std::iter::once("dwi_file")
        .chain(metrics.iter().map(|metric| metric.label()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_templates_are_fully_wired() {
        let options = WorkflowOptions::default();
        let keys = vec!["fmap_ap".to_string(), "fmap_pa".to_string()];
        let graphs = [
            init_conversion_wf(&keys).unwrap(),
            init_epi_ref_wf(&options).unwrap(),
            init_phasediff_wf(&options, ["fmap_ap", "fmap_pa"]).unwrap(),
            init_preprocess_wf(&options, true).unwrap(),
            init_preprocess_wf(&options, false).unwrap(),
            init_nii_conversion_wf().unwrap(),
            init_tensor_wf(&options).unwrap(),
            init_epireg_wf().unwrap(),
            init_apply_transform_wf(&transformed_fields(&options.metrics)).unwrap(),
        ];
        for graph in &graphs {
            assert!(graph.unresolved_inputs().is_empty(), "{} is not fully wired", graph.name());
        }
    }

    #[test]
    fn test_preprocess_without_sdc_has_no_epi_input() {
        let graph = init_preprocess_wf(&WorkflowOptions::default(), false).unwrap();
        let preproc = graph.node("dwipreproc").unwrap();
        assert!(!preproc.has_input("in_epi"));
        assert_eq!(preproc.param_values()["rpe_options"], "none");
    }

    #[test]
    fn test_conversion_covers_present_fieldmaps_only() {
        let graph = init_conversion_wf(&["fmap_ap".to_string()]).unwrap();
        assert!(graph.contains("fmap_ap_conversion"));
        assert!(!graph.contains("fmap_pa_conversion"));
    }
}
