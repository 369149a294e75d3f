//! External steps used by the workflow templates.
//!
//! Each function returns a fresh node with the step's ports declared. Step
//! kinds are opaque to the graph layer and name the interface the executor
//! runs.

use std::path::Path;

use dwiprep_graph::{ProcessingNode, StepKind};
use dwiprep_model::TensorMetric;
use dwiprep_output::DerivativeTarget;
use serde_json::Value;

use crate::options::Params;

pub const MRCONVERT: &str = "mrtrix3.MRConvert";
pub const DWIDENOISE: &str = "mrtrix3.DWIDenoise";
pub const MRINFO: &str = "mrtrix3.MRInfo";
pub const DWIFSLPREPROC: &str = "mrtrix3.DWIPreproc";
pub const DWIBIASCORRECT: &str = "mrtrix3.DWIBiasCorrect";
pub const DWIEXTRACT: &str = "mrtrix3.DWIExtract";
pub const MRMATH: &str = "mrtrix3.MRMath";
pub const MRCAT: &str = "mrtrix3.MRCat";
pub const FIT_TENSOR: &str = "mrtrix3.FitTensor";
pub const TENSOR_METRICS: &str = "mrtrix3.TensorMetrics";
pub const MERGE: &str = "utility.Merge";
pub const APPLY_MASK: &str = "niworkflows.ApplyMask";
pub const EPI_REG: &str = "fsl.EpiReg";
pub const CONVERT_XFM: &str = "fsl.ConvertXFM";
pub const APPLY_XFM: &str = "fsl.ApplyXFM";
pub const ANAT_PREPROC: &str = "smriprep.AnatPreproc";
pub const DERIVATIVES_SINK: &str = "bids.DerivativesDataSink";

/// Format conversion; gradient and metadata inputs are optional.
pub fn mrconvert(name: &str) -> ProcessingNode {
    ProcessingNode::new(name, StepKind::new(MRCONVERT))
        .input("in_file")
        .optional_input("json_import")
        .optional_input("in_bvec")
        .optional_input("in_bval")
        .output("out_file")
        .output("out_bvec")
        .output("out_bval")
        .output("json_export")
}

pub fn denoise(name: &str, params: &Params) -> ProcessingNode {
    ProcessingNode::new(name, StepKind::new(DWIDENOISE))
        .input("in_file")
        .output("out_file")
        .output("noise")
        .params(params.clone())
}

/// Header query for the phase-encoding direction of an image.
pub fn infer_pe(name: &str) -> ProcessingNode {
    ProcessingNode::new(name, StepKind::new(MRINFO))
        .input("in_file")
        .output("pe_dir")
        .param("property", "PhaseEncodingDirection")
}

/// Motion, eddy-current and (with `in_epi`) susceptibility correction.
pub fn dwifslpreproc(name: &str, params: &Params, with_epi: bool) -> ProcessingNode {
    let node = ProcessingNode::new(name, StepKind::new(DWIFSLPREPROC))
        .input("in_file")
        .input("pe_dir")
        .output("out_file");
    if with_epi {
        node.input("in_epi").params(params.clone())
    } else {
        let mut params = params.clone();
        params.remove("align_seepi");
        params.insert("rpe_options".to_string(), Value::from("none"));
        node.params(params)
    }
}

pub fn biascorrect(name: &str, params: &Params) -> ProcessingNode {
    ProcessingNode::new(name, StepKind::new(DWIBIASCORRECT))
        .input("in_file")
        .output("out_file")
        .params(params.clone())
}

/// Extraction of the b=0 volumes.
pub fn dwiextract_b0(name: &str) -> ProcessingNode {
    ProcessingNode::new(name, StepKind::new(DWIEXTRACT))
        .input("in_file")
        .output("out_file")
        .param("bzero", true)
        .param("out_file", "b0.mif")
}

pub fn mrmath(name: &str, params: &Params) -> ProcessingNode {
    ProcessingNode::new(name, StepKind::new(MRMATH))
        .input("in_file")
        .output("out_file")
        .param("out_file", "mean_b0.mif")
        .params(params.clone())
}

/// Collects `in1..inN` into one list.
pub fn merge(name: &str, count: usize) -> ProcessingNode {
    (1..=count)
        .fold(ProcessingNode::new(name, StepKind::new(MERGE)), |node, index| {
            node.input(format!("in{index}"))
        })
        .output("out")
        .param("numinputs", count)
}

pub fn mrcat(name: &str, params: &Params) -> ProcessingNode {
    ProcessingNode::new(name, StepKind::new(MRCAT))
        .input("in_files")
        .output("out_file")
        .params(params.clone())
}

pub fn fit_tensor(name: &str, params: &Params) -> ProcessingNode {
    ProcessingNode::new(name, StepKind::new(FIT_TENSOR))
        .input("in_file")
        .output("out_file")
        .params(params.clone())
}

/// One output port per metric, written to `{metric}.nii.gz`.
pub fn tensor_metrics(name: &str, metrics: &[TensorMetric]) -> ProcessingNode {
    metrics.iter().fold(
        ProcessingNode::new(name, StepKind::new(TENSOR_METRICS)).input("in_file"),
        |node, metric| node.output(metric.port()).param(metric.port(), metric.file_name()),
    )
}

pub fn apply_mask(name: &str) -> ProcessingNode {
    ProcessingNode::new(name, StepKind::new(APPLY_MASK))
        .input("in_file")
        .input("in_mask")
        .output("out_file")
}

pub fn epi_reg(name: &str) -> ProcessingNode {
    ProcessingNode::new(name, StepKind::new(EPI_REG))
        .input("epi")
        .input("t1_brain")
        .input("t1_head")
        .output("epi2str_mat")
        .output("out_file")
}

pub fn invert_xfm(name: &str) -> ProcessingNode {
    ProcessingNode::new(name, StepKind::new(CONVERT_XFM))
        .input("in_file")
        .output("out_file")
        .param("invert_xfm", true)
}

pub fn apply_xfm(name: &str) -> ProcessingNode {
    ProcessingNode::new(name, StepKind::new(APPLY_XFM))
        .input("in_file")
        .input("in_matrix_file")
        .input("reference")
        .output("out_file")
        .param("apply_xfm", true)
}

/// Structural preprocessing, treated as a single opaque step.
pub fn anat_preproc(name: &str, outputs: &[&str]) -> ProcessingNode {
    outputs.iter().fold(
        ProcessingNode::new(name, StepKind::new(ANAT_PREPROC))
            .input("t1w")
            .optional_input("t2w")
            .input("subject_id")
            .optional_input("output_dir"),
        |node, output| node.output(*output),
    )
}

/// Copies `in_file` to a derivative target.
pub fn derivatives_sink(name: &str, target: &DerivativeTarget, source_file: &Path) -> ProcessingNode {
    let entities: serde_json::Map<String, Value> = target
        .entities
        .iter()
        .map(|(key, value)| (key.as_str().to_string(), Value::from(value)))
        .collect();
    ProcessingNode::new(name, StepKind::new(DERIVATIVES_SINK))
        .input("in_file")
        .output("out_file")
        .param("out_path", path_value(&target.absolute))
        .param("relative_path", path_value(&target.relative))
        .param("source_file", path_value(source_file))
        .param("entities", Value::Object(entities))
}

pub(crate) fn path_value(path: &Path) -> Value {
    Value::from(path.display().to_string())
}
