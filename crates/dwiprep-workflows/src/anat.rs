//! Structural preprocessing graph, one per subject.

use std::path::Path;

use dwiprep_graph::{GraphBuilder, PipelineGraph, ProcessingNode};
use dwiprep_model::FileBundle;
use dwiprep_query::AnatomicalInputs;
use serde_json::Value;
use tracing::info;

use crate::catalog::{self, path_value};
use crate::error::{Result, WorkflowError};
use crate::templates::{ANAT_OUTPUTS, INPUTNODE, OUTPUTNODE};

pub const ANAT_PREPROC_WF: &str = "anat_preproc_wf";

/// Build the anatomical graph fed with every T1w/T2w image of `subject`.
pub fn init_anat_preproc_graph(
    subject: &str,
    inputs: &AnatomicalInputs,
    output_dir: &Path,
) -> Result<PipelineGraph> {
    if !inputs.has_t1w() {
        return Err(WorkflowError::MissingAnatomical {
            subject: subject.to_string(),
        });
    }

    let fields = ["t1w", "t2w", "subject_id", "output_dir"];
    let mut inputnode = ProcessingNode::identity(INPUTNODE, &fields)
        .bind("t1w", paths(&inputs.t1w))
        .bind("subject_id", format!("sub-{subject}"))
        .bind("output_dir", path_value(output_dir));
    if !inputs.t2w.is_empty() {
        inputnode = inputnode.bind("t2w", paths(&inputs.t2w));
    }

    let mut wf = GraphBuilder::new(ANAT_PREPROC_WF);
    wf.add_node(inputnode)
        .add_node(catalog::anat_preproc("anat_preproc", &ANAT_OUTPUTS))
        .add_node(ProcessingNode::identity(OUTPUTNODE, &ANAT_OUTPUTS))
        .connect_many(
            INPUTNODE,
            "anat_preproc",
            &[
                ("t1w", "t1w"),
                ("t2w", "t2w"),
                ("subject_id", "subject_id"),
                ("output_dir", "output_dir"),
            ],
        );
    for field in ANAT_OUTPUTS {
        wf.connect("anat_preproc", field, OUTPUTNODE, field);
    }

    let graph = wf.build()?;
    info!(
        subject,
        t1w = inputs.t1w.len(),
        t2w = inputs.t2w.len(),
        "built anatomical graph"
    );
    Ok(graph)
}

fn paths(bundles: &[FileBundle]) -> Value {
    Value::Array(bundles.iter().map(|bundle| path_value(bundle.path())).collect())
}
