//! Merging run graphs into one subject graph.

use dwiprep_graph::{GraphBuilder, PipelineGraph};
use tracing::debug;

use crate::error::Result;
use crate::naming::subject_graph_name;
use crate::templates::{ANAT_OUTPUTS, INPUTNODE, inputnode_of, outputnode_of};

/// Embed the anatomical graph once and every run graph beside it.
///
/// Each run's anatomical inputs are connected to the shared anatomical
/// outputs; the anatomical graph is never copied.
pub fn init_subject_graph(
    subject: &str,
    anat: Option<&PipelineGraph>,
    runs: &[PipelineGraph],
) -> Result<PipelineGraph> {
    let mut wf = GraphBuilder::new(subject_graph_name(subject));
    if let Some(anat) = anat {
        wf.add_graph(anat);
    }
    for run in runs {
        wf.add_graph(run);
        let (Some(anat), Some(inputnode)) = (anat, run.node(INPUTNODE)) else {
            continue;
        };
        let anat_out = outputnode_of(anat.name());
        let run_in = inputnode_of(run.name());
        let mut connected = 0;
        for field in ANAT_OUTPUTS.iter().filter(|field| inputnode.has_input(field)) {
            wf.connect(&anat_out, field, &run_in, field);
            connected += 1;
        }
        debug!(run = %run.name(), connected, "attached run to anatomical graph");
    }
    Ok(wf.build()?)
}
