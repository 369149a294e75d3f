//! Step parameters.

use std::collections::BTreeMap;

use dwiprep_model::TensorMetric;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

/// Parameter bag passed verbatim to a step.
pub type Params = BTreeMap<String, Value>;

/// Parameters of the configurable steps.
///
/// Deserializing merges the given keys over [`WorkflowOptions::default`] per
/// step, so `[workflow.preproc] rpe_options = "all"` keeps `align_seepi`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "OptionOverrides")]
pub struct WorkflowOptions {
    pub denoise: Params,
    pub preproc: Params,
    pub bias_correct: Params,
    pub epi_ref: Params,
    pub phasediff: Params,
    pub tensor: Params,
    /// Tensor maps to compute and write.
    pub metrics: Vec<TensorMetric>,
}

impl Default for WorkflowOptions {
    fn default() -> Self {
        Self {
            denoise: Params::new(),
            preproc: params(json!({
                "rpe_options": "pair",
                "align_seepi": true,
                "eddy_options": " --slm=linear",
            })),
            bias_correct: params(json!({ "use_ants": true })),
            epi_ref: params(json!({ "operation": "mean", "axis": 3 })),
            phasediff: params(json!({ "axis": 3 })),
            tensor: Params::new(),
            metrics: TensorMetric::ALL.to_vec(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct OptionOverrides {
    denoise: Params,
    preproc: Params,
    bias_correct: Params,
    epi_ref: Params,
    phasediff: Params,
    tensor: Params,
    metrics: Option<Vec<TensorMetric>>,
}

impl From<OptionOverrides> for WorkflowOptions {
    fn from(overrides: OptionOverrides) -> Self {
        let mut options = WorkflowOptions::default();
        options.denoise.extend(overrides.denoise);
        options.preproc.extend(overrides.preproc);
        options.bias_correct.extend(overrides.bias_correct);
        options.epi_ref.extend(overrides.epi_ref);
        options.phasediff.extend(overrides.phasediff);
        options.tensor.extend(overrides.tensor);
        if let Some(metrics) = overrides.metrics {
            options.metrics = metrics;
        }
        options
    }
}

fn params(value: Value) -> Params {
    match value {
        Value::Object(map) => map.into_iter().collect(),
        _ => Params::new(),
    }
}
