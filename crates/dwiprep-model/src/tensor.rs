//! Diffusion tensor scalar maps.

use serde::{Deserialize, Serialize};

/// A map derived from the fitted diffusion tensor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TensorMetric {
    /// Fractional anisotropy.
    Fa,
    /// Apparent diffusion coefficient (mean diffusivity).
    Adc,
    /// Axial diffusivity.
    Ad,
    /// Radial diffusivity.
    Rd,
    /// Linearity.
    Cl,
    /// Planarity.
    Cp,
    /// Sphericity.
    Cs,
    /// Principal eigenvector.
    Evec,
    /// Eigenvalues.
    Eval,
}

impl TensorMetric {
    pub const ALL: [TensorMetric; 9] = [
        TensorMetric::Fa,
        TensorMetric::Adc,
        TensorMetric::Ad,
        TensorMetric::Rd,
        TensorMetric::Cl,
        TensorMetric::Cp,
        TensorMetric::Cs,
        TensorMetric::Evec,
        TensorMetric::Eval,
    ];

    /// Lowercase label, also the suffix of the derivative file.
    pub fn label(self) -> &'static str {
        match self {
            TensorMetric::Fa => "fa",
            TensorMetric::Adc => "adc",
            TensorMetric::Ad => "ad",
            TensorMetric::Rd => "rd",
            TensorMetric::Cl => "cl",
            TensorMetric::Cp => "cp",
            TensorMetric::Cs => "cs",
            TensorMetric::Evec => "evec",
            TensorMetric::Eval => "eval",
        }
    }

    /// Output port of the metric computation step (`out_fa`).
    pub fn port(self) -> String {
        format!("out_{}", self.label())
    }

    /// File written by the metric computation step (`fa.nii.gz`).
    pub fn file_name(self) -> String {
        format!("{}.nii.gz", self.label())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metric_names() {
        assert_eq!(TensorMetric::Adc.port(), "out_adc");
        assert_eq!(TensorMetric::Evec.file_name(), "evec.nii.gz");
        let json = serde_json::to_string(&TensorMetric::ALL[..2]).unwrap();
        assert_eq!(json, r#"["fa","adc"]"#);
    }
}
