//! Entity profiles of the derivatives written per run.

use dwiprep_model::{EntityKey, EntityRecord, TensorMetric};
use serde::Serialize;

use crate::error::Result;
use crate::pattern::PathPattern;

/// Naming convention for image derivatives.
pub const DERIVATIVES_PATTERN: &str = "sub-{subject}/[ses-{session}/][{datatype}/]sub-{subject}[_ses-{session}][_acq-{acquisition}][_dir-{direction}][_run-{run}][_space-{space}][_desc-{description}]_{suffix}.{extension}";

/// Naming convention for spatial transforms.
pub const TRANSFORM_PATTERN: &str = "sub-{subject}/[ses-{session}/][{datatype}/]sub-{subject}[_ses-{session}][_acq-{acquisition}][_dir-{direction}][_run-{run}]_from-{from}_to-{to}_{suffix}.{extension}";

const NATIVE_SPACE: &str = "orig";
const ANATOMICAL_SPACE: &str = "anat";

/// A kind of derivative and the entities it is written with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputProfile {
    /// Merged opposite-direction b=0 images.
    PhasediffFieldmap,
    NativeDwiPreproc,
    CoregDwiPreproc,
    NativeEpiRef,
    CoregEpiRef,
    EpiToT1wTransform,
    T1wToEpiTransform,
    NativeTensor(TensorMetric),
    CoregTensor(TensorMetric),
}

impl OutputProfile {
    /// Stem for sink node names (`ds_native_dwi_preproc`, `ds_coreg_fa`).
    pub fn name(self) -> String {
        match self {
            OutputProfile::PhasediffFieldmap => "ds_phasediff".to_string(),
            OutputProfile::NativeDwiPreproc => "ds_native_dwi_preproc".to_string(),
            OutputProfile::CoregDwiPreproc => "ds_coreg_dwi_preproc".to_string(),
            OutputProfile::NativeEpiRef => "ds_native_epi_ref".to_string(),
            OutputProfile::CoregEpiRef => "ds_coreg_epi_ref".to_string(),
            OutputProfile::EpiToT1wTransform => "ds_epi_to_t1w_aff".to_string(),
            OutputProfile::T1wToEpiTransform => "ds_t1w_to_epi_aff".to_string(),
            OutputProfile::NativeTensor(metric) => format!("ds_native_{}", metric.label()),
            OutputProfile::CoregTensor(metric) => format!("ds_coreg_{}", metric.label()),
        }
    }

    /// Entities set on every derivative of this profile.
    pub fn overrides(self) -> EntityRecord {
        let record = |datatype: &str, space: &str, description: Option<&str>, suffix: &str| {
            let mut record = EntityRecord::new()
                .with(EntityKey::Datatype, datatype)
                .with(EntityKey::Space, space)
                .with(EntityKey::Suffix, suffix);
            if let Some(description) = description {
                record.insert(EntityKey::Description, description);
            }
            record
        };
        let transform = |from: &str, to: &str| {
            EntityRecord::new()
                .with(EntityKey::Datatype, "dwi")
                .with(EntityKey::Suffix, "xfm")
                .with(EntityKey::Extension, "txt")
                .with(EntityKey::From, from)
                .with(EntityKey::To, to)
        };
        match self {
            OutputProfile::PhasediffFieldmap => {
                record("fmap", NATIVE_SPACE, Some("phasediff"), "fieldmap")
            }
            OutputProfile::NativeDwiPreproc => record("dwi", NATIVE_SPACE, Some("preproc"), "dwi"),
            OutputProfile::CoregDwiPreproc => {
                record("dwi", ANATOMICAL_SPACE, Some("preproc"), "dwi")
            }
            OutputProfile::NativeEpiRef => record("dwi", NATIVE_SPACE, Some("preproc"), "epiref"),
            OutputProfile::CoregEpiRef => {
                record("dwi", ANATOMICAL_SPACE, Some("preproc"), "epiref")
            }
            OutputProfile::EpiToT1wTransform => transform("epiref", "T1w"),
            OutputProfile::T1wToEpiTransform => transform("T1w", "epiref"),
            OutputProfile::NativeTensor(metric) => {
                record("dwi", NATIVE_SPACE, None, metric.label())
            }
            OutputProfile::CoregTensor(metric) => {
                record("dwi", ANATOMICAL_SPACE, None, metric.label())
            }
        }
    }

    /// Whether the profile fixes its own extension.
    pub fn fixed_extension(self) -> bool {
        self.overrides().contains(EntityKey::Extension)
    }

    pub fn pattern_source(self) -> &'static str {
        match self {
            OutputProfile::EpiToT1wTransform | OutputProfile::T1wToEpiTransform => {
                TRANSFORM_PATTERN
            }
            _ => DERIVATIVES_PATTERN,
        }
    }

    pub fn pattern(self) -> Result<PathPattern> {
        PathPattern::parse(self.pattern_source())
    }

    /// Base entities for a derivative of `source` written with `extension`.
    ///
    /// Space, description and transform entities of the source never carry
    /// over; the profile's overrides are applied on top by the path builder.
    /// Run-identifying entities (acquisition, direction, run) always carry
    /// over, keeping derivative paths distinct per run.
    pub fn base_entities(self, source: &EntityRecord, extension: &str) -> EntityRecord {
        let mut base = source.without(&[
            EntityKey::Space,
            EntityKey::Description,
            EntityKey::From,
            EntityKey::To,
        ]);
        base.insert(EntityKey::Extension, extension.trim_start_matches('.'));
        base
    }
}
