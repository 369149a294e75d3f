//! Tests for derivative path building.

use dwiprep_model::{EntityKey, EntityRecord, TensorMetric};
use dwiprep_output::{
    DERIVATIVES_PATTERN, OutputProfile, PathBuildError, PathBuilder, PathPattern, build_path,
};
use proptest::prelude::*;

fn simple_pattern() -> PathPattern {
    PathPattern::parse("sub-{subject}[_ses-{session}]_{suffix}.{extension}").expect("pattern")
}

fn dwi_entities() -> EntityRecord {
    EntityRecord::from([
        (EntityKey::Subject, "01"),
        (EntityKey::Suffix, "dwi"),
        (EntityKey::Extension, "nii.gz"),
    ])
}

#[test]
fn optional_session_segment_is_dropped_when_absent() {
    let pattern = simple_pattern();
    let path = build_path(&dwi_entities(), &EntityRecord::new(), &pattern).expect("path");
    assert_eq!(path.to_str(), Some("sub-01_dwi.nii.gz"));

    let overrides = EntityRecord::from([(EntityKey::Session, "1")]);
    let path = build_path(&dwi_entities(), &overrides, &pattern).expect("path");
    assert_eq!(path.to_str(), Some("sub-01_ses-1_dwi.nii.gz"));
}

#[test]
fn empty_value_counts_as_absent() {
    let base = dwi_entities().with(EntityKey::Session, "");
    let path = build_path(&base, &EntityRecord::new(), &simple_pattern()).expect("path");
    assert_eq!(path.to_str(), Some("sub-01_dwi.nii.gz"));
}

#[test]
fn missing_required_entity_is_reported() {
    let base = dwi_entities().without(&[EntityKey::Subject]);
    let error = build_path(&base, &EntityRecord::new(), &simple_pattern()).unwrap_err();
    assert!(matches!(
        error,
        PathBuildError::MissingEntity {
            entity: EntityKey::Subject,
            ..
        }
    ));
}

#[test]
fn overrides_win_and_unused_keys_are_ignored() {
    let base = dwi_entities().with(EntityKey::Space, "T1w");
    let overrides = EntityRecord::from([(EntityKey::Suffix, "epiref")]);
    let path = build_path(&base, &overrides, &simple_pattern()).expect("path");
    assert_eq!(path.to_str(), Some("sub-01_epiref.nii.gz"));
}

#[test]
fn builder_creates_parent_directories_idempotently() {
    let dir = tempfile::tempdir().expect("tempdir");
    let builder = PathBuilder::new(dir.path().join("dwiprep"));
    let profile = OutputProfile::NativeDwiPreproc;
    let source = dwi_entities()
        .with(EntityKey::Session, "1")
        .with(EntityKey::Direction, "AP");
    let base = profile.base_entities(&source, ".nii.gz");
    let pattern = profile.pattern().expect("pattern");

    let first = builder
        .build(&base, &profile.overrides(), &pattern)
        .expect("first build");
    let second = builder
        .build(&base, &profile.overrides(), &pattern)
        .expect("second build");

    assert_eq!(first, second);
    assert_eq!(
        first.relative.to_str(),
        Some("sub-01/ses-1/dwi/sub-01_ses-1_dir-AP_space-orig_desc-preproc_dwi.nii.gz")
    );
    assert!(first.absolute.parent().expect("parent").is_dir());
}

#[test]
fn planning_builder_does_not_touch_disk() {
    let dir = tempfile::tempdir().expect("tempdir");
    let builder = PathBuilder::new(dir.path().join("dwiprep")).with_create_dirs(false);
    let profile = OutputProfile::CoregTensor(TensorMetric::Fa);
    let base = profile.base_entities(&dwi_entities(), "nii.gz");
    let target = builder
        .build(&base, &profile.overrides(), &profile.pattern().expect("pattern"))
        .expect("build");

    assert_eq!(
        target.relative.to_str(),
        Some("sub-01/dwi/sub-01_space-anat_fa.nii.gz")
    );
    assert!(!dir.path().join("dwiprep").exists());
}

#[test]
fn transform_profiles_keep_direction_and_fix_extension() {
    let profile = OutputProfile::EpiToT1wTransform;
    let source = dwi_entities().with(EntityKey::Direction, "PA");
    let base = profile.base_entities(&source, "nii.gz");
    let path = build_path(&base, &profile.overrides(), &profile.pattern().expect("pattern"))
        .expect("path");
    assert_eq!(
        path.to_str(),
        Some("sub-01/dwi/sub-01_dir-PA_from-epiref_to-T1w_xfm.txt")
    );
}

#[test]
fn phasediff_lands_in_fmap_directory_named_after_its_run() {
    let profile = OutputProfile::PhasediffFieldmap;
    let source = dwi_entities()
        .with(EntityKey::Direction, "AP")
        .with(EntityKey::Acquisition, "64grad");
    let base = profile.base_entities(&source, "nii.gz");
    let path = build_path(&base, &profile.overrides(), &profile.pattern().expect("pattern"))
        .expect("path");
    assert_eq!(
        path.to_str(),
        Some("sub-01/fmap/sub-01_acq-64grad_dir-AP_space-orig_desc-phasediff_fieldmap.nii.gz")
    );
}

fn label() -> impl Strategy<Value = Option<String>> {
    prop::option::of("[A-Za-z0-9]{1,6}")
}

proptest! {
    #[test]
    fn default_pattern_never_doubles_separators(
        session in label(),
        acquisition in label(),
        direction in label(),
        run in label(),
        space in label(),
    ) {
        let pattern = PathPattern::parse(DERIVATIVES_PATTERN).expect("pattern");
        let mut entities = dwi_entities().with(EntityKey::Datatype, "dwi");
        for (key, value) in [
            (EntityKey::Session, session),
            (EntityKey::Acquisition, acquisition),
            (EntityKey::Direction, direction),
            (EntityKey::Run, run),
            (EntityKey::Space, space),
        ] {
            if let Some(value) = value {
                entities.insert(key, value);
            }
        }
        let rendered = pattern.render(&entities).expect("render");
        prop_assert!(!rendered.contains("//"));
        prop_assert!(!rendered.contains("__"));
        prop_assert!(rendered.starts_with("sub-01/"));
        prop_assert!(rendered.ends_with("_dwi.nii.gz"));
    }
}
