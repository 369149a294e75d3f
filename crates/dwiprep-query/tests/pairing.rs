//! Integration tests for fieldmap pairing.

use dwiprep_ingest::{InMemoryIndex, parse_entities};
use dwiprep_model::{Direction, FileBundle, FileRef};
use dwiprep_query::{
    HeaderDirections, MetadataDirections, PhaseEncodingSource, QueryError, SdcDecision,
    decide_sdc_feasibility, pair,
};
use serde_json::json;

fn bundle(path: &str) -> FileBundle {
    let path = std::path::Path::new("/bids").join(path);
    let entities = parse_entities(&path).expect("parse entities");
    FileBundle::new(FileRef::new(path, entities))
}

const FMAP_AP: &str = "sub-01/fmap/sub-01_dir-AP_epi.nii.gz";
const FMAP_PA: &str = "sub-01/fmap/sub-01_dir-PA_epi.nii.gz";
const DWI_AP: &str = "sub-01/dwi/sub-01_dir-AP_dwi.nii.gz";
const DWI_PA: &str = "sub-01/dwi/sub-01_dir-PA_dwi.nii.gz";

#[test]
fn opposite_fieldmaps_pair_in_any_order() {
    let index = InMemoryIndex::new("/bids");
    let source = MetadataDirections::new(&index);
    let forward = pair(&source, &[bundle(FMAP_AP), bundle(FMAP_PA)], &[]).expect("pair");
    let backward = pair(&source, &[bundle(FMAP_PA), bundle(FMAP_AP)], &[]).expect("pair");
    assert_eq!(forward.keys(), vec!["fmap_ap", "fmap_pa"]);
    assert_eq!(forward, backward);
    assert_eq!(
        decide_sdc_feasibility(&forward),
        SdcDecision {
            extract_b0: false,
            run_sdc: true
        }
    );
}

#[test]
fn single_fieldmap_uses_opposite_dwi() {
    let index = InMemoryIndex::new("/bids");
    let source = MetadataDirections::new(&index);
    let pairing = pair(&source, &[bundle(FMAP_AP)], &[bundle(DWI_AP), bundle(DWI_PA)])
        .expect("pair");
    assert_eq!(pairing.keys(), vec!["fmap_ap", "fmap_pa"]);
    let reference = pairing.get(Direction::PA).expect("pa entry");
    assert!(reference.is_dwi_reference());
    assert_eq!(reference.bundle().file_name(), Some("sub-01_dir-PA_dwi.nii.gz"));
    let decision = decide_sdc_feasibility(&pairing);
    assert!(decision.extract_b0);
    assert!(decision.run_sdc);
}

#[test]
fn single_fieldmap_without_counterpart_disables_sdc() {
    let index = InMemoryIndex::new("/bids");
    let source = MetadataDirections::new(&index);
    let pairing = pair(&source, &[bundle(FMAP_AP)], &[bundle(DWI_AP)]).expect("pair");
    assert_eq!(pairing.keys(), vec!["fmap_ap"]);
    assert_eq!(decide_sdc_feasibility(&pairing), SdcDecision::default());
}

#[test]
fn no_fieldmaps_disables_sdc() {
    let index = InMemoryIndex::new("/bids");
    let source = MetadataDirections::new(&index);
    let pairing = pair(&source, &[], &[bundle(DWI_PA)]).expect("pair");
    assert!(pairing.is_empty());
    assert_eq!(decide_sdc_feasibility(&pairing), SdcDecision::default());
}

#[test]
fn duplicate_direction_keeps_first_path() {
    let index = InMemoryIndex::new("/bids");
    let source = MetadataDirections::new(&index);
    let fieldmaps = [
        bundle("sub-01/fmap/sub-01_dir-AP_run-2_epi.nii.gz"),
        bundle(FMAP_PA),
        bundle("sub-01/fmap/sub-01_dir-AP_run-1_epi.nii.gz"),
    ];
    let pairing = pair(&source, &fieldmaps, &[]).expect("pair");
    let kept = pairing.get(Direction::AP).expect("ap entry").bundle();
    assert_eq!(kept.file_name(), Some("sub-01_dir-AP_run-1_epi.nii.gz"));
    assert_eq!(pairing.entries().len(), 2);
}

#[test]
fn metadata_direction_wins_over_filename() {
    let index = InMemoryIndex::new("/bids")
        .with_metadata(FMAP_AP, json!({"PhaseEncodingDirection": "j"}))
        .expect("metadata");
    let source = MetadataDirections::new(&index);
    let direction = source.direction(&bundle(FMAP_AP).nifti).expect("direction");
    assert_eq!(direction, Some(Direction::PA));

    let unlabeled = bundle("sub-01/fmap/sub-01_epi.nii.gz");
    assert_eq!(source.direction(&unlabeled.nifti).expect("direction"), None);
}

#[test]
fn header_lookup_reports_missing_tool() {
    let source = HeaderDirections::new().with_program("/nonexistent/bin/mrinfo");
    let result = source.direction(&bundle(DWI_AP).nifti);
    assert!(matches!(result, Err(QueryError::DirectionProbe { .. })));
}
