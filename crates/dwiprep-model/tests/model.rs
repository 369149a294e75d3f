use std::collections::BTreeMap;

use dwiprep_model::{
    Datatype, Direction, EntityFilter, EntityKey, EntityRecord, FileBundle, FileRef, SessionKey,
    SidecarRole,
};

fn dwi_record() -> EntityRecord {
    EntityRecord::from([
        (EntityKey::Subject, "01"),
        (EntityKey::Session, "1"),
        (EntityKey::Datatype, "dwi"),
        (EntityKey::Direction, "AP"),
        (EntityKey::Suffix, "dwi"),
        (EntityKey::Extension, "nii.gz"),
    ])
}

#[test]
fn merged_overrides_win() {
    let base = dwi_record();
    let overrides = EntityRecord::from([
        (EntityKey::Space, "orig"),
        (EntityKey::Suffix, "epiref"),
    ]);
    let merged = base.merged(&overrides);
    assert_eq!(merged.suffix(), Some("epiref"));
    assert_eq!(merged.get(EntityKey::Space), Some("orig"));
    assert_eq!(merged.subject(), Some("01"));
    assert_eq!(base.suffix(), Some("dwi"));
}

#[test]
fn without_drops_keys() {
    let record = dwi_record().without(&[EntityKey::Direction, EntityKey::Run]);
    assert!(!record.contains(EntityKey::Direction));
    assert_eq!(record.len(), 5);
}

#[test]
fn default_filters_select_datatypes() {
    let record = dwi_record();
    assert!(Datatype::Dwi.default_filter().accepts(&record));
    assert!(!Datatype::Fmap.default_filter().accepts(&record));
    assert!(!Datatype::T1w.default_filter().accepts(&record));
}

#[test]
fn user_filter_merges_over_defaults() {
    let user = EntityFilter::new().with(EntityKey::Suffix, "sbref");
    let merged = Datatype::Dwi.default_filter().merged(&user);
    let sbref = dwi_record().with(EntityKey::Suffix, "sbref");
    assert!(merged.accepts(&sbref));
    assert!(!merged.accepts(&dwi_record()));
}

#[test]
fn filter_requires_constrained_key() {
    let filter = EntityFilter::new().with(EntityKey::Acquisition, "64dir");
    assert!(!filter.accepts(&dwi_record()));
    assert!(filter.accepts(&dwi_record().with(EntityKey::Acquisition, "64dir")));
}

#[test]
fn filter_deserializes_from_json() {
    let json = r#"{"acq": "64dir", "extension": [".nii", "nii.gz"]}"#;
    let filter: EntityFilter = serde_json::from_str(json).expect("parse filter");
    let record = dwi_record().with(EntityKey::Acquisition, "64dir");
    assert!(filter.accepts(&record));
}

#[test]
fn record_serializes_with_long_names() {
    let record = EntityRecord::from([(EntityKey::Subject, "01"), (EntityKey::Description, "preproc")]);
    let json = serde_json::to_string(&record).expect("serialize record");
    assert_eq!(json, r#"{"subject":"01","description":"preproc"}"#);
}

#[test]
fn direction_keys() {
    assert_eq!(Direction::AP.fieldmap_key(), "fmap_ap");
    assert_eq!(Direction::PA.fieldmap_key(), "fmap_pa");
    assert_eq!(Direction::AP.opposite(), Direction::PA);
}

#[test]
fn bundle_attaches_sidecars() {
    let nifti = FileRef::new("sub-01/dwi/sub-01_dwi.nii.gz", dwi_record());
    let mut bundle = FileBundle::new(nifti);
    assert!(!bundle.has_gradients());
    bundle.attach(SidecarRole::Bval, "sub-01/dwi/sub-01_dwi.bval".into());
    bundle.attach(SidecarRole::Bvec, "sub-01/dwi/sub-01_dwi.bvec".into());
    assert!(bundle.has_gradients());
    assert_eq!(bundle.file_name(), Some("sub-01_dwi.nii.gz"));
    assert!(bundle.sidecar(SidecarRole::Json).is_none());
}

#[test]
fn session_keys_serialize_as_map_keys() {
    let mut map = BTreeMap::new();
    map.insert(SessionKey::Session("1".to_string()), 1);
    map.insert(SessionKey::Sessionless, 2);
    let json = serde_json::to_string(&map).expect("serialize map");
    assert_eq!(json, r#"{"ses-1":1,"single-session":2}"#);
    let round: BTreeMap<SessionKey, i32> = serde_json::from_str(&json).expect("deserialize map");
    assert_eq!(round, map);
}
