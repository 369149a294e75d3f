//! BIDS filename parsing.
//!
//! Filenames follow `sub-<label>[_<key>-<value>...]_<suffix>.<extension>`,
//! and the datatype is the name of the enclosing directory
//! (`sub-01/ses-1/dwi/sub-01_ses-1_dwi.nii.gz`). Keys outside the entity
//! vocabulary (`task`, `echo`, ...) are skipped.

use std::path::Path;

use dwiprep_model::{EntityKey, EntityRecord, normalize_label};
use tracing::trace;

use crate::error::{IngestError, Result};

/// Split a filename at its first `.` into stem and full extension.
pub fn split_extension(name: &str) -> (&str, Option<&str>) {
    match name.split_once('.') {
        Some((stem, extension)) => (stem, Some(extension)),
        None => (name, None),
    }
}

/// Parse entities from a dataset path.
pub fn parse_entities(path: &Path) -> Result<EntityRecord> {
    let unrecognized = |reason: &str| IngestError::UnrecognizedFilename {
        path: path.to_path_buf(),
        reason: reason.to_string(),
    };
    let name = path
        .file_name()
        .and_then(|name| name.to_str())
        .ok_or_else(|| unrecognized("filename is not valid UTF-8"))?;
    let (stem, extension) = split_extension(name);
    let extension = extension
        .filter(|ext| !ext.is_empty())
        .ok_or_else(|| unrecognized("missing extension"))?;

    let mut parts: Vec<&str> = stem.split('_').collect();
    let suffix = parts
        .pop()
        .filter(|suffix| !suffix.is_empty() && !suffix.contains('-'))
        .ok_or_else(|| unrecognized("missing suffix"))?;

    let mut record = EntityRecord::new();
    for part in parts {
        let (label, value) = part
            .split_once('-')
            .ok_or_else(|| unrecognized(&format!("malformed entity '{part}'")))?;
        let Some(key) = EntityKey::from_filename_label(label) else {
            trace!(path = %path.display(), entity = label, "skipping unsupported entity");
            continue;
        };
        let value = normalize_label(key, value).map_err(|source| IngestError::InvalidEntity {
            path: path.to_path_buf(),
            source,
        })?;
        record.insert(key, value);
    }
    if record.subject().is_none() {
        return Err(unrecognized("missing subject entity"));
    }

    record.insert(EntityKey::Suffix, suffix);
    record.insert(EntityKey::Extension, extension);
    if let Some(datatype) = datatype_dir(path) {
        record.insert(EntityKey::Datatype, datatype);
    }
    Ok(record)
}

/// True when both paths sit in the same directory and share the stem before
/// the first `.` (the image and its `.json`/`.bval`/`.bvec` sidecars).
pub fn shares_stem(a: &Path, b: &Path) -> bool {
    if a.parent() != b.parent() {
        return false;
    }
    let stem = |path: &Path| {
        path.file_name()
            .and_then(|name| name.to_str())
            .map(|name| split_extension(name).0.to_string())
    };
    match (stem(a), stem(b)) {
        (Some(left), Some(right)) => left == right,
        _ => false,
    }
}

fn datatype_dir(path: &Path) -> Option<&str> {
    let parent = path.parent()?.file_name()?.to_str()?;
    if parent.is_empty() || parent.starts_with("sub-") || parent.starts_with("ses-") {
        return None;
    }
    Some(parent)
}
