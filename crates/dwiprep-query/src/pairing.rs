//! Fieldmap pairing and distortion-correction feasibility.
//!
//! Susceptibility distortion correction needs two b=0 images acquired with
//! opposite phase encoding. They come either from two fieldmaps with
//! opposite directions, or from one fieldmap plus a diffusion run acquired
//! in the opposite direction (reduced to its mean b=0 volume downstream).

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::process::Command;

use dwiprep_ingest::DatasetIndex;
use dwiprep_model::{Direction, EntityKey, FileBundle, FileRef};
use serde::Serialize;
use tracing::{debug, warn};

use crate::error::{QueryError, Result};

/// Metadata key holding the signed phase-encoding axis.
pub const PHASE_ENCODING_DIRECTION: &str = "PhaseEncodingDirection";

/// Looks up the phase-encoding direction of an image.
///
/// Each call is independent; implementations are not expected to cache.
pub trait PhaseEncodingSource {
    fn direction(&self, file: &FileRef) -> Result<Option<Direction>>;
}

/// Reads `PhaseEncodingDirection` from sidecar metadata, falling back to the
/// `dir` entity of the filename.
pub struct MetadataDirections<'a, I: DatasetIndex + ?Sized> {
    index: &'a I,
}

impl<'a, I: DatasetIndex + ?Sized> MetadataDirections<'a, I> {
    pub fn new(index: &'a I) -> Self {
        Self { index }
    }
}

impl<I: DatasetIndex + ?Sized> PhaseEncodingSource for MetadataDirections<'_, I> {
    fn direction(&self, file: &FileRef) -> Result<Option<Direction>> {
        let metadata = self.index.metadata(file)?;
        let code = metadata
            .get(PHASE_ENCODING_DIRECTION)
            .and_then(serde_json::Value::as_str);
        if let Some(code) = code {
            match code.parse() {
                Ok(direction) => return Ok(Some(direction)),
                Err(error) => {
                    warn!(path = %file.path.display(), %error, "ignoring metadata direction");
                }
            }
        }
        Ok(file
            .entities
            .get(EntityKey::Direction)
            .and_then(|label| label.parse().ok()))
    }
}

/// Asks the image header through `mrinfo -property PhaseEncodingDirection`.
#[derive(Debug, Clone)]
pub struct HeaderDirections {
    program: PathBuf,
}

impl Default for HeaderDirections {
    fn default() -> Self {
        Self {
            program: PathBuf::from("mrinfo"),
        }
    }
}

impl HeaderDirections {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_program(mut self, program: impl Into<PathBuf>) -> Self {
        self.program = program.into();
        self
    }
}

impl PhaseEncodingSource for HeaderDirections {
    fn direction(&self, file: &FileRef) -> Result<Option<Direction>> {
        let probe_error = |reason: String| QueryError::DirectionProbe {
            path: file.path.clone(),
            reason,
        };
        let output = Command::new(&self.program)
            .arg(&file.path)
            .args(["-property", PHASE_ENCODING_DIRECTION])
            .output()
            .map_err(|e| probe_error(format!("{}: {e}", self.program.display())))?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(probe_error(format!("{} ({})", stderr.trim(), output.status)));
        }
        let stdout = String::from_utf8_lossy(&output.stdout);
        let code = stdout.trim();
        if code.is_empty() {
            return Ok(None);
        }
        match code.parse() {
            Ok(direction) => Ok(Some(direction)),
            Err(error) => {
                warn!(path = %file.path.display(), %error, "unrecognized header direction");
                Ok(None)
            }
        }
    }
}

/// Where one side of the pairing comes from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "bundle", rename_all = "snake_case")]
pub enum PairedSource {
    /// A dedicated fieldmap acquisition.
    Fieldmap(FileBundle),
    /// A diffusion run whose mean b=0 volume stands in for a fieldmap.
    DwiReference(FileBundle),
}

impl PairedSource {
    pub fn bundle(&self) -> &FileBundle {
        match self {
            PairedSource::Fieldmap(bundle) | PairedSource::DwiReference(bundle) => bundle,
        }
    }

    pub fn is_dwi_reference(&self) -> bool {
        matches!(self, PairedSource::DwiReference(_))
    }
}

/// Fieldmap sources keyed by phase-encoding direction.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FieldmapPairing {
    entries: BTreeMap<Direction, PairedSource>,
}

impl FieldmapPairing {
    pub fn entries(&self) -> &BTreeMap<Direction, PairedSource> {
        &self.entries
    }

    pub fn get(&self, direction: Direction) -> Option<&PairedSource> {
        self.entries.get(&direction)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Slot names (`fmap_ap`, `fmap_pa`), in direction order.
    pub fn keys(&self) -> Vec<String> {
        self.entries.keys().map(|direction| direction.fieldmap_key()).collect()
    }

    /// The two opposite directions used for correction, in direction order.
    pub fn opposite_pair(&self) -> Option<(Direction, Direction)> {
        self.entries
            .keys()
            .copied()
            .find(|direction| {
                *direction < direction.opposite() && self.entries.contains_key(&direction.opposite())
            })
            .map(|direction| (direction, direction.opposite()))
    }

    /// Entries backed by dedicated fieldmap acquisitions.
    pub fn fieldmaps(&self) -> impl Iterator<Item = (Direction, &FileBundle)> {
        self.entries.iter().filter_map(|(direction, source)| match source {
            PairedSource::Fieldmap(bundle) => Some((*direction, bundle)),
            PairedSource::DwiReference(_) => None,
        })
    }

    fn single(direction: Direction, source: PairedSource) -> Self {
        Self {
            entries: BTreeMap::from([(direction, source)]),
        }
    }

    fn pair(first: (Direction, PairedSource), second: (Direction, PairedSource)) -> Self {
        Self {
            entries: BTreeMap::from([first, second]),
        }
    }
}

/// Whether the run's b=0 counterpart must be extracted and whether
/// distortion correction runs at all.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SdcDecision {
    pub extract_b0: bool,
    pub run_sdc: bool,
}

/// Pair fieldmaps by opposite phase-encoding direction.
///
/// Fieldmaps are considered in path order and only the first per direction
/// is kept. When no two fieldmaps oppose each other, the first diffusion run
/// in `dwi_runs` acquired opposite to a fieldmap is used as its counterpart.
pub fn pair<S: PhaseEncodingSource + ?Sized>(
    source: &S,
    fieldmaps: &[FileBundle],
    dwi_runs: &[FileBundle],
) -> Result<FieldmapPairing> {
    let mut sorted: Vec<&FileBundle> = fieldmaps.iter().collect();
    sorted.sort_by(|a, b| a.path().cmp(b.path()));

    let mut directed: Vec<(Direction, &FileBundle)> = Vec::new();
    for fieldmap in sorted {
        match source.direction(&fieldmap.nifti)? {
            Some(direction) if directed.iter().any(|(seen, _)| *seen == direction) => {
                debug!(
                    fieldmap = %fieldmap.path().display(),
                    direction = %direction,
                    "dropping duplicate fieldmap direction"
                );
            }
            Some(direction) => directed.push((direction, fieldmap)),
            None => warn!(
                fieldmap = %fieldmap.path().display(),
                "fieldmap has no phase-encoding direction"
            ),
        }
    }

    for (position, (direction, fieldmap)) in directed.iter().enumerate() {
        let counterpart = directed[position + 1..]
            .iter()
            .find(|(other, _)| direction.is_opposite_of(*other));
        if let Some((other, other_fieldmap)) = counterpart {
            return Ok(FieldmapPairing::pair(
                (*direction, PairedSource::Fieldmap((*fieldmap).clone())),
                (*other, PairedSource::Fieldmap((*other_fieldmap).clone())),
            ));
        }
    }

    let Some((first_direction, first_fieldmap)) = directed.first().copied() else {
        return Ok(FieldmapPairing::default());
    };

    let mut dwi_directions = Vec::with_capacity(dwi_runs.len());
    for run in dwi_runs {
        dwi_directions.push((source.direction(&run.nifti)?, run));
    }
    for (direction, fieldmap) in &directed {
        let reference = dwi_directions
            .iter()
            .find(|(run_direction, _)| *run_direction == Some(direction.opposite()));
        if let Some((_, run)) = reference {
            return Ok(FieldmapPairing::pair(
                (*direction, PairedSource::Fieldmap((*fieldmap).clone())),
                (direction.opposite(), PairedSource::DwiReference((*run).clone())),
            ));
        }
    }

    Ok(FieldmapPairing::single(
        first_direction,
        PairedSource::Fieldmap(first_fieldmap.clone()),
    ))
}

/// Decide from a pairing whether distortion correction can run.
pub fn decide_sdc_feasibility(pairing: &FieldmapPairing) -> SdcDecision {
    let run_sdc = pairing.opposite_pair().is_some();
    let extract_b0 = run_sdc && pairing.entries.values().any(PairedSource::is_dwi_reference);
    SdcDecision { extract_b0, run_sdc }
}
