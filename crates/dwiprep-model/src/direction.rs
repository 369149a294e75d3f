//! Phase-encoding directions.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{ModelError, Result};

/// Phase-encoding direction of an EPI acquisition.
///
/// Parsed from either an anatomical label (`AP`, `pa`, ...) or a signed
/// voxel-axis code as written in `PhaseEncodingDirection` metadata
/// (`j-`, `j`, `i`, ...). Axis codes map as: `j-` = AP, `j` = PA,
/// `i` = LR, `i-` = RL, `k` = IS, `k-` = SI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Direction {
    AP,
    PA,
    LR,
    RL,
    SI,
    IS,
}

impl Direction {
    pub const ALL: [Direction; 6] = [
        Direction::AP,
        Direction::PA,
        Direction::LR,
        Direction::RL,
        Direction::SI,
        Direction::IS,
    ];

    /// Lowercase label used in keys such as `fmap_ap`.
    pub fn label(self) -> &'static str {
        match self {
            Direction::AP => "ap",
            Direction::PA => "pa",
            Direction::LR => "lr",
            Direction::RL => "rl",
            Direction::SI => "si",
            Direction::IS => "is",
        }
    }

    /// Signed voxel-axis code.
    pub fn axis_code(self) -> &'static str {
        match self {
            Direction::AP => "j-",
            Direction::PA => "j",
            Direction::LR => "i",
            Direction::RL => "i-",
            Direction::SI => "k-",
            Direction::IS => "k",
        }
    }

    /// Same axis, reversed polarity.
    pub fn opposite(self) -> Direction {
        match self {
            Direction::AP => Direction::PA,
            Direction::PA => Direction::AP,
            Direction::LR => Direction::RL,
            Direction::RL => Direction::LR,
            Direction::SI => Direction::IS,
            Direction::IS => Direction::SI,
        }
    }

    pub fn is_opposite_of(self, other: Direction) -> bool {
        self.opposite() == other
    }

    /// Fieldmap slot name (`fmap_ap`).
    pub fn fieldmap_key(self) -> String {
        format!("fmap_{}", self.label())
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Direction {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self> {
        let normalized = s.trim().to_ascii_lowercase();
        Direction::ALL
            .into_iter()
            .find(|direction| {
                direction.label() == normalized || direction.axis_code() == normalized
            })
            .ok_or_else(|| ModelError::InvalidDirection(s.to_string()))
    }
}

impl Serialize for Direction {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(self.label())
    }
}

impl<'de> Deserialize<'de> for Direction {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}
