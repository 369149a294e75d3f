//! Outcome of looking up one datatype's inputs.

use crate::datatype::{Datatype, Requirement};

/// Result of a lookup that distinguishes acceptable from fatal absence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution<T> {
    /// Data was found.
    Found(T),
    /// Recommended data is missing; continue in degraded mode.
    AdvisoryMissing { datatype: Datatype },
    /// Mandatory data is missing; the unit cannot be processed.
    FatalMissing { datatype: Datatype },
}

impl<T> Resolution<Vec<T>> {
    /// Classify a (possibly empty) collection by the datatype's requirement.
    ///
    /// Optional datatypes resolve to `Found` even when empty.
    pub fn classify(datatype: Datatype, items: Vec<T>) -> Self {
        if !items.is_empty() {
            return Resolution::Found(items);
        }
        match datatype.requirement() {
            Requirement::Mandatory => Resolution::FatalMissing { datatype },
            Requirement::Recommended => Resolution::AdvisoryMissing { datatype },
            Requirement::Optional => Resolution::Found(items),
        }
    }
}

impl<T> Resolution<T> {
    pub fn is_fatal(&self) -> bool {
        matches!(self, Resolution::FatalMissing { .. })
    }

    pub fn found(self) -> Option<T> {
        match self {
            Resolution::Found(value) => Some(value),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_by_requirement() {
        let empty: Vec<u8> = Vec::new();
        assert!(Resolution::classify(Datatype::Dwi, empty.clone()).is_fatal());
        assert_eq!(
            Resolution::classify(Datatype::Fmap, empty.clone()),
            Resolution::AdvisoryMissing {
                datatype: Datatype::Fmap
            }
        );
        assert_eq!(
            Resolution::classify(Datatype::T2w, empty),
            Resolution::Found(Vec::new())
        );
        assert_eq!(
            Resolution::classify(Datatype::Dwi, vec![1]).found(),
            Some(vec![1])
        );
    }
}
