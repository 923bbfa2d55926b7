use thiserror::Error;

use crate::types::{BranchType, RowGroupKind};

/// A single reason an input schema is incompatible with the reference.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaMismatch {
    #[error("branch `{branch}` is in the reference but missing from the input")]
    MissingBranch { branch: String },

    #[error("branch `{branch}` is in the input but missing from the reference")]
    UnexpectedBranch { branch: String },

    #[error("branch `{branch}` is a {actual:?} branch, expected a {expected:?} branch")]
    BranchTypeDiffers {
        branch: String,
        expected: BranchType,
        actual: BranchType,
    },

    #[error("branch `{branch}` has {actual} configuration ids, expected {expected}")]
    ConfigurationIdCount {
        branch: String,
        expected: usize,
        actual: usize,
    },

    #[error("branch `{branch}` has a configuration id that differs from the reference")]
    ConfigurationIdDiffers { branch: String },

    #[error("branch `{branch}` has {actual} lineage references, expected at most 1")]
    LineageCount { branch: String, actual: usize },

    #[error("branch `{branch}` has a lineage reference that differs from the reference")]
    LineageDiffers { branch: String },

    #[error("row group `{group}` is in the reference but missing from the input")]
    MissingRowGroup { group: RowGroupKind },
}

/// Result of merging a candidate schema into the registry.
///
/// An outcome with mismatches means nothing was applied.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MergeOutcome {
    mismatches: Vec<SchemaMismatch>,
}

impl MergeOutcome {
    pub(crate) fn new(mismatches: Vec<SchemaMismatch>) -> Self {
        Self { mismatches }
    }

    /// Returns true if the candidate was merged.
    pub fn is_compatible(&self) -> bool {
        self.mismatches.is_empty()
    }

    pub fn mismatches(&self) -> &[SchemaMismatch] {
        &self.mismatches
    }

    /// Renders every mismatch on its own line. Empty when compatible.
    pub fn diagnostic(&self) -> String {
        self.mismatches
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join("\n")
    }
}
