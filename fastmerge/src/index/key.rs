use std::fmt;

use serde::{Deserialize, Serialize};

use crate::bail;
use crate::error::{ErrorKind, MergeResult};
use crate::types::{Row, RowGroupKind};

/// Two-part ordering key of an index entry.
///
/// `major` is always the outer-interval (run) id. `minor` is the innermost id of the indexed
/// group, or zero for groups keyed by run alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct IndexKey {
    pub major: u64,
    pub minor: u64,
}

impl IndexKey {
    pub fn new(major: u64, minor: u64) -> Self {
        Self { major, minor }
    }
}

impl fmt::Display for IndexKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.major, self.minor)
    }
}

/// Which identifying sub-columns key the index of a row group.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexSpec {
    group: RowGroupKind,
    major: &'static str,
    minor: Option<&'static str>,
}

impl IndexSpec {
    pub const EVENTS: IndexSpec = IndexSpec {
        group: RowGroupKind::Events,
        major: "run",
        minor: Some("event"),
    };

    pub const LUMIS: IndexSpec = IndexSpec {
        group: RowGroupKind::Lumis,
        major: "run",
        minor: Some("lumi"),
    };

    pub const RUNS: IndexSpec = IndexSpec {
        group: RowGroupKind::Runs,
        major: "run",
        minor: None,
    };

    /// Every indexed row group.
    pub const ALL: [IndexSpec; 3] = [IndexSpec::EVENTS, IndexSpec::LUMIS, IndexSpec::RUNS];

    /// Returns the index layout of `group`, if that group is indexed.
    pub fn for_group(group: RowGroupKind) -> Option<IndexSpec> {
        Self::ALL.into_iter().find(|spec| spec.group == group)
    }

    pub fn group(&self) -> RowGroupKind {
        self.group
    }

    /// Extracts the key of `row`, found at `position` within the group.
    ///
    /// A row lacking one of the identifying sub-columns fails with [`ErrorKind::IndexBuildError`].
    pub fn key_of(&self, row: &Row, position: u64) -> MergeResult<IndexKey> {
        let major = self.require(row, self.major, position)?;
        let minor = match self.minor {
            Some(field) => self.require(row, field, position)?,
            None => 0,
        };

        Ok(IndexKey::new(major, minor))
    }

    fn require(&self, row: &Row, field: &str, position: u64) -> MergeResult<u64> {
        match row.aux_id(field) {
            Some(id) => Ok(id),
            None => bail!(
                ErrorKind::IndexBuildError,
                "Row lacks an identifying sub-column",
                format!(
                    "row {position} of group `{}` has no unsigned `aux.{field}`",
                    self.group
                )
            ),
        }
    }
}
