use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::provenance::ProvenanceId;

/// The level of the event hierarchy a branch belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BranchType {
    Event,
    Lumi,
    Run,
}

/// A named data column together with its provenance.
///
/// `configuration_ids` identify the configurations that produced the column and `lineage` the
/// processing histories it descends from. Both are sets so permissive merges can union them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Branch {
    pub name: String,
    pub branch_type: BranchType,
    #[serde(default)]
    pub configuration_ids: BTreeSet<ProvenanceId>,
    #[serde(default)]
    pub lineage: BTreeSet<ProvenanceId>,
}

impl Branch {
    /// Creates a branch without any provenance attached.
    pub fn new(name: impl Into<String>, branch_type: BranchType) -> Self {
        Self {
            name: name.into(),
            branch_type,
            configuration_ids: BTreeSet::new(),
            lineage: BTreeSet::new(),
        }
    }

    /// Adds a configuration id, returning the branch for chaining.
    pub fn with_configuration_id(mut self, id: ProvenanceId) -> Self {
        self.configuration_ids.insert(id);
        self
    }

    /// Adds a lineage reference, returning the branch for chaining.
    pub fn with_lineage(mut self, id: ProvenanceId) -> Self {
        self.lineage.insert(id);
        self
    }
}
