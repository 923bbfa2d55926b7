use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::bail;
use crate::error::{ErrorKind, MergeResult};
use crate::provenance::{
    ConfigurationBlob, ModuleDescription, ProcessHistory, ProvenanceId, ProvenanceRecord,
};

/// Lineage records keyed by their content-derived id.
///
/// Records are only ever added. Re-inserting an identical record is a no-op.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProvenanceStore {
    #[serde(default)]
    process_histories: BTreeMap<ProvenanceId, ProcessHistory>,
    #[serde(default)]
    module_descriptions: BTreeMap<ProvenanceId, ModuleDescription>,
    #[serde(default)]
    configuration_blobs: BTreeMap<ProvenanceId, ConfigurationBlob>,
}

impl ProvenanceStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts `record` under its content id and returns that id.
    pub fn insert(&mut self, record: impl Into<ProvenanceRecord>) -> MergeResult<ProvenanceId> {
        let record = record.into();
        let id = record.id()?;

        match record {
            ProvenanceRecord::ProcessHistory(history) => {
                self.process_histories.entry(id.clone()).or_insert(history);
            }
            ProvenanceRecord::ModuleDescription(module) => {
                self.module_descriptions.entry(id.clone()).or_insert(module);
            }
            ProvenanceRecord::ConfigurationBlob(blob) => {
                self.configuration_blobs.entry(id.clone()).or_insert(blob);
            }
        }

        Ok(id)
    }

    /// Absorbs every record of `fragment` whose id is not yet present.
    ///
    /// The whole fragment is verified before anything is inserted: a record stored under an id
    /// that differs from its content hash fails with [`ErrorKind::MismatchedInput`] and leaves the
    /// store untouched. Returns the number of records that were new.
    pub fn absorb(&mut self, fragment: &ProvenanceStore) -> MergeResult<usize> {
        verify_keys(&fragment.process_histories)?;
        verify_keys(&fragment.module_descriptions)?;
        verify_keys(&fragment.configuration_blobs)?;

        let mut added = 0;
        added += absorb_map(&mut self.process_histories, &fragment.process_histories);
        added += absorb_map(&mut self.module_descriptions, &fragment.module_descriptions);
        added += absorb_map(&mut self.configuration_blobs, &fragment.configuration_blobs);

        Ok(added)
    }

    pub fn process_history(&self, id: &ProvenanceId) -> Option<&ProcessHistory> {
        self.process_histories.get(id)
    }

    pub fn module_description(&self, id: &ProvenanceId) -> Option<&ModuleDescription> {
        self.module_descriptions.get(id)
    }

    pub fn configuration_blob(&self, id: &ProvenanceId) -> Option<&ConfigurationBlob> {
        self.configuration_blobs.get(id)
    }

    /// Returns the total number of records across all kinds.
    pub fn len(&self) -> usize {
        self.process_histories.len()
            + self.module_descriptions.len()
            + self.configuration_blobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn verify_keys<T: Serialize>(records: &BTreeMap<ProvenanceId, T>) -> MergeResult<()> {
    for (id, record) in records {
        let actual = ProvenanceId::of(record)?;
        if &actual != id {
            bail!(
                ErrorKind::MismatchedInput,
                "Provenance record does not match its identifier",
                format!("stored under {id}, content hashes to {actual}")
            );
        }
    }

    Ok(())
}

fn absorb_map<T: Clone>(
    target: &mut BTreeMap<ProvenanceId, T>,
    fragment: &BTreeMap<ProvenanceId, T>,
) -> usize {
    let mut added = 0;
    for (id, record) in fragment {
        if !target.contains_key(id) {
            target.insert(id.clone(), record.clone());
            added += 1;
        }
    }

    added
}
