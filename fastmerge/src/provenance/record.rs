use std::fmt;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::MergeResult;

/// Content-derived identifier of a provenance record.
///
/// It is the lowercase hex SHA-256 digest of the record's JSON encoding, so identical records
/// from different files always share an id.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProvenanceId(String);

impl ProvenanceId {
    /// Computes the id of `content`.
    pub fn of<T: Serialize + ?Sized>(content: &T) -> MergeResult<ProvenanceId> {
        let encoded = serde_json::to_vec(content)?;

        let mut hasher = Sha256::new();
        hasher.update(&encoded);

        Ok(ProvenanceId(format!("{:x}", hasher.finalize())))
    }

    /// Wraps an already computed id.
    pub fn from_hex(hex: impl Into<String>) -> ProvenanceId {
        ProvenanceId(hex.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ProvenanceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One step of a processing history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessConfiguration {
    pub process_name: String,
    pub release_version: String,
    pub pass_id: String,
    pub parameter_set_id: ProvenanceId,
}

/// The ordered chain of processing steps a branch descends from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessHistory {
    pub configurations: Vec<ProcessConfiguration>,
}

/// Describes the module that produced a branch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleDescription {
    pub module_label: String,
    pub module_type: String,
    pub process_name: String,
    pub parameter_set_id: ProvenanceId,
}

/// A serialized configuration, stored verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigurationBlob {
    pub content: String,
}

/// Any record a [`crate::provenance::ProvenanceStore`] can hold.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProvenanceRecord {
    ProcessHistory(ProcessHistory),
    ModuleDescription(ModuleDescription),
    ConfigurationBlob(ConfigurationBlob),
}

impl ProvenanceRecord {
    /// Computes the content-derived id of the wrapped record.
    pub fn id(&self) -> MergeResult<ProvenanceId> {
        match self {
            ProvenanceRecord::ProcessHistory(history) => ProvenanceId::of(history),
            ProvenanceRecord::ModuleDescription(module) => ProvenanceId::of(module),
            ProvenanceRecord::ConfigurationBlob(blob) => ProvenanceId::of(blob),
        }
    }
}

impl From<ProcessHistory> for ProvenanceRecord {
    fn from(value: ProcessHistory) -> Self {
        ProvenanceRecord::ProcessHistory(value)
    }
}

impl From<ModuleDescription> for ProvenanceRecord {
    fn from(value: ModuleDescription) -> Self {
        ProvenanceRecord::ModuleDescription(value)
    }
}

impl From<ConfigurationBlob> for ProvenanceRecord {
    fn from(value: ConfigurationBlob) -> Self {
        ProvenanceRecord::ConfigurationBlob(value)
    }
}
