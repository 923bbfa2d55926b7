//! Content-addressed lineage records and the store that de-duplicates them across inputs.

mod record;
mod store;

pub use record::{
    ConfigurationBlob, ModuleDescription, ProcessConfiguration, ProcessHistory, ProvenanceId,
    ProvenanceRecord,
};
pub use store::ProvenanceStore;
