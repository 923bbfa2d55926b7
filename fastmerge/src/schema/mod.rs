//! The accumulating schema of a merge and its compatibility rules.

mod mismatch;
mod registry;

pub use mismatch::{MergeOutcome, SchemaMismatch};
pub use registry::{MatchMode, SchemaRegistry};
