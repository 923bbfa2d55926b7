//! Secondary indices rebuilt over the merged row groups.
//!
//! Event rows are keyed by `(run, event)`, interval rows by `(run, lumi)` and parent-interval rows
//! by `run` alone. Indices are sorted by key and map each key to the row's position in its group.

mod key;
mod secondary_index;

pub use key::{IndexKey, IndexSpec};
pub use secondary_index::{IndexEntry, IndexStats, SecondaryIndex};
