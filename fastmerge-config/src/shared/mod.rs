//! Shared configuration types for fastmerge.

mod base;
mod merge;

pub use base::ValidationError;
pub use merge::MergeSettings;
