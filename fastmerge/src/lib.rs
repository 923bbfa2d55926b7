//! FastMerge - Merges event-data containers into one output container.
//!
//! This crate concatenates the row groups of an ordered list of input containers into a single
//! output container. Inputs are validated one at a time against the schema and file format
//! version of the first accepted input, their provenance is de-duplicated, and their rows are
//! streamed into the output without being decoded into domain types.
//!
//! # Architecture
//!
//! The [`MergeDriver`] resolves input names through a [`catalog::Catalog`], opens each input
//! with [`reader::InputFileReader`], checks it against the accumulating
//! [`schema::SchemaRegistry`] and [`provenance::ProvenanceStore`] and appends its row groups to
//! an [`output::OutputAccumulator`]. Once every input is processed the output is finalized with
//! its consolidated metadata and the [`index::SecondaryIndex`] of every indexed row group.
//! Lifecycle events are emitted to a [`report::ReportSink`] as they happen.
//!
//! # Usage
//!
//! ```rust,no_run
//! use fastmerge::catalog::LocalCatalog;
//! use fastmerge::report::LogReport;
//! use fastmerge::{MergeDriver, MergerConfig};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = MergerConfig::new("merged.fm").with_skip_missing(true);
//!
//!     let mut driver = MergeDriver::new(config, LocalCatalog::new(), LogReport::new());
//!     let summary = driver.run(&["a.fm".to_string(), "b.fm".to_string()])?;
//!     println!("Merged {} events", summary.events_written);
//!
//!     Ok(())
//! }
//! ```

pub mod catalog;
mod config;
pub mod container;
pub mod error;
pub mod index;
mod macros;
mod merger;
pub mod output;
pub mod provenance;
pub mod reader;
pub mod report;
pub mod schema;
pub mod types;

pub use config::MergerConfig;
pub use error::{ErrorKind, MergeError, MergeResult};
pub use merger::{MergeDriver, MergeState, MergeSummary};
