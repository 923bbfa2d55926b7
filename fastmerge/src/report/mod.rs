//! Job-report sinks that record the open, skip and close boundaries of a merge.

mod base;
mod json;
mod log;
mod memory;

pub use base::{REPORT_MODULE_LABEL, REPORT_SOURCE, ReportEvent, ReportSink, ReportToken};
pub use json::JsonLinesReport;
pub use log::LogReport;
pub use memory::MemoryReport;
