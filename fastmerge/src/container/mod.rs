//! Line-oriented container codec.
//!
//! A container is UTF-8 text holding one JSON record per line: a header, the rows of every row
//! group, at most one metadata record, any number of index records and a closing end record that
//! lists the row count of every group present. A container without its end record is incomplete.

mod format;
mod reader;
mod writer;

pub use format::{CONTAINER_LAYOUT, CONTAINER_MAGIC, FileMetadata, RawMetadata, Record};
pub use reader::{GroupRows, RecordReader};
pub use writer::ContainerWriter;
