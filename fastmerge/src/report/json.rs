use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::error::MergeResult;
use crate::report::{ReportEvent, ReportSink, ReportToken};

/// Writes the job report as JSON lines, one event per line.
///
/// Every event is flushed as soon as it is written so the report survives a failed merge.
#[derive(Debug)]
pub struct JsonLinesReport {
    path: PathBuf,
    writer: BufWriter<File>,
    issued: u64,
}

impl JsonLinesReport {
    /// Creates (or truncates) the report file at `path`.
    pub fn create(path: &Path) -> MergeResult<Self> {
        let file = File::create(path)?;

        Ok(Self {
            path: path.to_path_buf(),
            writer: BufWriter::new(file),
            issued: 0,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ReportSink for JsonLinesReport {
    fn next_token(&mut self) -> ReportToken {
        self.issued += 1;
        ReportToken::new(self.issued)
    }

    fn emit(&mut self, event: ReportEvent) -> MergeResult<()> {
        serde_json::to_writer(&mut self.writer, &event)?;
        self.writer.write_all(b"\n")?;
        self.writer.flush()?;

        Ok(())
    }
}
